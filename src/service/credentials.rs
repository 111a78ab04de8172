//! API key selection.
//!
//! [`ApiKeyStore`] is the single slot the HTTP client reads its key from.
//! [`CredentialGate`] is the precondition check the session runs before every
//! attempt; [`KeyStoreGate`] implements it by prompting for a key on a line
//! reader (stdin in the CLI) and storing the answer.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::config::ApiConfig;

// ---------------------------------------------------------------------------
// ApiKeyStore
// ---------------------------------------------------------------------------

/// Cheaply clonable handle to the selected API key.
#[derive(Clone, Default)]
pub struct ApiKeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    /// Store holding `key`; blank keys count as "no key".
    pub fn new(key: Option<String>) -> Self {
        let store = Self::default();
        if let Some(key) = key {
            store.set(key);
        }
        store
    }

    /// Key from the config file, else from the configured environment variable.
    pub fn from_config(api: &ApiConfig) -> Self {
        let key = api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&api.api_key_env).ok());
        Self::new(key)
    }

    pub fn get(&self) -> Option<String> {
        self.key.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        let key = key.trim();
        let mut slot = self.key.write().unwrap_or_else(|e| e.into_inner());
        *slot = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_set(&self) -> bool {
        self.key.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("is_set", &self.is_set())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialGate trait
// ---------------------------------------------------------------------------

/// Credential precondition for generation attempts.
#[async_trait]
pub trait CredentialGate: Send + Sync {
    /// Whether a usable key has been selected.
    async fn has_selected_api_key(&self) -> bool;

    /// Let the user pick a (new) key.
    async fn open_select_key(&self);
}

// ---------------------------------------------------------------------------
// KeyStoreGate
// ---------------------------------------------------------------------------

/// Prompts for a key on a line reader and writes it to an [`ApiKeyStore`].
pub struct KeyStoreGate<R = Stdin> {
    store: ApiKeyStore,
    input: Mutex<BufReader<R>>,
}

impl KeyStoreGate<Stdin> {
    /// Gate that prompts on the process's stdin.
    pub fn stdin(store: ApiKeyStore) -> Self {
        Self::with_input(store, tokio::io::stdin())
    }
}

impl<R: AsyncRead + Unpin + Send> KeyStoreGate<R> {
    pub fn with_input(store: ApiKeyStore, input: R) -> Self {
        Self {
            store,
            input: Mutex::new(BufReader::new(input)),
        }
    }

    pub fn store(&self) -> &ApiKeyStore {
        &self.store
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> CredentialGate for KeyStoreGate<R> {
    async fn has_selected_api_key(&self) -> bool {
        self.store.is_set()
    }

    async fn open_select_key(&self) {
        eprintln!("Enter a valid, billing-enabled Gemini API key:");

        let mut line = String::new();
        let mut input = self.input.lock().await;
        match input.read_line(&mut line).await {
            Ok(0) => log::warn!("credentials: input closed before a key was entered"),
            Ok(_) if line.trim().is_empty() => log::warn!("credentials: empty key ignored"),
            Ok(_) => {
                self.store.set(line);
                log::info!("credentials: API key selected");
            }
            Err(e) => log::warn!("credentials: could not read key: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn api_config(api_key: Option<&str>, env: &str) -> ApiConfig {
        ApiConfig {
            api_key: api_key.map(str::to_string),
            api_key_env: env.into(),
            ..ApiConfig::default()
        }
    }

    // ---- ApiKeyStore ---

    #[test]
    fn blank_keys_are_not_stored() {
        let store = ApiKeyStore::new(Some("   ".into()));
        assert!(!store.is_set());
        store.set("  sk-abc \n");
        assert_eq!(store.get().as_deref(), Some("sk-abc"));
        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn clones_share_the_slot() {
        let store = ApiKeyStore::default();
        let other = store.clone();
        store.set("k1");
        assert_eq!(other.get().as_deref(), Some("k1"));
    }

    #[test]
    fn config_key_wins_over_env() {
        std::env::set_var("VEO_STUDIO_TEST_KEY_A", "from-env");
        let store = ApiKeyStore::from_config(&api_config(Some("from-file"), "VEO_STUDIO_TEST_KEY_A"));
        assert_eq!(store.get().as_deref(), Some("from-file"));
    }

    #[test]
    fn env_key_used_when_config_blank() {
        std::env::set_var("VEO_STUDIO_TEST_KEY_B", "from-env");
        let store = ApiKeyStore::from_config(&api_config(Some(""), "VEO_STUDIO_TEST_KEY_B"));
        assert_eq!(store.get().as_deref(), Some("from-env"));
    }

    #[test]
    fn debug_does_not_print_key() {
        let store = ApiKeyStore::new(Some("sk-secret".into()));
        assert!(!format!("{store:?}").contains("sk-secret"));
    }

    // ---- KeyStoreGate ---

    #[tokio::test]
    async fn prompt_stores_entered_key() {
        let gate = KeyStoreGate::with_input(ApiKeyStore::default(), &b"sk-entered\n"[..]);
        assert!(!gate.has_selected_api_key().await);

        gate.open_select_key().await;
        assert!(gate.has_selected_api_key().await);
        assert_eq!(gate.store().get().as_deref(), Some("sk-entered"));
    }

    #[tokio::test]
    async fn blank_line_or_eof_selects_nothing() {
        let gate = KeyStoreGate::with_input(ApiKeyStore::default(), &b"\n"[..]);
        gate.open_select_key().await;
        assert!(!gate.has_selected_api_key().await);

        // input exhausted now
        gate.open_select_key().await;
        assert!(!gate.has_selected_api_key().await);
    }

    #[tokio::test]
    async fn reselection_replaces_existing_key() {
        let store = ApiKeyStore::new(Some("old".into()));
        let gate = KeyStoreGate::with_input(store.clone(), &b"new\n"[..]);
        gate.open_select_key().await;
        assert_eq!(store.get().as_deref(), Some("new"));
    }
}
