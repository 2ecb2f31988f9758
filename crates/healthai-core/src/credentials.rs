//! API key resolution.
//!
//! Keys are looked up in a fixed order: the key typed into the running
//! session, the `GROQ_API_KEY` environment variable, the deployment secrets
//! file, and finally a placeholder that the provider will reject.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use tracing::{debug, warn};

/// Name of the key in the environment and in the secrets file.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Environment variable that overrides the secrets file location.
pub const SECRETS_PATH_VAR: &str = "HEALTHAI_SECRETS";

/// Used when nothing is configured. Fails on first use, never here.
pub const PLACEHOLDER_KEY: &str = "sk-your-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Session,
    Environment,
    SecretStore,
    Placeholder,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Session => "session",
            CredentialSource::Environment => "env",
            CredentialSource::SecretStore => "secrets",
            CredentialSource::Placeholder => "placeholder",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub key: String,
    pub source: CredentialSource,
}

impl Credential {
    pub fn is_placeholder(&self) -> bool {
        self.source == CredentialSource::Placeholder
    }
}

// Keep the key itself out of logs and panic messages.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Deployment-level secrets, read from a flat JSON object file.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

impl SecretStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load secrets from `path`. A missing or unreadable file yields an empty store;
    /// entries that are not strings are skipped.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no secrets file");
            return Self::empty();
        }

        let values = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| {
                serde_json::from_str::<Map<String, Value>>(&content).map_err(anyhow::Error::from)
            });

        match values {
            Ok(entries) => {
                let values = entries
                    .into_iter()
                    .filter_map(|(name, value)| match value {
                        Value::String(s) => Some((name, s)),
                        _ => {
                            debug!(path = %path.display(), name = %name, "skipping non-string secret");
                            None
                        }
                    })
                    .collect();
                Self { values }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable secrets file");
                Self::empty()
            }
        }
    }

    /// Load from `$HEALTHAI_SECRETS`, or `<config_dir>/healthai/secrets.json`.
    pub fn load_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Self::empty(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SECRETS_PATH_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("healthai").join("secrets.json"))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    secrets: SecretStore,
}

impl CredentialResolver {
    pub fn new(secrets: SecretStore) -> Self {
        Self { secrets }
    }

    /// Resolve using the live process environment.
    pub fn resolve(&self, session_key: Option<&str>) -> Credential {
        let env_key = std::env::var(API_KEY_VAR).ok();
        let credential = resolve_from(session_key, env_key.as_deref(), &self.secrets);
        debug!(source = credential.source.as_str(), "resolved API key");
        credential
    }

    /// Where the key would come from right now, without the key itself.
    pub fn source(&self, session_key: Option<&str>) -> CredentialSource {
        self.resolve(session_key).source
    }
}

/// First non-blank value wins: session, environment, secret store, placeholder.
pub fn resolve_from(
    session_key: Option<&str>,
    env_key: Option<&str>,
    secrets: &SecretStore,
) -> Credential {
    let candidates = [
        (session_key, CredentialSource::Session),
        (env_key, CredentialSource::Environment),
        (secrets.get(API_KEY_VAR), CredentialSource::SecretStore),
    ];

    candidates
        .into_iter()
        .find_map(|(value, source)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Credential {
                    key: v.to_string(),
                    source,
                })
        })
        .unwrap_or_else(|| Credential {
            key: PLACEHOLDER_KEY.to_string(),
            source: CredentialSource::Placeholder,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with_key(key: &str) -> SecretStore {
        let mut store = SecretStore::empty();
        store.insert(API_KEY_VAR, key);
        store
    }

    #[test]
    fn test_session_key_wins_over_everything() {
        let store = store_with_key("gsk_store");
        let cred = resolve_from(Some("gsk_session"), Some("gsk_env"), &store);
        assert_eq!(cred.key, "gsk_session");
        assert_eq!(cred.source, CredentialSource::Session);

        let cred = resolve_from(Some("gsk_session"), None, &SecretStore::empty());
        assert_eq!(cred.source, CredentialSource::Session);
    }

    #[test]
    fn test_env_beats_secret_store() {
        let store = store_with_key("gsk_store");
        let cred = resolve_from(None, Some("gsk_env"), &store);
        assert_eq!(cred.key, "gsk_env");
        assert_eq!(cred.source, CredentialSource::Environment);
    }

    #[test]
    fn test_secret_store_used_when_env_missing() {
        let store = store_with_key("gsk_store");
        let cred = resolve_from(None, None, &store);
        assert_eq!(cred.key, "gsk_store");
        assert_eq!(cred.source, CredentialSource::SecretStore);
    }

    #[test]
    fn test_placeholder_when_nothing_configured() {
        let cred = resolve_from(None, None, &SecretStore::empty());
        assert_eq!(cred.key, PLACEHOLDER_KEY);
        assert!(cred.is_placeholder());
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let store = store_with_key("gsk_store");
        let cred = resolve_from(Some("   "), Some(""), &store);
        assert_eq!(cred.source, CredentialSource::SecretStore);
    }

    #[test]
    fn test_debug_output_hides_key() {
        let cred = resolve_from(Some("gsk_secret_value"), None, &SecretStore::empty());
        let printed = format!("{:?}", cred);
        assert!(!printed.contains("gsk_secret_value"));
    }

    #[test]
    fn test_secret_store_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"GROQ_API_KEY": "gsk_from_file"}}"#).unwrap();

        let store = SecretStore::load(&path);
        assert_eq!(store.get(API_KEY_VAR), Some("gsk_from_file"));
    }

    #[test]
    fn test_secret_store_keeps_key_alongside_non_string_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, r#"{"GROQ_API_KEY": "gsk_real", "port": 8080, "debug": true}"#).unwrap();

        let store = SecretStore::load(&path);
        assert_eq!(store.get(API_KEY_VAR), Some("gsk_real"));
        assert_eq!(store.get("port"), None);

        let cred = resolve_from(None, None, &store);
        assert_eq!(cred.source, CredentialSource::SecretStore);
        assert_eq!(cred.key, "gsk_real");
    }

    #[test]
    fn test_resolve_reads_process_environment() {
        // Only test touching the real variable.
        std::env::set_var(API_KEY_VAR, "gsk_from_env");
        let resolver = CredentialResolver::new(store_with_key("gsk_store"));

        let cred = resolver.resolve(None);
        let session_cred = resolver.resolve(Some("gsk_session"));
        std::env::remove_var(API_KEY_VAR);

        assert_eq!(cred.source, CredentialSource::Environment);
        assert_eq!(cred.key, "gsk_from_env");
        assert_eq!(session_cred.source, CredentialSource::Session);
        assert_eq!(session_cred.key, "gsk_session");
    }

    #[test]
    fn test_secret_store_tolerates_missing_and_garbage_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = SecretStore::load(&dir.path().join("nope.json"));
        assert_eq!(missing.get(API_KEY_VAR), None);

        let path = dir.path().join("secrets.json");
        fs::write(&path, "not json").unwrap();
        let garbage = SecretStore::load(&path);
        assert_eq!(garbage.get(API_KEY_VAR), None);
    }
}
