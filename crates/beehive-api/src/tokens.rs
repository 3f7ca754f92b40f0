use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Persistent home of the bearer token pair. Only sign-in, refresh and
/// sign-out write to it.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenPair>, ApiError>;
    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, ApiError> {
        let tokens = self
            .tokens
            .lock()
            .map_err(|_| ApiError::Configuration("token store lock poisoned".to_owned()))?;
        Ok(tokens.clone())
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        let mut slot = self
            .tokens
            .lock()
            .map_err(|_| ApiError::Configuration("token store lock poisoned".to_owned()))?;
        *slot = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut slot = self
            .tokens
            .lock()
            .map_err(|_| ApiError::Configuration("token store lock poisoned".to_owned()))?;
        *slot = None;
        Ok(())
    }
}

/// JSON file holding the token pair.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, ApiError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(ApiError::Configuration(format!(
                    "failed to read token file '{}': {error}",
                    self.path.display()
                )))
            }
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw).map(Some).map_err(|error| {
            ApiError::Configuration(format!(
                "token file '{}' is malformed: {error}",
                self.path.display()
            ))
        })
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    ApiError::Configuration(format!(
                        "failed to create token directory '{}': {error}",
                        parent.display()
                    ))
                })?;
            }
        }
        let encoded = serde_json::to_string_pretty(tokens).map_err(|error| {
            ApiError::Configuration(format!("failed to encode tokens: {error}"))
        })?;
        std::fs::write(&self.path, encoded).map_err(|error| {
            ApiError::Configuration(format!(
                "failed to write token file '{}': {error}",
                self.path.display()
            ))
        })
    }

    fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ApiError::Configuration(format!(
                "failed to remove token file '{}': {error}",
                self.path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir()
            .join(format!("beehive-tokens-{name}-{nanos}"))
            .join("tokens.json")
    }

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
        }
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let path = unique_temp_path("roundtrip");
        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().expect("load missing"), None);

        store.save(&pair()).expect("save tokens");
        assert_eq!(store.load().expect("load saved"), Some(pair()));

        store.clear().expect("clear tokens");
        assert_eq!(store.load().expect("load cleared"), None);
        store.clear().expect("clearing twice is fine");

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", pair());
        assert!(!rendered.contains("access\""));
        assert!(rendered.contains("<redacted>"));
    }
}
