//! Credential storage shared by every request the client sends

use crate::error::{ClientError, Result};
use crate::types::{CredentialPair, TokenKind};
use papaya::HashMap;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Storage for the access and refresh tokens
///
/// Injected into the API client. Reads and writes carry no transactional
/// guarantee: when two refreshes race, the last write wins.
pub trait TokenStore: Send + Sync {
    fn get(&self, kind: TokenKind) -> Option<String>;

    fn set(&self, kind: TokenKind, token: String) -> Result<()>;

    /// Remove both tokens
    fn clear(&self) -> Result<()>;

    /// Both tokens, if both are stored
    fn credentials(&self) -> Option<CredentialPair> {
        Some(CredentialPair {
            access_token: self.get(TokenKind::Access)?,
            refresh_token: self.get(TokenKind::Refresh)?,
        })
    }

    fn store_pair(&self, pair: &CredentialPair) -> Result<()> {
        self.set(TokenKind::Access, pair.access_token.clone())?;
        self.set(TokenKind::Refresh, pair.refresh_token.clone())
    }
}

/// Thread-safe in-memory token store using Papaya HashMap
#[derive(Clone)]
pub struct MemoryTokenStore {
    tokens: Arc<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with a credential pair
    pub fn with_credentials(pair: &CredentialPair) -> Self {
        let store = Self::new();
        let tokens = store.tokens.pin();
        tokens.insert(TokenKind::Access, pair.access_token.clone());
        tokens.insert(TokenKind::Refresh, pair.refresh_token.clone());
        drop(tokens);
        store
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn remove(&self, kind: TokenKind) {
        self.tokens.pin().remove(&kind);
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.tokens.pin().get(&kind).cloned()
    }

    fn set(&self, kind: TokenKind, token: String) -> Result<()> {
        self.tokens.pin().insert(kind, token);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.tokens.pin().clear();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Token store backed by a JSON file, so a session survives process restarts
///
/// Tokens are cached in memory; every write rewrites the file and `clear`
/// deletes it.
pub struct FileTokenStore {
    path: PathBuf,
    cache: MemoryTokenStore,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any tokens already saved there
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = MemoryTokenStore::new();

        match std::fs::read(&path) {
            Ok(raw) => {
                let stored: StoredTokens = serde_json::from_slice(&raw)?;
                if let Some(token) = stored.access_token {
                    cache.set(TokenKind::Access, token)?;
                }
                if let Some(token) = stored.refresh_token {
                    cache.set(TokenKind::Refresh, token)?;
                }
                debug!(path = %path.display(), "Loaded stored tokens");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            cache,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let stored = StoredTokens {
            access_token: self.cache.get(TokenKind::Access),
            refresh_token: self.cache.get(TokenKind::Refresh),
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // The token file is only ever replaced whole, never truncated in place
        let staging = self.staging_path();
        match std::fs::remove_file(&staging) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut file = owner_only().open(&staging)?;
        file.write_all(&serde_json::to_vec_pretty(&stored)?)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| ClientError::Storage("token file lock poisoned".to_string()))
    }
}

/// Create-and-truncate options; new files are readable by the owner only
fn owner_only() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Option<String> {
        self.cache.get(kind)
    }

    fn set(&self, kind: TokenKind, token: String) -> Result<()> {
        let _guard = self.lock()?;
        self.cache.set(kind, token)?;
        self.persist()
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.cache.remove(TokenKind::Access);
        self.cache.remove(TokenKind::Refresh);
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
