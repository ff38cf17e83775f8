//! Access token storage
//!
//! `TokenStore` is the single slot holding the current access token. The
//! session manager is its only writer. Backends never surface errors: a store
//! that cannot persist degrades to "never authenticated" (or to in-memory
//! only) and logs the cause.
//!
//! `FileTokenStore` is the persisted slot. It keeps a JSON document
//! `{"access_token": "..."}` on disk, written atomically with owner-only
//! permissions, so the token survives process restarts. The refresh
//! credential is never written here.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::token::AccessToken;

/// Name of the persisted slot holding the access token.
pub const ACCESS_TOKEN_SLOT: &str = "access_token";

/// The access token slot.
///
/// `get` has no side effects and is safe before anything was stored.
/// `set` overwrites. `clear` is idempotent.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<AccessToken>;
    fn set(&self, token: AccessToken);
    fn clear(&self);
}

/// In-process token slot. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already present.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: AccessToken) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Store for environments without a persistence medium. Every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTokenStore;

impl TokenStore for NullTokenStore {
    fn get(&self) -> Option<AccessToken> {
        None
    }

    fn set(&self, _token: AccessToken) {}

    fn clear(&self) {}
}

/// On-disk layout of the token file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Token slot persisted to a JSON file.
///
/// The file is read once at open; afterwards the in-memory copy is
/// authoritative and every `set`/`clear` is written through. If the file
/// can't be written the in-memory copy still updates, so the current
/// process keeps working.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    slot: RwLock<Option<AccessToken>>,
}

impl FileTokenStore {
    /// Open the token file at `path`.
    ///
    /// A missing file is an empty slot. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = match read_slot(&path) {
            Ok(Some(token)) => {
                info!(path = %path.display(), "loaded persisted access token");
                Some(token)
            }
            Ok(None) => {
                debug!(path = %path.display(), "no persisted access token");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable token file");
                None
            }
        };

        Self {
            path,
            slot: RwLock::new(token),
        }
    }

    /// Location of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: AccessToken) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        let persisted = PersistedSlot {
            access_token: Some(token.as_str().to_string()),
        };
        if let Err(e) = write_atomic(&self.path, &persisted) {
            warn!(path = %self.path.display(), error = %e, "failed to persist access token, keeping it in memory only");
            // An older token left on disk would come back on the next start
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed outdated token file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to remove outdated token file");
                }
            }
        }
        *slot = Some(token);
    }

    fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed token file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove token file");
            }
        }
    }
}

fn read_slot(path: &Path) -> Result<Option<AccessToken>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(format!("reading token file: {e}"))),
    };
    let persisted: PersistedSlot = serde_json::from_str(&contents)
        .map_err(|e| Error::Parse(format!("parsing token file: {e}")))?;
    Ok(persisted.access_token.and_then(AccessToken::new))
}

/// Write the slot atomically: temp file in the same directory, then rename.
/// Permissions are 0600 on unix since the file holds a bearer token.
fn write_atomic(path: &Path, data: &PersistedSlot) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::Parse(format!("serializing token file: {e}")))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;

    let tmp_path = dir.join(format!(".{ACCESS_TOKEN_SLOT}.tmp.{}", std::process::id()));
    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted access token");
    Ok(())
}
