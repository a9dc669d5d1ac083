//! Persistence of the OAuth token triple between calls.
//!
//! The store holds a single session slot. [`FileSessionStore`] replaces the
//! file atomically under an exclusive lock, so concurrent processes sharing a
//! session file never observe a half-written record.

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default location of the session file.
pub const DEFAULT_SESSION_FILE: &str = "runtime/cache/oauth_session";

/// The OAuth token, token secret and session handle reused across calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSession {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub oauth_session_handle: String,
}

impl std::fmt::Debug for OAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSession")
            .field("oauth_token", &self.oauth_token)
            .field("oauth_token_secret", &"[redacted]")
            .field("oauth_session_handle", &self.oauth_session_handle)
            .finish()
    }
}

impl OAuthSession {
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        token_secret: impl Into<String>,
        session_handle: impl Into<String>,
    ) -> Self {
        Self {
            oauth_token: token.into(),
            oauth_token_secret: token_secret.into(),
            oauth_session_handle: session_handle.into(),
        }
    }

    /// Whether the session carries a token worth attaching to a request.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.oauth_token.is_empty()
    }
}

/// Errors produced by [`SessionStore`] implementations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Single-slot storage for the OAuth session.
pub trait SessionStore: Send + Sync {
    /// Replaces the stored session.
    fn put(&self, session: &OAuthSession) -> Result<(), SessionError>;

    /// Returns the stored session, or `None` if nothing has been stored.
    fn get(&self) -> Result<Option<OAuthSession>, SessionError>;
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn put(&self, session: &OAuthSession) -> Result<(), SessionError> {
        (**self).put(session)
    }

    fn get(&self) -> Result<Option<OAuthSession>, SessionError> {
        (**self).get()
    }
}

/// In-memory store, for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<OAuthSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session: &OAuthSession) -> Result<(), SessionError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<OAuthSession>, SessionError> {
        Ok(self.slot.lock().clone())
    }
}

/// JSON file store guarded by an `fs2` lock on a sibling `.lock` file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(extension);
        self.path.with_file_name(name)
    }

    fn ensure_parent_exists(&self) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(SessionError::io("create directory", parent))?;
        }
        Ok(())
    }

    fn open_lock(&self) -> Result<(File, PathBuf), SessionError> {
        let lock_path = self.sibling("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(SessionError::io("open lock", &lock_path))?;
        Ok((file, lock_path))
    }
}

impl SessionStore for FileSessionStore {
    #[instrument(skip(self, session), fields(path = %self.path.display()))]
    fn put(&self, session: &OAuthSession) -> Result<(), SessionError> {
        self.ensure_parent_exists()?;
        let serialized = serde_json::to_vec(session)?;

        let (lock, lock_path) = self.open_lock()?;
        FileExt::lock_exclusive(&lock)
            .map_err(SessionError::io("lock", &lock_path))?;

        let tmp_path = self.sibling("tmp");
        let result = (|| {
            let mut file =
                File::create(&tmp_path).map_err(SessionError::io("create", &tmp_path))?;
            file.write_all(&serialized)
                .map_err(SessionError::io("write", &tmp_path))?;
            file.sync_all().map_err(SessionError::io("sync", &tmp_path))?;
            fs::rename(&tmp_path, &self.path).map_err(SessionError::io("replace", &self.path))
        })();

        // Dropping `lock` releases it too.
        let _ = FileExt::unlock(&lock);
        trace!("session persisted");
        result
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn get(&self) -> Result<Option<OAuthSession>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let (lock, lock_path) = self.open_lock()?;
        FileExt::lock_shared(&lock)
            .map_err(SessionError::io("lock", &lock_path))?;
        let bytes = fs::read(&self.path);
        let _ = FileExt::unlock(&lock);

        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::io("read", &self.path)(e)),
        };
        if bytes.is_empty() {
            return Ok(None);
        }

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "ignoring undecodable session file");
                Ok(None)
            }
        }
    }
}
