//! Session context: who is signed in and which API key to send.
//!
//! Created once at startup with [`SessionContext::init`], handed to the
//! API client explicitly, and wiped with [`SessionContext::clear`] on
//! logout. Nothing else reads or writes the session file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<CurrentUser>,
    pub api_key: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SessionContext {
    path: PathBuf,
    inner: Arc<RwLock<Session>>,
}

impl SessionContext {
    /// Load the persisted session at `path`, or start signed out.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let session = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Session(format!("corrupt session file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Session::default(),
            Err(e) => {
                return Err(ClientError::Session(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            path = %path.display(),
            signed_in = session.user.is_some(),
            "session initialised"
        );

        Ok(Self {
            path,
            inner: Arc::new(RwLock::new(session)),
        })
    }

    /// A session that is never written to disk.
    pub fn ephemeral(api_key: Option<String>) -> Self {
        Self {
            path: PathBuf::new(),
            inner: Arc::new(RwLock::new(Session {
                user: None,
                api_key,
                started_at: None,
            })),
        }
    }

    pub fn login(&self, user: CurrentUser, api_key: impl Into<String>) -> Result<()> {
        let snapshot = {
            let mut guard = self.write()?;
            *guard = Session {
                user: Some(user),
                api_key: Some(api_key.into()),
                started_at: Some(Utc::now()),
            };
            (*guard).clone()
        };
        self.persist(&snapshot)?;
        tracing::info!(
            user = snapshot.user.as_ref().map(|u| u.email.as_str()).unwrap_or_default(),
            "signed in"
        );
        Ok(())
    }

    /// Logout: forget everything and remove the persisted copy.
    pub fn clear(&self) -> Result<()> {
        *self.write()? = Session::default();
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ClientError::Session(format!(
                    "cannot remove {}: {}",
                    self.path.display(),
                    e
                )))
            }
        }
        tracing::info!("signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.inner.read().ok().and_then(|s| s.user.clone())
    }

    pub fn api_key(&self) -> Option<String> {
        self.inner.read().ok().and_then(|s| s.api_key.clone())
    }

    pub fn snapshot(&self) -> Session {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Session>> {
        self.inner
            .write()
            .map_err(|_| ClientError::Session("session lock poisoned".into()))
    }

    fn persist(&self, session: &Session) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| ClientError::Session(format!("cannot create {}: {}", dir.display(), e)))?;
        }
        let body = serde_json::to_string_pretty(session)
            .map_err(|e| ClientError::Session(e.to_string()))?;
        std::fs::write(&self.path, body)
            .map_err(|e| ClientError::Session(format!("cannot write {}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "u1".into(),
            name: "Amina".into(),
            email: "amina@agri.example".into(),
            role: Some("admin".into()),
        }
    }

    #[test]
    fn test_init_without_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SessionContext::init(dir.path().join("session.json")).unwrap();
        assert!(ctx.current_user().is_none());
        assert!(ctx.api_key().is_none());
    }

    #[test]
    fn test_login_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        let ctx = SessionContext::init(&path).unwrap();
        ctx.login(user(), "key-123").unwrap();
        assert!(path.exists());

        let reloaded = SessionContext::init(&path).unwrap();
        assert_eq!(reloaded.current_user(), Some(user()));
        assert_eq!(reloaded.api_key().as_deref(), Some("key-123"));
        assert!(reloaded.snapshot().started_at.is_some());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let ctx = SessionContext::init(&path).unwrap();
        ctx.login(user(), "key").unwrap();

        ctx.clear().unwrap();
        assert!(!path.exists());
        assert!(ctx.current_user().is_none());
        // clearing twice is fine
        ctx.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionContext::init(&path),
            Err(ClientError::Session(_))
        ));
    }

    #[test]
    fn test_ephemeral_never_touches_disk() {
        let ctx = SessionContext::ephemeral(Some("k".into()));
        ctx.login(user(), "k2").unwrap();
        assert_eq!(ctx.api_key().as_deref(), Some("k2"));
        ctx.clear().unwrap();
        assert!(ctx.api_key().is_none());
    }
}
