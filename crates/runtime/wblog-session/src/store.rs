//! Session store
//!
//! Process-wide holder of the current session. Loaded from durable storage at
//! startup, changed only by `begin` (login/signup), `refreshed`, `update_user`
//! and `end` (logout or terminal auth failure).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{info, warn};
use wblog_core::{Credentials, Error, Result, Session, User};

/// Durable session storage
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file storage
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(session)?;

        // Write to temp file first, then rename (atomic)
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory storage
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    /// What is currently persisted
    pub fn stored(&self) -> Option<Session> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.stored())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl<S: SessionStorage + ?Sized> SessionStorage for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Session>> {
        (**self).load()
    }

    fn save(&self, session: &Session) -> Result<()> {
        (**self).save(session)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Session status as seen by the routing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// No session; the login entry point is where the user goes next
    LoggedOut,
}

/// Process-wide session store
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
    status: watch::Sender<SessionStatus>,
}

impl SessionStore {
    /// Open the store, restoring whatever session was persisted.
    ///
    /// An unreadable session file is treated as logged out and removed.
    pub fn open(storage: impl SessionStorage + 'static) -> Self {
        let restored = match storage.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                if let Err(e) = storage.clear() {
                    warn!(error = %e, "could not remove persisted session");
                }
                None
            }
        };

        let status = if restored.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::LoggedOut
        };
        let (tx, _) = watch::channel(status);

        Self {
            storage: Box::new(storage),
            current: RwLock::new(restored),
            status: tx,
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.read().as_ref().map(|s| s.credentials.clone())
    }

    pub fn is_active(&self) -> bool {
        self.read().is_some()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Watch for status changes (e.g. to redirect to login)
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Start a session after login or signup
    pub fn begin(&self, session: Session) -> Result<()> {
        self.storage.save(&session)?;
        info!(user = %session.user.id, "session started");
        *self.write() = Some(session);
        self.status.send_replace(SessionStatus::Active);
        Ok(())
    }

    /// Store reissued tokens. Ignored when no session is active.
    pub fn refreshed(&self, credentials: Credentials) -> Result<()> {
        let mut current = self.write();
        let Some(session) = current.as_mut() else {
            return Ok(());
        };

        let mut next = session.clone();
        next.credentials = credentials;
        self.storage.save(&next)?;
        *session = next;
        Ok(())
    }

    /// Replace the cached user profile; only meaningful while active
    pub fn update_user(&self, user: User) -> Result<()> {
        let mut current = self.write();
        let session = current.as_mut().ok_or(Error::NotLoggedIn)?;

        let mut next = session.clone();
        next.user = user;
        self.storage.save(&next)?;
        *session = next;
        Ok(())
    }

    /// Tear the session down. Memory is cleared even if storage fails.
    pub fn end(&self) -> Result<()> {
        let previous = self.write().take();
        self.status.send_replace(SessionStatus::LoggedOut);
        if let Some(session) = previous {
            info!(user = %session.user.id, "session ended");
        }
        self.storage.clear()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn session(token: &str) -> Session {
        Session {
            credentials: Credentials {
                access_token: token.to_string(),
                refresh_token: format!("{}-refresh", token),
            },
            user: User::new("u1").with_username("ann"),
        }
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::at_path(dir.path().join("nested/session.json"));

        assert!(storage.load().unwrap().is_none());
        storage.save(&session("a")).unwrap();
        assert_eq!(storage.load().unwrap(), Some(session("a")));

        storage.clear().unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_store_restores_at_startup() {
        let storage = Arc::new(MemoryStorage::with_session(session("a")));
        let store = SessionStore::open(storage.clone());

        assert!(store.is_active());
        assert_eq!(store.status(), SessionStatus::Active);
        assert_eq!(store.user().unwrap().display_name(), "ann");
    }

    #[test]
    fn test_corrupt_file_means_logged_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ nope").unwrap();

        let store = SessionStore::open(FileStorage::at_path(&path));
        assert!(!store.is_active());
        assert_eq!(store.status(), SessionStatus::LoggedOut);
        assert!(!path.exists());
    }

    #[test]
    fn test_lifecycle() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::open(storage.clone());
        let mut status = store.subscribe();
        assert!(!store.is_active());

        store.begin(session("a")).unwrap();
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), SessionStatus::Active);
        assert_eq!(storage.stored(), Some(session("a")));

        store
            .refreshed(Credentials {
                access_token: "b".to_string(),
                refresh_token: "b-refresh".to_string(),
            })
            .unwrap();
        assert_eq!(store.credentials().unwrap().access_token, "b");
        assert_eq!(storage.stored().unwrap().credentials.access_token, "b");

        store.end().unwrap();
        assert!(store.current().is_none());
        assert!(storage.stored().is_none());
        assert_eq!(*status.borrow_and_update(), SessionStatus::LoggedOut);
    }

    #[test]
    fn test_refresh_without_session_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::open(storage.clone());

        store
            .refreshed(Credentials {
                access_token: "x".to_string(),
                refresh_token: "y".to_string(),
            })
            .unwrap();
        assert!(store.current().is_none());
        assert!(storage.stored().is_none());
    }

    #[test]
    fn test_update_user_requires_session() {
        let store = SessionStore::open(MemoryStorage::new());
        assert!(matches!(
            store.update_user(User::new("u9")),
            Err(Error::NotLoggedIn)
        ));

        store.begin(session("a")).unwrap();
        store.update_user(User::new("u1").with_username("annie")).unwrap();
        assert_eq!(store.user().unwrap().display_name(), "annie");
    }
}
