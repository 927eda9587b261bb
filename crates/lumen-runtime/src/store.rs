//! Session persistence.
//!
//! [`SessionStore`] is the read/write contract the runner consumes. Loading a
//! key that was never saved yields an empty session; saving is an idempotent
//! full overwrite.
//!
//! # Crash Safety
//!
//! [`JsonSessionStore`] writes to a temporary file and renames it over the
//! target, so a crash mid-write never leaves a truncated session behind.

use async_trait::async_trait;
use dashmap::DashMap;
use lumen_core::SessionKey;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::session::Session;

/// Maximum length of a session file stem.
const MAX_FILE_STEM_LEN: usize = 128;

/// Read/write contract for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, creating an empty one if none exists.
    async fn load(&self, key: &SessionKey) -> RuntimeResult<Session>;

    /// Persist a session, replacing any previous version.
    async fn save(&self, session: &Session) -> RuntimeResult<()>;
}

// ---------------------------------------------------------------------------
// JsonSessionStore
// ---------------------------------------------------------------------------

/// One JSON file per session in a directory.
///
/// The directory is created lazily on the first save.
#[derive(Debug)]
pub struct JsonSessionStore {
    sessions_dir: PathBuf,
    dir_ensured: AtomicBool,
}

impl JsonSessionStore {
    /// Create a store rooted at `sessions_dir`.
    #[must_use]
    pub fn new(sessions_dir: impl AsRef<Path>) -> Self {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        let dir_exists = sessions_dir.is_dir();
        Self {
            sessions_dir,
            dir_ensured: AtomicBool::new(dir_exists),
        }
    }

    /// Directory holding the session files.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.sessions_dir
    }

    async fn ensure_dir(&self) -> RuntimeResult<()> {
        if self.dir_ensured.load(Ordering::Relaxed) {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.sessions_dir).await?;
        self.dir_ensured.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn session_path(&self, key: &SessionKey) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.json", file_stem(key.as_str())))
    }

    /// Keys of every stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read. Unreadable session
    /// files are skipped with a warning.
    pub async fn list(&self) -> RuntimeResult<Vec<SessionKey>> {
        let mut keys = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.sessions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_session(&path).await {
                Ok(session) => keys.push(session.key),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session"),
            }
        }

        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }

    /// Delete a stored session. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn delete(&self, key: &SessionKey) -> RuntimeResult<bool> {
        match tokio::fs::remove_file(self.session_path(key)).await {
            Ok(()) => {
                debug!(session_key = %key, "Session deleted");
                Ok(true)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load(&self, key: &SessionKey) -> RuntimeResult<Session> {
        let path = self.session_path(key);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {},
            Ok(false) => {
                debug!(session_key = %key, "No stored session, starting a new one");
                return Ok(Session::new(key.clone()));
            },
            Err(e) => return Err(e.into()),
        }

        let session = read_session(&path).await?;
        debug!(session_key = %key, messages = session.len(), "Session loaded");
        Ok(session)
    }

    async fn save(&self, session: &Session) -> RuntimeResult<()> {
        self.ensure_dir().await?;

        let path = self.session_path(&session.key);
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| RuntimeError::SerializationError(e.to_string()))?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &json).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(session_key = %session.key, path = %path.display(), "Session saved");
        Ok(())
    }
}

async fn read_session(path: &Path) -> RuntimeResult<Session> {
    let json = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&json).map_err(|e| RuntimeError::SerializationError(e.to_string()))
}

/// Map a session key to a safe file stem.
fn file_stem(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_STEM_LEN)
        .collect();
    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-memory session store. Sessions are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, Session>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored copy of a session, without creating one.
    #[must_use]
    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.get(key).map(|s| s.clone())
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &SessionKey) -> RuntimeResult<Session> {
        Ok(self
            .get(key)
            .unwrap_or_else(|| Session::new(key.clone())))
    }

    async fn save(&self, session: &Session) -> RuntimeResult<()> {
        self.sessions.insert(session.key.clone(), session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionMessage;

    #[tokio::test]
    async fn test_missing_session_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("sessions"));
        let session = store.load(&SessionKey::new("new-chat")).await.unwrap();
        assert!(session.is_empty());
        assert_eq!(session.key.as_str(), "new-chat");
    }

    #[tokio::test]
    async fn test_save_creates_dir_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("nested/sessions"));

        let mut session = Session::new(SessionKey::new("telegram:42"));
        session.add_message(SessionMessage::user("hello"));
        session.add_message(SessionMessage::assistant("hi there"));
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.key).await.unwrap();
        assert_eq!(loaded, session);
        assert!(store.directory().join("telegram_42.json").exists());
        assert!(!store.directory().join("telegram_42.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path());
        let mut session = Session::new(SessionKey::new("chat"));
        store.save(&session).await.unwrap();
        session.add_message(SessionMessage::user("again"));
        store.save(&session).await.unwrap();

        assert_eq!(store.load(&session.key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());

        for key in ["b", "a"] {
            store.save(&Session::new(SessionKey::new(key))).await.unwrap();
        }
        std::fs::write(dir.path().join("junk.json"), "not json").unwrap();

        let keys = store.list().await.unwrap();
        assert_eq!(keys, vec![SessionKey::new("a"), SessionKey::new("b")]);

        assert!(store.delete(&SessionKey::new("a")).await.unwrap());
        assert!(!store.delete(&SessionKey::new("a")).await.unwrap());
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_stem(""), "default");
        assert_eq!(file_stem(&"x".repeat(500)).len(), MAX_FILE_STEM_LEN);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        let key = SessionKey::new("mem");
        let mut session = store.load(&key).await.unwrap();
        assert!(store.is_empty());

        session.add_message(SessionMessage::user("hi"));
        store.save(&session).await.unwrap();
        assert_eq!(store.get(&key).unwrap().len(), 1);
        assert_eq!(store.len(), 1);
    }
}
