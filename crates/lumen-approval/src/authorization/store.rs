//! Authorization store implementations.

use async_trait::async_trait;
use lumen_core::{AuthorizationId, AuthorizationScope};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Authorization, AuthorizationCheck, AuthorizationStore};
use crate::error::{ApprovalError, ApprovalResult};

/// In-memory authorization store. Approvals are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryAuthorizationStore {
    authorizations: RwLock<Vec<Authorization>>,
}

impl MemoryAuthorizationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remembered approvals.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read("count").len()
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, Vec<Authorization>> {
        self.authorizations.read().unwrap_or_else(|e| {
            warn!(op, "MemoryAuthorizationStore lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, Vec<Authorization>> {
        self.authorizations.write().unwrap_or_else(|e| {
            warn!(op, "MemoryAuthorizationStore lock poisoned, recovering");
            e.into_inner()
        })
    }
}

#[async_trait]
impl AuthorizationStore for MemoryAuthorizationStore {
    async fn check_authorization(
        &self,
        tool_name: &str,
        args: &Value,
    ) -> ApprovalResult<AuthorizationCheck> {
        let store = self.read("check");
        Ok(AuthorizationCheck::evaluate(store.iter(), tool_name, args))
    }

    async fn save_authorization(
        &self,
        tool_name: &str,
        args: &Value,
        scope: AuthorizationScope,
    ) -> ApprovalResult<Authorization> {
        let authorization = Authorization::new(tool_name, args, scope);
        self.write("save").push(authorization.clone());
        debug!(
            id = %authorization.id,
            tool = tool_name,
            scope = %authorization.scope,
            "Authorization remembered"
        );
        Ok(authorization)
    }

    async fn list_authorizations(&self) -> ApprovalResult<Vec<Authorization>> {
        Ok(self.read("list").clone())
    }

    async fn revoke_authorization(&self, id: &AuthorizationId) -> ApprovalResult<bool> {
        let mut store = self.write("revoke");
        let before = store.len();
        store.retain(|a| &a.id != id);
        Ok(store.len() != before)
    }
}

#[cfg(test)]
impl MemoryAuthorizationStore {
    /// Panic while holding the write lock.
    pub(super) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.authorizations.write();
            panic!("writer panicked");
        }));
    }
}

/// Authorization store backed by a JSON file.
///
/// The file is read once on [`open`](Self::open) and rewritten after every
/// change. Writes go to a temporary file first and are then renamed into
/// place, so a crash mid-write never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileAuthorizationStore {
    path: PathBuf,
    authorizations: Mutex<Vec<Authorization>>,
}

impl FileAuthorizationStore {
    /// Open a store, loading existing approvals if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> ApprovalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let authorizations = match tokio::fs::read_to_string(&path).await {
            Ok(json) if json.trim().is_empty() => Vec::new(),
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| ApprovalError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            count = authorizations.len(),
            "Authorization store opened"
        );
        Ok(Self {
            path,
            authorizations: Mutex::new(authorizations),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, authorizations: &[Authorization]) -> ApprovalResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(authorizations)
            .map_err(|e| ApprovalError::Serialization(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        debug!(path = %self.path.display(), count = authorizations.len(), "Authorizations saved");
        Ok(())
    }
}

#[async_trait]
impl AuthorizationStore for FileAuthorizationStore {
    async fn check_authorization(
        &self,
        tool_name: &str,
        args: &Value,
    ) -> ApprovalResult<AuthorizationCheck> {
        let store = self.authorizations.lock().await;
        Ok(AuthorizationCheck::evaluate(store.iter(), tool_name, args))
    }

    async fn save_authorization(
        &self,
        tool_name: &str,
        args: &Value,
        scope: AuthorizationScope,
    ) -> ApprovalResult<Authorization> {
        let authorization = Authorization::new(tool_name, args, scope);
        let mut store = self.authorizations.lock().await;
        store.push(authorization.clone());
        if let Err(e) = self.persist(&store).await {
            store.pop();
            return Err(e);
        }
        info!(
            id = %authorization.id,
            tool = tool_name,
            scope = %authorization.scope,
            "Authorization remembered"
        );
        Ok(authorization)
    }

    async fn list_authorizations(&self) -> ApprovalResult<Vec<Authorization>> {
        Ok(self.authorizations.lock().await.clone())
    }

    async fn revoke_authorization(&self, id: &AuthorizationId) -> ApprovalResult<bool> {
        let mut store = self.authorizations.lock().await;
        let Some(index) = store.iter().position(|a| &a.id == id) else {
            return Ok(false);
        };
        let removed = store.remove(index);
        if let Err(e) = self.persist(&store).await {
            store.insert(index, removed);
            return Err(e);
        }
        info!(%id, "Authorization revoked");
        Ok(true)
    }
}
