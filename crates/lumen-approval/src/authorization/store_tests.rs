use super::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// MemoryAuthorizationStore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_memory_empty_store_is_unauthorized() {
    let store = MemoryAuthorizationStore::new();
    let check = store
        .check_authorization("exec", &json!({"command": "ls"}))
        .await
        .unwrap();
    assert!(!check.authorized);
    assert!(check.suggested_scopes.contains(&AuthorizationScope::Tool));
}

#[tokio::test]
async fn test_tool_scope_authorizes_different_args() {
    let store = MemoryAuthorizationStore::new();
    store
        .save_authorization("send_email", &json!({"to": "a@b.c"}), AuthorizationScope::Tool)
        .await
        .unwrap();

    let check = store
        .check_authorization("send_email", &json!({"to": "someone@else.org", "body": "x"}))
        .await
        .unwrap();
    assert!(check.authorized);
}

#[tokio::test]
async fn test_exact_scope_rejects_different_args() {
    let store = MemoryAuthorizationStore::new();
    store
        .save_authorization("send_email", &json!({"to": "a@b.c"}), AuthorizationScope::Exact)
        .await
        .unwrap();

    assert!(
        store
            .check_authorization("send_email", &json!({"to": "a@b.c"}))
            .await
            .unwrap()
            .authorized
    );
    assert!(
        !store
            .check_authorization("send_email", &json!({"to": "other@b.c"}))
            .await
            .unwrap()
            .authorized
    );
}

#[tokio::test]
async fn test_pattern_scope_covers_same_subcommand() {
    let store = MemoryAuthorizationStore::new();
    store
        .save_authorization(
            "exec",
            &json!({"command": "git status"}),
            AuthorizationScope::Pattern,
        )
        .await
        .unwrap();

    let covered = store
        .check_authorization("exec", &json!({"command": "git status --porcelain"}))
        .await
        .unwrap();
    assert!(covered.authorized);
    assert_eq!(
        covered.matched.unwrap().pattern.as_deref(),
        Some("git status *")
    );

    let other = store
        .check_authorization("exec", &json!({"command": "git push --force"}))
        .await
        .unwrap();
    assert!(!other.authorized);
}

#[tokio::test]
async fn test_memory_list_and_revoke() {
    let store = MemoryAuthorizationStore::new();
    let saved = store
        .save_authorization("exec", &json!({"command": "ls"}), AuthorizationScope::Tool)
        .await
        .unwrap();
    assert_eq!(store.count(), 1);
    assert_eq!(store.list_authorizations().await.unwrap(), vec![saved.clone()]);

    assert!(store.revoke_authorization(&saved.id).await.unwrap());
    assert!(!store.revoke_authorization(&saved.id).await.unwrap());
    assert!(
        !store
            .check_authorization("exec", &json!({"command": "ls"}))
            .await
            .unwrap()
            .authorized
    );
}

#[tokio::test]
async fn test_pattern_scope_with_glob_subject_stays_exact() {
    let store = MemoryAuthorizationStore::new();
    let saved = store
        .save_authorization("exec", &json!({"command": "* --help"}), AuthorizationScope::Pattern)
        .await
        .unwrap();
    assert_eq!(saved.scope, AuthorizationScope::Exact);
    assert!(
        !store
            .check_authorization("exec", &json!({"command": "rm -rf /"}))
            .await
            .unwrap()
            .authorized
    );

    let saved = store
        .save_authorization(
            "write_file",
            &json!({"path": "/home/u/**/notes.txt"}),
            AuthorizationScope::Pattern,
        )
        .await
        .unwrap();
    assert_eq!(saved.scope, AuthorizationScope::Exact);
    assert!(
        !store
            .check_authorization("write_file", &json!({"path": "/home/u/.ssh/authorized_keys"}))
            .await
            .unwrap()
            .authorized
    );
}

#[tokio::test]
async fn test_memory_store_recovers_poisoned_lock() {
    let store = MemoryAuthorizationStore::new();
    let saved = store
        .save_authorization("exec", &json!({"command": "ls"}), AuthorizationScope::Tool)
        .await
        .unwrap();
    store.poison();

    assert!(
        store
            .check_authorization("exec", &json!({"command": "pwd"}))
            .await
            .unwrap()
            .authorized
    );
    assert_eq!(store.list_authorizations().await.unwrap().len(), 1);
    assert!(store.revoke_authorization(&saved.id).await.unwrap());
    store
        .save_authorization("exec", &json!({"command": "ls"}), AuthorizationScope::Exact)
        .await
        .unwrap();
    assert_eq!(store.count(), 1);
}

// ---------------------------------------------------------------------------
// FileAuthorizationStore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_file_store_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileAuthorizationStore::open(dir.path().join("auth.json"))
        .await
        .unwrap();
    assert!(store.list_authorizations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("auth.json");

    let saved = {
        let store = FileAuthorizationStore::open(&path).await.unwrap();
        store
            .save_authorization("exec", &json!({"command": "ls -la"}), AuthorizationScope::Exact)
            .await
            .unwrap()
    };
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = FileAuthorizationStore::open(&path).await.unwrap();
    assert_eq!(reopened.list_authorizations().await.unwrap(), vec![saved]);
    assert!(
        reopened
            .check_authorization("exec", &json!({"command": "ls -la"}))
            .await
            .unwrap()
            .authorized
    );
}

#[tokio::test]
async fn test_file_store_revoke_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.json");

    let store = FileAuthorizationStore::open(&path).await.unwrap();
    let saved = store
        .save_authorization("write_file", &json!({"path": "/tmp/a.txt"}), AuthorizationScope::Tool)
        .await
        .unwrap();
    assert!(store.revoke_authorization(&saved.id).await.unwrap());

    let reopened = FileAuthorizationStore::open(&path).await.unwrap();
    assert!(reopened.list_authorizations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = FileAuthorizationStore::open(&path).await.unwrap_err();
    assert!(matches!(err, crate::error::ApprovalError::Serialization(_)));
}
