// Integration tests for the SQLite chat store

use webforge_storage::{ChatStore, CreateChatMessage, StorageError};

async fn store() -> ChatStore {
    ChatStore::connect("sqlite::memory:").await.unwrap()
}

fn message(session_id: i64, role: &str, content: &str) -> CreateChatMessage {
    CreateChatMessage {
        session_id,
        role: role.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_create_session_and_messages() {
    let store = store().await;
    let session = store.create_session("Build me a blog").await.unwrap();
    assert_eq!(session.title, "Build me a blog");

    store.add_message(message(session.id, "user", "hi")).await.unwrap();
    store
        .add_message(message(session.id, "assistant", "hello"))
        .await
        .unwrap();

    let messages = store.list_messages(session.id).await.unwrap();
    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant"]);
    assert_eq!(messages[1].content, "hello");

    let updated = store.get_session(session.id).await.unwrap().unwrap();
    assert!(updated.updated_at >= session.updated_at);
}

#[tokio::test]
async fn test_ensure_session_is_idempotent() {
    let store = store().await;
    let first = store.ensure_session(42, "Session").await.unwrap();
    let second = store.ensure_session(42, "Other title").await.unwrap();

    assert_eq!(first.id, 42);
    assert_eq!(second.title, "Session");
    assert_eq!(store.list_sessions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_sessions_newest_first() {
    let store = store().await;
    let older = store.create_session("one").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = store.create_session("two").await.unwrap();

    let ids: Vec<i64> = store
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn test_unknown_session() {
    let store = store().await;
    assert!(store.get_session(999).await.unwrap().is_none());
    assert!(store.list_messages(999).await.unwrap().is_empty());

    let err = store.add_message(message(999, "user", "x")).await.unwrap_err();
    assert!(matches!(err, StorageError::Database(_)));
}
