use tempfile::TempDir;

use quillsign_core::ClientStore;
use quillsign_storage_sqlite::SqliteClientStore;

async fn setup() -> (SqliteClientStore, TempDir) {
    let tempdir = TempDir::new().unwrap();
    let db_path = tempdir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = SqliteClientStore::connect(&db_url).await.unwrap();
    (store, tempdir)
}

#[tokio::test]
async fn put_get_roundtrip() {
    let (store, _dir) = setup().await;
    store.put("sub_account_session_token", "tok-1").await.unwrap();
    assert_eq!(
        store.get("sub_account_session_token").await.unwrap().as_deref(),
        Some("tok-1")
    );
}

#[tokio::test]
async fn put_overwrites() {
    let (store, _dir) = setup().await;
    store.put("ticket_read_time:t1", "2026-01-01T00:00:00Z").await.unwrap();
    store.put("ticket_read_time:t1", "2026-02-01T00:00:00Z").await.unwrap();
    assert_eq!(
        store.get("ticket_read_time:t1").await.unwrap().as_deref(),
        Some("2026-02-01T00:00:00Z")
    );
}

#[tokio::test]
async fn missing_key_is_none() {
    let (store, _dir) = setup().await;
    assert!(store.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn remove_is_idempotent() {
    let (store, _dir) = setup().await;
    store.put("k", "v").await.unwrap();
    store.remove("k").await.unwrap();
    assert!(store.get("k").await.unwrap().is_none());
    store.remove("k").await.unwrap();
}

#[tokio::test]
async fn survives_reconnect() {
    let tempdir = TempDir::new().unwrap();
    let db_path = tempdir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    {
        let store = SqliteClientStore::connect(&db_url).await.unwrap();
        store.put("sub_account_data", "{}").await.unwrap();
    }

    let store = SqliteClientStore::connect(&db_url).await.unwrap();
    assert_eq!(store.get("sub_account_data").await.unwrap().as_deref(), Some("{}"));
}
