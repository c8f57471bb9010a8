use std::sync::Arc;

use async_trait::async_trait;

use quillsign_core::config::SessionConfig;
use quillsign_core::traits::{KEY_SESSION_TOKEN, KEY_SUB_ACCOUNT_DATA};
use quillsign_core::{ClientStore, PortalResult, SessionValidator};
use quillsign_portal::{ClientContext, SessionManager};
use quillsign_test_utils::{
    MemoryClientStore, TestStores, create_test_stores, seed_main_account, seed_sub_account,
};

async fn setup() -> (TestStores, Arc<quillsign_storage_sqlite::SqliteBackend>) {
    let stores = create_test_stores().await;
    seed_main_account(&stores.backend, "m1", "owner@test.com").await;
    seed_sub_account(&stores.backend, "m1", "alice", "correct-horse").await;
    let backend = Arc::new(stores.backend.clone());
    (stores, backend)
}

fn manager(
    backend: Arc<quillsign_storage_sqlite::SqliteBackend>,
    store: Arc<quillsign_storage_sqlite::SqliteClientStore>,
    trust_on_restore: bool,
) -> SessionManager<quillsign_storage_sqlite::SqliteBackend, quillsign_storage_sqlite::SqliteClientStore>
{
    SessionManager::new(
        backend,
        store,
        &SessionConfig { trust_on_restore },
        ClientContext::default(),
    )
}

// ── Login ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_populates_state_and_storage() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store.clone(), true);

    let outcome = manager
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(manager.is_sub_account().await);

    let session = manager.current().await.unwrap();
    assert_eq!(session.sub_account.main_account_id, "m1");

    let token = store.get(KEY_SESSION_TOKEN).await.unwrap();
    assert_eq!(token.as_deref(), Some(session.token.as_str()));
    assert!(store.get(KEY_SUB_ACCOUNT_DATA).await.unwrap().is_some());
}

#[tokio::test]
async fn failed_login_touches_nothing() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store.clone(), true);

    let outcome = manager
        .login("owner@test.com", "alice", "wrong-password")
        .await
        .unwrap();
    assert!(!outcome.is_success());
    assert!(!manager.is_sub_account().await);
    assert!(store.get(KEY_SESSION_TOKEN).await.unwrap().is_none());
    assert!(store.get(KEY_SUB_ACCOUNT_DATA).await.unwrap().is_none());
}

// ── Restore ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_survives_reload() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());

    let first = manager(backend.clone(), store.clone(), true);
    first
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();
    let original = first.current().await.unwrap();

    // a "page reload": a fresh manager over the same durable storage,
    // restored before any validation runs
    let second = manager(backend, store, true);
    assert!(second.restore().await.unwrap());
    assert!(second.is_sub_account().await);
    let restored = second.current().await.unwrap();
    assert_eq!(restored.sub_account.id, original.sub_account.id);
    assert_eq!(restored.token, original.token);
}

#[tokio::test]
async fn corrupt_stored_record_clears_both_keys() {
    let (_stores, backend) = setup().await;
    let store = Arc::new(MemoryClientStore::new());
    store.put(KEY_SESSION_TOKEN, "tok-1").await.unwrap();
    store.put(KEY_SUB_ACCOUNT_DATA, "not json {").await.unwrap();

    let manager = SessionManager::new(
        backend,
        store.clone(),
        &SessionConfig {
            trust_on_restore: true,
        },
        ClientContext::default(),
    );
    assert!(!manager.restore().await.unwrap());
    assert!(!manager.is_sub_account().await);
    assert!(store.get(KEY_SESSION_TOKEN).await.unwrap().is_none());
    assert!(store.get(KEY_SUB_ACCOUNT_DATA).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_keys_restore_as_logged_out() {
    let (_stores, backend) = setup().await;
    let manager = SessionManager::new(
        backend,
        Arc::new(MemoryClientStore::new()),
        &SessionConfig {
            trust_on_restore: true,
        },
        ClientContext::default(),
    );
    assert!(!manager.restore().await.unwrap());
    assert!(!manager.is_sub_account().await);
}

// ── Logout & validation ─────────────────────────────────────────────────

#[tokio::test]
async fn logout_clears_storage_and_state() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store.clone(), true);
    manager
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();

    manager.logout().await.unwrap();
    assert!(!manager.is_sub_account().await);
    assert!(store.get(KEY_SESSION_TOKEN).await.unwrap().is_none());
    assert!(store.get(KEY_SUB_ACCOUNT_DATA).await.unwrap().is_none());
}

struct RejectingValidator;

#[async_trait]
impl SessionValidator for RejectingValidator {
    async fn validate(&self, _token: &str) -> PortalResult<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn shipped_validator_never_invalidates() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store, true);
    manager
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();

    manager.validate_current().await;
    assert!(manager.is_sub_account().await);
}

#[tokio::test]
async fn trust_on_restore_ignores_negative_verdict() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store, true).with_validator(Arc::new(RejectingValidator));
    manager
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();

    manager.validate_current().await;
    assert!(manager.is_sub_account().await, "trusted session must survive");
}

#[tokio::test]
async fn hardened_mode_clears_rejected_session() {
    let (stores, backend) = setup().await;
    let store = Arc::new(stores.client_store.clone());
    let manager = manager(backend, store.clone(), false).with_validator(Arc::new(RejectingValidator));
    manager
        .login("owner@test.com", "alice", "correct-horse")
        .await
        .unwrap();

    manager.validate_current().await;
    assert!(!manager.is_sub_account().await);
    assert!(store.get(KEY_SESSION_TOKEN).await.unwrap().is_none());
}
