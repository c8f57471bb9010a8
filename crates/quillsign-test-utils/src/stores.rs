use sqlx::SqlitePool;
use tempfile::TempDir;

use quillsign_storage_sqlite::{SqliteBackend, SqliteClientStore};

pub struct TestStores {
    pub backend: SqliteBackend,
    pub client_store: SqliteClientStore,
    /// Raw pool on the same database, for seeding rows the portal never
    /// writes itself (documents, tickets, messages).
    pub pool: SqlitePool,
    /// Hold the TempDir to keep it alive for the test's duration.
    pub _tempdir: TempDir,
}

/// Create a fresh backend + client store backed by a tempdir.
///
/// Both share the same file-backed SQLite database, as they do when the
/// local fallback is selected at startup.
pub async fn create_test_stores() -> TestStores {
    let tempdir = TempDir::new().expect("failed to create tempdir");
    let db_path = tempdir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let backend = SqliteBackend::connect(&db_url)
        .await
        .expect("failed to connect backend");
    let client_store = SqliteClientStore::connect(&db_url)
        .await
        .expect("failed to connect client store");
    let pool = SqlitePool::connect(&db_url).await.expect("pool connect");

    TestStores {
        backend,
        client_store,
        pool,
        _tempdir: tempdir,
    }
}
