use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use quillsign_core::{
    PdfDocument, PortalError, SubAccountPermissions, SubAccountSession,
};
use quillsign_portal::DocumentAccess;
use quillsign_test_utils::{
    TestStores, create_test_stores, seed_document, seed_main_account, seed_sub_account,
};

async fn login_session(stores: &TestStores, main_account_id: &str) -> SubAccountSession {
    seed_main_account(&stores.backend, main_account_id, &format!("{main_account_id}@test.com"))
        .await;
    let sub_account =
        seed_sub_account(&stores.backend, main_account_id, "alice", "correct-horse").await;
    SubAccountSession {
        token: "test-token".to_string(),
        sub_account,
    }
}

#[tokio::test]
async fn page_returns_only_owned_documents() {
    let stores = create_test_stores().await;
    let session = login_session(&stores, "m1").await;
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    seed_document(&stores.pool, "m1", "mine.pdf", b"abc", base).await;
    seed_document(&stores.pool, "m2", "theirs.pdf", b"def", base).await;

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let page = access.page(&session, 1).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.documents.len(), 1);
    assert!(page.documents.iter().all(|d| d.user_id == "m1"));
}

#[tokio::test]
async fn fifteen_documents_page_one_of_ten() {
    let stores = create_test_stores().await;
    let session = login_session(&stores, "m1").await;
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    for i in 0..15 {
        seed_document(
            &stores.pool,
            "m1",
            &format!("doc-{i}.pdf"),
            b"content",
            base + Duration::minutes(i),
        )
        .await;
    }

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let page = access.page(&session, 1).await.unwrap();
    assert_eq!(page.total, 15);
    assert_eq!(page.documents.len(), 10);
    assert_eq!(page.documents[0].file_name, "doc-14.pdf", "newest first");
    assert_eq!(page.documents[9].file_name, "doc-5.pdf");
}

#[tokio::test]
async fn pdf_access_disabled_is_not_permitted() {
    let stores = create_test_stores().await;
    let mut session = login_session(&stores, "m1").await;
    session.sub_account.permissions = SubAccountPermissions {
        pdf_access: false,
        download_only: false,
    };

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let err = access.page(&session, 1).await.unwrap_err();
    assert!(matches!(err, PortalError::NotPermitted(_)));
}

#[tokio::test]
async fn download_reconstructs_original_bytes() {
    let stores = create_test_stores().await;
    let session = login_session(&stores, "m1").await;
    let content = b"%PDF-1.4 fake document body";
    let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    seed_document(&stores.pool, "m1", "contract.pdf", content, base).await;

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let page = access.page(&session, 1).await.unwrap();
    let document = &page.documents[0];
    assert_eq!(document.file_size, content.len() as i64);

    let dir = TempDir::new().unwrap();
    let path = access.download(document, dir.path()).await.unwrap();
    let written = tokio::fs::read(&path).await.unwrap();
    assert_eq!(written, content);
    assert_eq!(written.len() as i64, document.file_size);
}

#[tokio::test]
async fn download_rejects_size_mismatch() {
    let stores = create_test_stores().await;
    let document = PdfDocument {
        id: "d1".to_string(),
        user_id: "m1".to_string(),
        file_name: "bad.pdf".to_string(),
        template_name: String::new(),
        form_title: String::new(),
        signer_name: String::new(),
        pdf_content: "AAAA".to_string(), // 3 bytes decoded
        file_size: 99,
        created_at: Utc::now(),
    };

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let dir = TempDir::new().unwrap();
    let err = access.download(&document, dir.path()).await.unwrap_err();
    assert!(matches!(err, PortalError::Decode(_)));
}

#[tokio::test]
async fn download_uses_only_final_path_component() {
    let stores = create_test_stores().await;
    let content = b"x";
    let document = PdfDocument {
        id: "d1".to_string(),
        user_id: "m1".to_string(),
        file_name: "../escape.pdf".to_string(),
        template_name: String::new(),
        form_title: String::new(),
        signer_name: String::new(),
        pdf_content: "eA==".to_string(),
        file_size: content.len() as i64,
        created_at: Utc::now(),
    };

    let access = DocumentAccess::new(Arc::new(stores.backend.clone()), 10);
    let dir = TempDir::new().unwrap();
    let path = access.download(&document, dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("escape.pdf"));
}
