use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use quillsign_core::{CreateSubAccountInput, PortalBackend, SubAccount, SubAccountPermissions};
use quillsign_storage_sqlite::SqliteBackend;

/// Format a timestamp the way the schema's strftime defaults do.
pub fn fmt_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub async fn seed_main_account(backend: &SqliteBackend, id: &str, email: &str) {
    backend
        .register_main_account(id, email)
        .await
        .expect("seed main account");
}

pub async fn seed_sub_account(
    backend: &SqliteBackend,
    main_account_id: &str,
    username: &str,
    password: &str,
) -> SubAccount {
    backend
        .create_sub_account(&CreateSubAccountInput {
            main_account_id: main_account_id.to_string(),
            username: username.to_string(),
            display_name: format!("{username} (sub)"),
            password: password.to_string(),
            permissions: SubAccountPermissions::default(),
        })
        .await
        .expect("seed sub account")
}

/// Insert a document row owned by `user_id`; content is stored base64-encoded
/// with the decoded length recorded as the file size.
pub async fn seed_document(
    pool: &SqlitePool,
    user_id: &str,
    file_name: &str,
    content: &[u8],
    created_at: DateTime<Utc>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO pdf_document
            (id, user_id, file_name, template_name, form_title, signer_name,
             pdf_content, file_size, created_at)
         VALUES (?1, ?2, ?3, 'template', 'Form', 'Signer', ?4, ?5, ?6)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(file_name)
    .bind(BASE64.encode(content))
    .bind(content.len() as i64)
    .bind(fmt_datetime(created_at))
    .execute(pool)
    .await
    .expect("seed document");
    id
}

pub async fn seed_ticket(
    pool: &SqlitePool,
    user_id: &str,
    subject: &str,
    updated_at: DateTime<Utc>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO ticket (id, user_id, subject, status, updated_at)
         VALUES (?1, ?2, ?3, 'open', ?4)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(subject)
    .bind(fmt_datetime(updated_at))
    .execute(pool)
    .await
    .expect("seed ticket");
    id
}

/// `author` is "admin" or "user".
pub async fn seed_message(
    pool: &SqlitePool,
    ticket_id: &str,
    author: &str,
    created_at: DateTime<Utc>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO ticket_message (id, ticket_id, author, body, created_at)
         VALUES (?1, ?2, ?3, 'hello', ?4)",
    )
    .bind(&id)
    .bind(ticket_id)
    .bind(author)
    .bind(fmt_datetime(created_at))
    .execute(pool)
    .await
    .expect("seed message");
    id
}
