use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};

use quillsign_core::{
    CreateSubAccountInput, CredentialInput, CredentialOutcome, PdfDocument, PortalBackend,
    PortalError, PortalResult, SubAccount, SubAccountPermissions, SubAccountSession, Ticket,
    TicketMessage, UpdateSubAccountInput,
};
use quillsign_core::types::{MessageAuthor, validate_username};

use crate::password::{hash_password, verify_password};

/// Local-fallback portal backend. Selected at startup when no remote backend
/// is configured; implements the same semantics the hosted service provides.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

/// Parse a SQLite datetime text string into a chrono DateTime<Utc>.
///
/// SQLite stores datetimes as TEXT in the format produced by
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, which yields strings like
/// `2025-01-01T00:00:00.000Z`.
fn parse_datetime(s: &str) -> Result<chrono::DateTime<Utc>, PortalError> {
    // Try RFC 3339 first (handles the trailing Z)
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Fallback: parse as NaiveDateTime with milliseconds
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    // Fallback: parse without fractional seconds
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(PortalError::Storage(format!("failed to parse datetime: {s}")))
}

/// Parse an optional SQLite datetime text string.
fn parse_datetime_opt(s: Option<&str>) -> Result<Option<chrono::DateTime<Utc>>, PortalError> {
    match s {
        Some(s) => Ok(Some(parse_datetime(s)?)),
        None => Ok(None),
    }
}

fn storage_err(e: impl std::fmt::Display) -> PortalError {
    PortalError::Storage(e.to_string())
}

/// Map a sqlx row to a SubAccount.
fn row_to_sub_account(row: &sqlx::sqlite::SqliteRow) -> Result<SubAccount, PortalError> {
    let id: String = row.try_get("id").map_err(storage_err)?;
    let main_account_id: String = row.try_get("main_account_id").map_err(storage_err)?;
    let username: String = row.try_get("username").map_err(storage_err)?;
    let display_name: String = row.try_get("display_name").map_err(storage_err)?;
    let password_hash: String = row.try_get("password_hash").map_err(storage_err)?;
    let is_active: bool = row.try_get("is_active").map_err(storage_err)?;
    let pdf_access: bool = row.try_get("pdf_access").map_err(storage_err)?;
    let download_only: bool = row.try_get("download_only").map_err(storage_err)?;
    let last_login_at: Option<String> = row.try_get("last_login_at").map_err(storage_err)?;
    let created_at: String = row.try_get("created_at").map_err(storage_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(storage_err)?;

    Ok(SubAccount {
        id,
        main_account_id,
        username,
        display_name,
        password_hash: Some(password_hash),
        is_active,
        permissions: SubAccountPermissions {
            pdf_access,
            download_only,
        },
        last_login_at: parse_datetime_opt(last_login_at.as_deref())?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<PdfDocument, PortalError> {
    let created_at: String = row.try_get("created_at").map_err(storage_err)?;
    Ok(PdfDocument {
        id: row.try_get("id").map_err(storage_err)?,
        user_id: row.try_get("user_id").map_err(storage_err)?,
        file_name: row.try_get("file_name").map_err(storage_err)?,
        template_name: row.try_get("template_name").map_err(storage_err)?,
        form_title: row.try_get("form_title").map_err(storage_err)?,
        signer_name: row.try_get("signer_name").map_err(storage_err)?,
        pdf_content: row.try_get("pdf_content").map_err(storage_err)?,
        file_size: row.try_get("file_size").map_err(storage_err)?,
        created_at: parse_datetime(&created_at)?,
    })
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, PortalError> {
    let updated_at: String = row.try_get("updated_at").map_err(storage_err)?;
    Ok(Ticket {
        id: row.try_get("id").map_err(storage_err)?,
        user_id: row.try_get("user_id").map_err(storage_err)?,
        subject: row.try_get("subject").map_err(storage_err)?,
        status: row.try_get("status").map_err(storage_err)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<TicketMessage, PortalError> {
    let author: String = row.try_get("author").map_err(storage_err)?;
    let author = match author.as_str() {
        "admin" => MessageAuthor::Admin,
        "user" => MessageAuthor::User,
        other => {
            return Err(PortalError::Storage(format!(
                "unknown message author: {other}"
            )));
        }
    };
    let created_at: String = row.try_get("created_at").map_err(storage_err)?;
    Ok(TicketMessage {
        id: row.try_get("id").map_err(storage_err)?,
        ticket_id: row.try_get("ticket_id").map_err(storage_err)?,
        author,
        body: row.try_get("body").map_err(storage_err)?,
        created_at: parse_datetime(&created_at)?,
    })
}

/// SQL fragment for the sub-account SELECT.
const SUB_ACCOUNT_SELECT: &str = r#"
    SELECT
        id,
        main_account_id,
        username,
        display_name,
        password_hash,
        is_active,
        pdf_access,
        download_only,
        last_login_at,
        created_at,
        updated_at
    FROM sub_account
"#;

impl SqliteBackend {
    pub async fn connect(url: &str) -> PortalResult<Self> {
        let pool = SqlitePool::connect(url).await.map_err(storage_err)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(storage_err)?;

        Ok(Self { pool })
    }

    /// Provisioning hook for the local fallback: the primary auth system
    /// owns main accounts, so the fallback only mirrors (id, email).
    pub async fn register_main_account(&self, id: &str, email: &str) -> PortalResult<()> {
        sqlx::query("INSERT INTO main_account (id, email) VALUES (?1, ?2)")
            .bind(id)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_sub_account(&self, id: &str) -> PortalResult<Option<SubAccount>> {
        let sql = format!("{SUB_ACCOUNT_SELECT} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(row_to_sub_account).transpose()
    }

    /// The fallible half of credential exchange. `Ok(None)` means the
    /// credentials did not match; errors are collapsed by the caller.
    async fn try_login(&self, input: &CredentialInput) -> PortalResult<Option<SubAccountSession>> {
        let main_account_id: Option<String> =
            sqlx::query("SELECT id FROM main_account WHERE email = ?1")
                .bind(&input.main_account_email)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?
                .map(|row| row.try_get("id").map_err(storage_err))
                .transpose()?;
        let Some(main_account_id) = main_account_id else {
            return Ok(None);
        };

        let sql = format!("{SUB_ACCOUNT_SELECT} WHERE main_account_id = ?1 AND username = ?2");
        let row = sqlx::query(&sql)
            .bind(&main_account_id)
            .bind(&input.username)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut sub_account = row_to_sub_account(&row)?;

        if !sub_account.is_active {
            return Ok(None);
        }

        let hash = sub_account
            .password_hash
            .as_deref()
            .ok_or_else(|| PortalError::Storage("missing password hash".to_string()))?;
        if !verify_password(&input.password, hash)? {
            return Ok(None);
        }

        let token = hex::encode(rand::random::<[u8; 32]>());
        sqlx::query(
            "INSERT INTO session_token (token, sub_account_id, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&token)
        .bind(&sub_account.id)
        .bind(&input.ip_address)
        .bind(&input.user_agent)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "UPDATE sub_account
             SET last_login_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?1",
        )
        .bind(&sub_account.id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        // The denormalized record handed to the client carries no hash.
        sub_account.password_hash = None;
        sub_account.last_login_at = Some(Utc::now());

        Ok(Some(SubAccountSession {
            token,
            sub_account,
        }))
    }
}

#[async_trait]
impl PortalBackend for SqliteBackend {
    async fn verify_credentials(
        &self,
        input: &CredentialInput,
    ) -> PortalResult<CredentialOutcome> {
        match self.try_login(input).await {
            Ok(Some(session)) => Ok(CredentialOutcome::Success(session)),
            Ok(None) => Ok(CredentialOutcome::Failure),
            Err(e) => {
                tracing::warn!("credential exchange failed: {e}");
                Ok(CredentialOutcome::Failure)
            }
        }
    }

    async fn create_sub_account(&self, input: &CreateSubAccountInput) -> PortalResult<SubAccount> {
        validate_username(&input.username)?;

        let taken = sqlx::query(
            "SELECT 1 FROM sub_account WHERE main_account_id = ?1 AND username = ?2",
        )
        .bind(&input.main_account_id)
        .bind(&input.username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        if taken.is_some() {
            return Err(PortalError::UsernameTaken);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let password_hash = hash_password(&input.password, &input.main_account_id)?;

        sqlx::query(
            "INSERT INTO sub_account
                (id, main_account_id, username, display_name, password_hash,
                 is_active, pdf_access, download_only)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
        )
        .bind(&id)
        .bind(&input.main_account_id)
        .bind(&input.username)
        .bind(&input.display_name)
        .bind(&password_hash)
        .bind(input.permissions.pdf_access)
        .bind(input.permissions.download_only)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        self.get_sub_account(&id)
            .await?
            .ok_or(PortalError::SubAccountNotFound)
    }

    async fn list_sub_accounts(&self, main_account_id: &str) -> PortalResult<Vec<SubAccount>> {
        let sql = format!("{SUB_ACCOUNT_SELECT} WHERE main_account_id = ?1 ORDER BY created_at");
        let rows = sqlx::query(&sql)
            .bind(main_account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(row_to_sub_account).collect()
    }

    async fn update_sub_account(
        &self,
        id: &str,
        input: &UpdateSubAccountInput,
    ) -> PortalResult<SubAccount> {
        let (pdf_access, download_only) = match input.permissions {
            Some(p) => (Some(p.pdf_access), Some(p.download_only)),
            None => (None, None),
        };

        let result = sqlx::query(
            "UPDATE sub_account SET
                display_name = COALESCE(?1, display_name),
                is_active = COALESCE(?2, is_active),
                pdf_access = COALESCE(?3, pdf_access),
                download_only = COALESCE(?4, download_only),
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?5",
        )
        .bind(&input.display_name)
        .bind(input.is_active)
        .bind(pdf_access)
        .bind(download_only)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(PortalError::SubAccountNotFound);
        }

        self.get_sub_account(id)
            .await?
            .ok_or(PortalError::SubAccountNotFound)
    }

    async fn reset_password(&self, id: &str, new_password: &str) -> PortalResult<()> {
        let sub_account = self
            .get_sub_account(id)
            .await?
            .ok_or(PortalError::SubAccountNotFound)?;
        let password_hash = hash_password(new_password, &sub_account.main_account_id)?;

        sqlx::query(
            "UPDATE sub_account SET
                password_hash = ?1,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?2",
        )
        .bind(&password_hash)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_sub_account(&self, id: &str) -> PortalResult<()> {
        let result = sqlx::query("DELETE FROM sub_account WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(PortalError::SubAccountNotFound);
        }
        Ok(())
    }

    async fn count_documents(&self, owner_id: &str) -> PortalResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM pdf_document WHERE user_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        row.try_get("total").map_err(storage_err)
    }

    async fn list_documents(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> PortalResult<Vec<PdfDocument>> {
        let offset = i64::from(page.max(1) - 1) * i64::from(page_size);
        let rows = sqlx::query(
            "SELECT id, user_id, file_name, template_name, form_title, signer_name,
                    pdf_content, file_size, created_at
             FROM pdf_document
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(owner_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_document).collect()
    }

    async fn list_tickets(&self, user_id: &str) -> PortalResult<Vec<Ticket>> {
        let rows = sqlx::query(
            "SELECT id, user_id, subject, status, updated_at
             FROM ticket
             WHERE user_id = ?1
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_ticket).collect()
    }

    async fn list_ticket_messages(&self, ticket_id: &str) -> PortalResult<Vec<TicketMessage>> {
        let rows = sqlx::query(
            "SELECT id, ticket_id, author, body, created_at
             FROM ticket_message
             WHERE ticket_id = ?1
             ORDER BY created_at",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(row_to_message).collect()
    }

    async fn touch_ticket(&self, ticket_id: &str) -> PortalResult<()> {
        let result = sqlx::query(
            "UPDATE ticket
             SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?1",
        )
        .bind(ticket_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(PortalError::Storage(format!(
                "ticket not found: {ticket_id}"
            )));
        }
        Ok(())
    }
}
