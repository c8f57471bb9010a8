use serde::{Deserialize, Serialize};

use crate::error::{PortalError, PortalResult};

/// What a sub-account is allowed to do with the owning account's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccountPermissions {
    pub pdf_access: bool,
    pub download_only: bool,
}

impl Default for SubAccountPermissions {
    fn default() -> Self {
        SubAccountPermissions {
            pdf_access: true,
            download_only: false,
        }
    }
}

/// A restricted credential set scoped to one main account.
///
/// A sub-account's effective data scope is always the owning main account's
/// resources; it can never see another account's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: String,
    pub main_account_id: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub permissions: SubAccountPermissions,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSubAccountInput {
    pub main_account_id: String,
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub permissions: SubAccountPermissions,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubAccountInput {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub permissions: Option<SubAccountPermissions>,
}

/// A client-held sub-account session: the opaque token plus a denormalized
/// copy of the sub-account record as returned by credential exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAccountSession {
    pub token: String,
    pub sub_account: SubAccount,
}

/// Input to the credential-exchange procedure. Lookup and password
/// verification happen on the backend side.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialInput {
    pub main_account_email: String,
    pub username: String,
    pub password: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// Outcome of credential exchange. All failure classes (missing
/// configuration, transport error, wrong credentials) collapse to `Failure`;
/// callers surface one generic message.
#[derive(Debug, Clone)]
pub enum CredentialOutcome {
    Success(SubAccountSession),
    Failure,
}

impl CredentialOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CredentialOutcome::Success(_))
    }
}

/// A generated PDF document owned by a main account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDocument {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub template_name: String,
    pub form_title: String,
    pub signer_name: String,
    /// Base64-encoded file content.
    pub pdf_content: String,
    /// Decoded size in bytes.
    pub file_size: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One page of documents plus the total count for pagination.
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub documents: Vec<PdfDocument>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub status: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: String,
    pub ticket_id: String,
    pub author: MessageAuthor,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A push event from the realtime stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    AdminMessage {
        ticket_id: String,
        message_id: String,
        created_at: chrono::DateTime<chrono::Utc>,
    },
}

/// Validate a sub-account username: 3-20 chars, alphanumeric plus `_`/`-`.
pub fn validate_username(username: &str) -> PortalResult<()> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(PortalError::InvalidUsername);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(PortalError::InvalidUsername);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_accepts_alphanumeric_dash_underscore() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a-b-c").is_ok());
    }

    #[test]
    fn username_rejects_bad_length() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(21)).is_err());
    }

    #[test]
    fn username_rejects_bad_chars() {
        assert!(validate_username("alice!").is_err());
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("alice@home").is_err());
    }
}
