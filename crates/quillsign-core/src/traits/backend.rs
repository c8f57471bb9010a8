use async_trait::async_trait;

use crate::error::PortalResult;
use crate::types::{
    CreateSubAccountInput, CredentialInput, CredentialOutcome, PdfDocument, SubAccount, Ticket,
    TicketMessage, UpdateSubAccountInput,
};

/// The hosted platform's data surface, as seen by the portal.
///
/// Two implementations exist: the remote one (HTTP, selected when a backend
/// URL is configured) and the SQLite local fallback. Row-level restriction
/// of documents to the owning account is this seam's responsibility, not the
/// caller's.
#[async_trait]
pub trait PortalBackend: Send + Sync + 'static {
    /// Credential exchange. Lookup and password verification happen behind
    /// this call; every failure class collapses to
    /// [`CredentialOutcome::Failure`].
    async fn verify_credentials(&self, input: &CredentialInput)
    -> PortalResult<CredentialOutcome>;

    // Sub-account management (main-account holder surface)
    async fn create_sub_account(&self, input: &CreateSubAccountInput) -> PortalResult<SubAccount>;
    async fn list_sub_accounts(&self, main_account_id: &str) -> PortalResult<Vec<SubAccount>>;
    async fn update_sub_account(
        &self,
        id: &str,
        input: &UpdateSubAccountInput,
    ) -> PortalResult<SubAccount>;
    /// Overwrites the stored hash; no history is kept.
    async fn reset_password(&self, id: &str, new_password: &str) -> PortalResult<()>;
    async fn delete_sub_account(&self, id: &str) -> PortalResult<()>;

    // Scoped document access
    async fn count_documents(&self, owner_id: &str) -> PortalResult<i64>;
    /// Page is 1-based; rows are ordered by creation time descending.
    async fn list_documents(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> PortalResult<Vec<PdfDocument>>;

    // Support tickets
    async fn list_tickets(&self, user_id: &str) -> PortalResult<Vec<Ticket>>;
    async fn list_ticket_messages(&self, ticket_id: &str) -> PortalResult<Vec<TicketMessage>>;
    /// Bumps the ticket's `updated_at`; the best-effort server half of
    /// mark-as-read.
    async fn touch_ticket(&self, ticket_id: &str) -> PortalResult<()>;
}
