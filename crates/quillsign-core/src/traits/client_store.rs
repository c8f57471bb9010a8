use async_trait::async_trait;

use crate::error::PortalResult;

/// Storage key for the opaque session token.
pub const KEY_SESSION_TOKEN: &str = "sub_account_session_token";

/// Storage key for the serialized sub-account record.
pub const KEY_SUB_ACCOUNT_DATA: &str = "sub_account_data";

/// Per-ticket local read marker, namespaced by ticket id.
pub fn ticket_read_time_key(ticket_id: &str) -> String {
    format!("ticket_read_time:{ticket_id}")
}

/// Durable client-side key/value storage shared across the application.
///
/// Each subsystem owns a disjoint key namespace (session keys vs. per-ticket
/// read markers) so no coordination beyond key naming is needed.
#[async_trait]
pub trait ClientStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> PortalResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> PortalResult<()>;
    async fn remove(&self, key: &str) -> PortalResult<()>;
}
