use async_trait::async_trait;

use crate::error::PortalResult;

/// Background session validation. An extension point: the shipped
/// implementation never invalidates (see `quillsign-portal`), and with
/// `trust_on_restore` set a negative verdict is logged and ignored anyway.
#[async_trait]
pub trait SessionValidator: Send + Sync + 'static {
    async fn validate(&self, token: &str) -> PortalResult<bool>;
}
