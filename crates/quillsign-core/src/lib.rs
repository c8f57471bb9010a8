pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{PortalConfig, ReadMarkerFallback};
pub use error::{PortalError, PortalResult};
pub use traits::{ClientStore, PortalBackend, SessionValidator};
pub use types::{
    CreateSubAccountInput, CredentialInput, CredentialOutcome, DocumentPage, MessageAuthor,
    PdfDocument, RealtimeEvent, SubAccount, SubAccountPermissions, SubAccountSession, Ticket,
    TicketMessage, UpdateSubAccountInput,
};
