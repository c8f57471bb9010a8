pub mod backend;
pub mod client_store;
pub mod validator;

pub use backend::PortalBackend;
pub use client_store::{ClientStore, KEY_SESSION_TOKEN, KEY_SUB_ACCOUNT_DATA, ticket_read_time_key};
pub use validator::SessionValidator;
