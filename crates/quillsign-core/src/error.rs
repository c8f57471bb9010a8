use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("sub-account not found")]
    SubAccountNotFound,

    #[error("invalid username")]
    InvalidUsername,

    #[error("username already taken")]
    UsernameTaken,

    #[error("invalid password")]
    InvalidPassword,

    #[error("not permitted: {0}")]
    NotPermitted(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type PortalResult<T> = Result<T, PortalError>;
