use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use quillsign_core::{PortalError, PortalResult};

/// Hash a sub-account password with Argon2id.
///
/// The platform salts sub-account passwords with the owning main-account id,
/// so resets by the owner produce hashes verifiable without extra state.
pub fn hash_password(password: &str, main_account_id: &str) -> PortalResult<String> {
    let salt = SaltString::encode_b64(main_account_id.as_bytes())
        .map_err(|e| PortalError::Auth(format!("invalid password salt: {e}")))?;
    let argon2 = Argon2::default(); // Argon2id by default
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PortalError::Auth(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2id hash string.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` otherwise.
pub fn verify_password(password: &str, hash: &str) -> PortalResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PortalError::Auth(format!("invalid password hash: {e}")))?;
    let argon2 = Argon2::default();
    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PortalError::Auth(format!(
            "password verification failed: {e}"
        ))),
    }
}
