//! Password hashing

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::IdentityError;

/// Hash a password into an Argon2id PHC string
pub fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|error| IdentityError::Internal(format!("Failed to hash password: {}", error)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, IdentityError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|error| {
        IdentityError::Internal(format!("Failed to parse password hash: {}", error))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
