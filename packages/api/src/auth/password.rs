//! # Credentials: sign-up rules and Argon2id password hashing
//!
//! - [`validate_sign_up`] enforces the sign-up rules before anything is sent
//!   to the provider: the email must contain `@` and the password must be at
//!   least `min_len` characters.
//! - [`hash_password`] / [`verify_password`] are used by
//!   [`crate::auth::MemoryAuth`] to store PHC-format Argon2id hashes instead of
//!   plaintext passwords.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AuthError;

/// Normalize an email for lookup: trimmed, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_sign_up(email: &str, password: &str, min_len: usize) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < min_len {
        return Err(AuthError::WeakPassword { min_len });
    }
    Ok(())
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Provider(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Provider(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_rules() {
        assert_eq!(validate_sign_up("ada@example.com", "secret", 6), Ok(()));
        assert_eq!(
            validate_sign_up("ada.example.com", "secret", 6),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            validate_sign_up("ada@example.com", "12345", 6),
            Err(AuthError::WeakPassword { min_len: 6 })
        );
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
        assert!(verify_password("x", "not a hash").is_err());
    }
}
