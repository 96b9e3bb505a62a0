//! Argon2id password hashing and verification.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Verified against when the account does not exist, so unknown emails cost
/// the same Argon2 run as wrong passwords.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_password("no-such-account").unwrap_or_default());

/// Hashes a plaintext password into a PHC string (algorithm, params and salt included).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

/// [`verify_password`] on the blocking pool. With no stored hash the password
/// is checked against a dummy hash and the result is always `false`.
pub async fn verify_password_blocking(
    password: String,
    stored_hash: Option<String>,
) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash)
            .map_err(|e| anyhow::anyhow!("Stored password hash is invalid: {e}")),
        None => {
            let _ = verify_password(&password, &DUMMY_HASH);
            Ok(false)
        }
    })
    .await?
}

pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    Ok(())
}
