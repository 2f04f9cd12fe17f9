//! Credential handling: Argon2id password hashing and the fixed admin pair.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};

use crate::environment::Config;
use crate::errors::BackendError;

/// Hashes a password for storage. The result is a self-describing PHC
/// string carrying the salt and parameters, never the raw password.
pub fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(rand::thread_rng());

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|source| BackendError::PasswordHash { source })?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash. The comparison inside the
/// verifier is constant-time.
pub fn verify_password(password: &str, hash: &str) -> Result<(), BackendError> {
    let parsed =
        PasswordHash::new(hash).map_err(|source| BackendError::PasswordHash { source })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| BackendError::InvalidCredentials)
}

/// Checks a login attempt against the configured admin credential pair.
/// Admins are configuration, not rows in the student collection.
pub fn check_admin(config: &Config, email: &str, password: &str) -> Result<(), BackendError> {
    if config.admin_email == email && config.admin_password == password {
        Ok(())
    } else {
        Err(BackendError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use crate::environment::Config;
    use crate::errors::BackendError;

    use super::{check_admin, hash_password, verify_password};

    #[test]
    fn hashing_round_trips() {
        let hash = hash_password("s3cret horse").expect("hash password");

        assert_ne!(hash, "s3cret horse", "hash must not equal the raw password");
        assert!(verify_password("s3cret horse", &hash).is_ok());
    }

    #[test]
    fn wrong_passwords_fail() {
        let hash = hash_password("s3cret horse").expect("hash password");

        assert!(matches!(
            verify_password("not the password", &hash),
            Err(BackendError::InvalidCredentials)
        ));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("s3cret horse").expect("hash password");
        let second = hash_password("s3cret horse").expect("hash password");

        assert_ne!(first, second, "equal passwords must not share a hash");
    }

    #[test]
    fn admin_pair_is_checked() {
        let config = Config::new("admin@example.com".to_owned(), "letmein".to_owned());

        assert!(check_admin(&config, "admin@example.com", "letmein").is_ok());
        assert!(check_admin(&config, "admin@example.com", "wrong").is_err());
        assert!(check_admin(&config, "someone@example.com", "letmein").is_err());
    }
}
