//! Salted scrypt password hashes in PHC string form.

use crate::error::AppError;
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Params, Scrypt,
};

#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// `log_n` is the scrypt CPU/memory cost exponent; r = 8, p = 1, 32-byte output.
    pub fn new(log_n: u8) -> Result<Self, AppError> {
        let params = Params::new(log_n, 8, 1, 32)
            .map_err(|e| AppError::Internal(format!("scrypt params: {}", e)))?;
        Ok(PasswordHasher { params })
    }

    /// Hash on a blocking thread; scrypt is deliberately slow.
    pub async fn hash(&self, password: String) -> Result<String, AppError> {
        let params = self.params;
        tokio::task::spawn_blocking(move || hash_with(&password, params))
            .await
            .map_err(|e| AppError::Internal(format!("hash task: {}", e)))?
    }

    /// Cost parameters are read from the stored hash, so old hashes keep verifying
    /// after `log_n` changes.
    pub async fn verify(&self, password: String, stored: String) -> bool {
        tokio::task::spawn_blocking(move || verify_with(&password, &stored))
            .await
            .unwrap_or(false)
    }

    /// Like [`Self::verify`], but a missing hash still costs one scrypt run so an unknown
    /// account answers in the same time as a wrong password.
    pub async fn verify_or_burn(&self, password: String, stored: Option<String>) -> bool {
        match stored {
            Some(stored) => self.verify(password, stored).await,
            None => {
                let params = self.params;
                let _ = tokio::task::spawn_blocking(move || hash_with(&password, params)).await;
                false
            }
        }
    }
}

fn hash_with(password: &str, params: Params) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Scrypt
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("hash password: {}", e)))
}

fn verify_with(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Scrypt.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}
