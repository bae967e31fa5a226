//! Account registration, credential checks, and administrator bootstrap.

use crate::error::AppError;
use crate::model::{Credentials, NewUser, Session, ADMIN_ROLE, DEFAULT_ROLE};
use crate::password::PasswordHasher;
use crate::service::RequestValidator;
use crate::session::SessionStore;
use crate::store::Store;

pub struct AccountService;

impl AccountService {
    /// Register with the default role. A taken email fails with `Conflict`.
    pub async fn sign_up(
        store: &dyn Store,
        hasher: &PasswordHasher,
        credentials: Credentials,
    ) -> Result<i64, AppError> {
        RequestValidator::email(&credentials.email)?;
        RequestValidator::password(&credentials.password)?;
        if store.email_exists(&credentials.email).await? {
            return Err(AppError::Conflict("Email already exists".into()));
        }
        let password_hash = hasher.hash(credentials.password).await?;
        let id = store
            .insert_user(&NewUser {
                email: credentials.email,
                password_hash,
                role: DEFAULT_ROLE.into(),
            })
            .await?;
        tracing::info!(uid = id, "user registered");
        Ok(id)
    }

    /// Check credentials and open a new session. Unknown email and wrong password are
    /// indistinguishable to the caller.
    pub async fn sign_in(
        store: &dyn Store,
        hasher: &PasswordHasher,
        sessions: &SessionStore,
        credentials: Credentials,
    ) -> Result<Session, AppError> {
        let user = store.find_user_by_email(&credentials.email).await?;
        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let verified = hasher.verify_or_burn(credentials.password, stored).await;
        match user {
            Some(user) if verified => sessions.create(user.id).await,
            Some(user) => {
                tracing::warn!(uid = user.id, "sign-in rejected: password mismatch");
                Err(AppError::Unauthenticated("invalid credentials"))
            }
            None => Err(AppError::Unauthenticated("invalid credentials")),
        }
    }

    /// Create the administrator account, or promote an existing account with that email.
    /// An existing password is left untouched.
    pub async fn ensure_admin(
        store: &dyn Store,
        hasher: &PasswordHasher,
        email: &str,
        password: &str,
    ) -> Result<(), AppError> {
        RequestValidator::email(email)?;
        if store.set_user_role(email, ADMIN_ROLE).await? {
            tracing::info!(email = %email, "existing user promoted to admin");
            return Ok(());
        }
        let password_hash = hasher.hash(password.to_string()).await?;
        store
            .insert_user(&NewUser {
                email: email.to_string(),
                password_hash,
                role: ADMIN_ROLE.into(),
            })
            .await?;
        tracing::info!(email = %email, "admin user created");
        Ok(())
    }
}
