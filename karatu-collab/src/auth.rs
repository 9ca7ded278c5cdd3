use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{
    util::random_string, Database, DatabaseError, KaratuContext, NewSession, NewUser, SessionData,
    UserData,
};

pub struct Auth<Db> {
    context: KaratuContext<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An admin already exists")]
    AdminExists,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(context: &KaratuContext<Db>) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user by email, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await?;

        let user = self
            .context
            .database
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        let new_session = self
            .context
            .database
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        Ok(new_session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.context.database.delete_session_by_token(token).await
    }

    /// Creates a regular learner account
    pub async fn register(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        self.create_user(NewUser {
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            admin: false,
        })
        .await
    }

    /// Creates the admin account, if one doesn't already exist
    pub async fn register_admin(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        let has_admin = self
            .context
            .database
            .check_for_admin()
            .await
            .map_err(AuthError::Db)?;

        if has_admin {
            return Err(AuthError::AdminExists);
        }

        self.create_user(NewUser {
            username: new_user.username,
            email: new_user.email,
            password: new_user.password,
            admin: true,
        })
        .await
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.context.database.session_by_token(token).await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.context
            .database
            .create_user(NewUser {
                username: new_user.username,
                email: new_user.email,
                password: hashed_password,
                admin: new_user.admin,
            })
            .await
            .map_err(AuthError::Db)
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.context
            .database
            .clear_expired_sessions()
            .await
            .map_err(AuthError::Db)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewPlainUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDatabase;
    use std::sync::Arc;

    fn context() -> KaratuContext<MemoryDatabase> {
        KaratuContext {
            database: Arc::new(MemoryDatabase::new()),
        }
    }

    fn amina() -> NewPlainUser {
        NewPlainUser {
            username: "amina".to_string(),
            email: "amina@example.com".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let context = context();
        let auth = Auth::new(&context);

        let user = auth.register(amina()).await.expect("registers");
        assert_ne!(user.password, "correct horse", "password is hashed");

        let session = auth
            .login(Credentials {
                email: "amina@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .expect("logs in");

        assert_eq!(session.user.id, user.id);

        let restored = auth.session(&session.token).await.expect("session exists");
        assert_eq!(restored.user.username, "amina");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let context = context();
        let auth = Auth::new(&context);

        auth.register(amina()).await.expect("registers");

        let result = auth
            .login(Credentials {
                email: "amina@example.com".to_string(),
                password: "wrong horse".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let context = context();
        let auth = Auth::new(&context);

        auth.register(amina()).await.expect("registers");

        let result = auth
            .register(NewPlainUser {
                username: "other".to_string(),
                ..amina()
            })
            .await;

        assert!(matches!(
            result,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn only_one_admin_can_be_registered() {
        let context = context();
        let auth = Auth::new(&context);

        let admin = auth.register_admin(amina()).await.expect("registers");
        assert!(admin.admin);

        let result = auth
            .register_admin(NewPlainUser {
                username: "usurper".to_string(),
                email: "usurper@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::AdminExists)));
    }

    #[tokio::test]
    async fn logout_deletes_the_session() {
        let context = context();
        let auth = Auth::new(&context);

        auth.register(amina()).await.expect("registers");
        let session = auth
            .login(Credentials {
                email: "amina@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .expect("logs in");

        auth.logout(&session.token).await.expect("logs out");

        assert!(auth.session(&session.token).await.is_err());
    }
}
