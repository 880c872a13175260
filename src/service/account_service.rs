//! Account service: registration, password login and credential
//! resolution.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{CredentialError, CredentialService, hash_password, verify_password};
use crate::domain::User;
use crate::error::ApiError;
use crate::persistence::{Store, StoreError};

/// Registers users and turns passwords and credentials into identities.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    credentials: CredentialService,
}

impl AccountService {
    /// Creates a new `AccountService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, credentials: CredentialService) -> Self {
        Self { store, credentials }
    }

    /// Returns the credential service used to issue and validate tokens.
    #[must_use]
    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Conflict`] if the username is taken and
    /// [`ApiError::Internal`] if hashing fails.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let mut session = self.store.begin().await?;
        let user = session
            .insert_user(username, &password_hash, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    ApiError::Conflict(format!("username {username} is already registered"))
                }
                other => other.into(),
            })?;
        session.commit().await?;

        tracing::info!(user_id = %user.id, username, "user registered");
        Ok(user)
    }

    /// Checks a username and password pair.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for an unknown user or a wrong
    /// password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let mut session = self.store.begin().await?;
        let user = session
            .user_by_username(username)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        drop(session);

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .unwrap_or_else(|e| {
                tracing::error!(username, error = %e, "stored password hash is unreadable");
                false
            });

        if verified {
            Ok(user)
        } else {
            tracing::debug!(username, "password mismatch");
            Err(ApiError::Unauthorized)
        }
    }

    /// Authenticates and issues a credential with the default lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] on bad credentials and
    /// [`ApiError::Internal`] if signing fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let user = self.authenticate(username, password).await?;
        self.credentials
            .issue_default(&user.username)
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Resolves a bearer credential to the stored user it names.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the credential is invalid or
    /// expired, or if its subject is not a stored user.
    pub async fn resolve(&self, token: &str) -> Result<User, ApiError> {
        let username = self
            .credentials
            .validate(token, Utc::now())
            .map_err(|e: CredentialError| {
                tracing::debug!(error = %e, "credential rejected");
                ApiError::Unauthorized
            })?;

        let mut session = self.store.begin().await?;
        session
            .user_by_username(&username)
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use chrono::Duration;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryStore::new()),
            CredentialService::new(b"account-test-secret", Duration::minutes(30)),
        )
    }

    #[tokio::test]
    async fn register_login_resolve() {
        let accounts = service();
        let Ok(user) = accounts.register("alice", "pw1").await else {
            panic!("register should succeed");
        };
        assert_ne!(user.password_hash, "pw1");

        let Ok(token) = accounts.login("alice", "pw1").await else {
            panic!("login should succeed");
        };
        let Ok(resolved) = accounts.resolve(&token).await else {
            panic!("resolve should succeed");
        };
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let accounts = service();
        let Ok(_) = accounts.register("alice", "pw1").await else {
            panic!("register should succeed");
        };
        assert!(matches!(
            accounts.register("alice", "other").await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_unauthorized() {
        let accounts = service();
        let Ok(_) = accounts.register("alice", "pw1").await else {
            panic!("register should succeed");
        };
        assert!(matches!(
            accounts.login("alice", "nope").await,
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            accounts.login("mallory", "pw1").await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn credential_for_unknown_user_is_unauthorized() {
        let accounts = service();
        let Ok(token) = accounts.credentials().issue("ghost", Duration::hours(1)) else {
            panic!("issue should succeed");
        };
        assert!(matches!(
            accounts.resolve(&token).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn expired_credential_is_unauthorized() {
        let accounts = service();
        let Ok(_) = accounts.register("alice", "pw1").await else {
            panic!("register should succeed");
        };
        let Ok(token) = accounts.credentials().issue("alice", Duration::seconds(-1)) else {
            panic!("issue should succeed");
        };
        assert!(matches!(
            accounts.resolve(&token).await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn unreadable_stored_hash_is_unauthorized() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let Ok(mut session) = store.begin().await else {
            panic!("begin should succeed");
        };
        let Ok(_) = session.insert_user("alice", "not-a-phc-string", Utc::now()).await else {
            panic!("insert should succeed");
        };
        let Ok(()) = session.commit().await else {
            panic!("commit");
        };

        let accounts = AccountService::new(
            store,
            CredentialService::new(b"account-test-secret", Duration::minutes(30)),
        );
        assert!(matches!(
            accounts.authenticate("alice", "pw1").await,
            Err(ApiError::Unauthorized)
        ));
    }
}
