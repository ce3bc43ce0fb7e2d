//! Authentication manager
//!
//! This module provides the main authentication interface for the application.
//! It handles registration, login, token-based identity resolution, role
//! checks and administrator seeding.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::Duration;
use tracing::{debug, error, info};

use crate::database::CredentialStore;
use crate::error::{AuthError, DbError};
use crate::models::{LoginResponse, RegisterRequest, Role, User, UserProfile};

use super::access::{authorize, bearer_token};
use super::jwt::TokenCodec;
use super::password::{hash_password, verify_password};

/// Minimum username length in characters
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length in characters
pub const USERNAME_MAX_LEN: usize = 20;

/// Minimum password length in characters
pub const PASSWORD_MIN_LEN: usize = 6;

/// Configuration for the authentication manager
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,

    /// Access token lifetime
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl_secs", &self.token_ttl.num_seconds())
            .finish()
    }
}

/// Authentication manager
///
/// Stateless between calls apart from the shared store; safe to share behind
/// an `Arc` across concurrent requests.
pub struct AuthManager<S: CredentialStore> {
    store: Arc<S>,
    codec: TokenCodec,
}

impl<S: CredentialStore> AuthManager<S> {
    /// Create a new authentication manager
    pub fn new(store: Arc<S>, config: AuthConfig) -> Self {
        let codec = TokenCodec::new(config.jwt_secret.as_bytes(), config.token_ttl);
        Self { store, codec }
    }

    /// Token codec used for issuing and verifying access tokens
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new user
    ///
    /// Input is validated before the store is touched. The role defaults to
    /// [`Role::User`].
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, AuthError> {
        validate_registration(&request.username, &request.password)?;

        let role = request.role.unwrap_or_default();
        let user = self
            .create_user(request.username, request.password, role)
            .await?;

        info!(
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "User registered"
        );

        Ok(user.profile())
    }

    /// Log in with username and password
    ///
    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::InvalidCredentials`], and both run one Argon2 verification.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let user = self
            .store
            .find_by_username(username)
            .await
            .map_err(store_failure)?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let password_ok = check_password(password, stored_hash).await?;

        let user = match user {
            Some(user) if password_ok => user,
            _ => {
                debug!(username = %username, "Login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self.codec.issue_for(&user)?;
        info!(user_id = %user.id, "Login succeeded");

        Ok(LoginResponse { access_token })
    }

    /// Resolve the user behind an access token
    ///
    /// The user is re-read from the store, so a token for a user that no
    /// longer exists fails with [`AuthError::PrincipalNotFound`].
    pub async fn resolve_identity(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.codec.verify(token)?;

        self.store
            .find_by_id(&claims.sub)
            .await
            .map_err(store_failure)?
            .ok_or(AuthError::PrincipalNotFound)
    }

    /// Authenticate a request from its `Authorization` header and check roles
    ///
    /// - no header or a non-bearer scheme: [`AuthError::MissingAuth`]
    /// - bad token or missing user: the matching token error
    /// - role not in `required_roles`: [`AuthError::Forbidden`]
    pub async fn authenticate_request(
        &self,
        authorization: Option<&str>,
        required_roles: &[Role],
    ) -> Result<User, AuthError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthError::MissingAuth)?;

        let user = self.resolve_identity(token).await?;

        if !authorize(&user, required_roles) {
            debug!(user_id = %user.id, role = %user.role, "Access forbidden");
            return Err(AuthError::Forbidden);
        }

        Ok(user)
    }

    /// Create an administrator if none exists
    ///
    /// Returns `true` when an account was created. Idempotent.
    pub async fn ensure_admin_exists(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, AuthError> {
        let existing = self
            .store
            .find_by_role(Role::Admin)
            .await
            .map_err(store_failure)?;

        if existing.is_some() {
            return Ok(false);
        }

        validate_registration(username, password)?;
        let user = self
            .create_user(username.to_string(), password.to_string(), Role::Admin)
            .await?;

        info!(user_id = %user.id, username = %user.username, "Admin user created");
        Ok(true)
    }

    async fn create_user(
        &self,
        username: String,
        password: String,
        role: Role,
    ) -> Result<User, AuthError> {
        let existing = self
            .store
            .find_by_username(&username)
            .await
            .map_err(store_failure)?;

        if existing.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = hash_off_thread(password).await?;
        let user = User::new(username, password_hash, role);

        match self.store.insert_user(&user).await {
            Ok(()) => Ok(user),
            // Lost a race with a concurrent registration
            Err(DbError::ConstraintViolation(_)) => Err(AuthError::DuplicateUsername),
            Err(e) => Err(store_failure(e)),
        }
    }
}

/// Check username and password length rules
pub fn validate_registration(username: &str, password: &str) -> Result<(), AuthError> {
    let username_len = username.chars().count();
    if username_len < USERNAME_MIN_LEN {
        return Err(AuthError::Validation(format!(
            "Username must be at least {} characters long",
            USERNAME_MIN_LEN
        )));
    }
    if username_len > USERNAME_MAX_LEN {
        return Err(AuthError::Validation(format!(
            "Username must not exceed {} characters",
            USERNAME_MAX_LEN
        )));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

fn store_failure(err: DbError) -> AuthError {
    error!(error = %err, "Credential store failure");
    AuthError::StoreFailure
}

/// Digest verified against when the username is unknown
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("passgate-decoy-password").unwrap_or_default())
}

async fn hash_off_thread(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            AuthError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            AuthError::Internal
        })
}

async fn check_password(password: &str, stored_hash: Option<String>) -> Result<bool, AuthError> {
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            let _ = verify_password(&password, decoy_hash());
            false
        }
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Password verification task failed");
        AuthError::Internal
    })
}
