//! HTTP router for passgate
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks
//! - Registration and login
//! - Token-protected profile and admin endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

use super::middleware::{
    auth_middleware, logging_middleware, AccessGuard, ApiError, AuthenticatedUser,
};
use crate::auth::AuthManager;
use crate::database::CredentialStore;
use crate::models::{
    HealthResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role,
    UserProfile,
};

/// Shared application state
pub struct AppState<S: CredentialStore> {
    /// Authentication manager
    pub auth_manager: Arc<AuthManager<S>>,
}

impl<S: CredentialStore> AppState<S> {
    pub fn new(auth_manager: Arc<AuthManager<S>>) -> Self {
        Self { auth_manager }
    }
}

impl<S: CredentialStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            auth_manager: Arc::clone(&self.auth_manager),
        }
    }
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the auth manager
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<S: CredentialStore + 'static>(state: AppState<S>) -> Router {
    let authenticated = AccessGuard::authenticated(Arc::clone(&state.auth_manager));
    let admin_only = AccessGuard::with_roles(Arc::clone(&state.auth_manager), &[Role::Admin]);

    let profile_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            authenticated,
            auth_middleware::<S>,
        ));

    let admin_routes = Router::new()
        .route("/auth/admin", get(admin_handler))
        .route_layer(middleware::from_fn_with_state(
            admin_only,
            auth_middleware::<S>,
        ));

    Router::new()
        // Health endpoint (no auth required)
        .route("/health", get(health_handler))
        // Credential endpoints (no auth required)
        .route("/auth/register", post(register_handler::<S>))
        .route("/auth/login", post(login_handler::<S>))
        .with_state(state)
        // Token-protected endpoints
        .merge(profile_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(logging_middleware))
}

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Registration handler
async fn register_handler<S: CredentialStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let Json(request) = payload?;
    let profile = state.auth_manager.register(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Login handler
async fn login_handler<S: CredentialStore + 'static>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state
        .auth_manager
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(response))
}

/// Current user's profile
async fn me_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<UserProfile> {
    Json(user.profile())
}

/// Admin-only endpoint
async fn admin_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<MessageResponse> {
    tracing::debug!(user_id = %user.id, "Admin endpoint accessed");
    Json(MessageResponse::new("Admin access granted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, AuthConfig};
    use crate::database::MockCredentialStore;
    use crate::error::DbError;
    use crate::models::{ErrorBody, User};
    use axum::http::{header, HeaderValue};
    use axum_test::TestServer;
    use serde_json::json;

    const TEST_SECRET: &str = "router-test-secret-0123456789abcdef";

    fn create_test_state(store: MockCredentialStore) -> AppState<MockCredentialStore> {
        let auth_manager = Arc::new(AuthManager::new(
            Arc::new(store),
            AuthConfig::new(TEST_SECRET, chrono::Duration::hours(1)),
        ));
        AppState::new(auth_manager)
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    // Test 1: Health endpoint returns OK
    #[tokio::test]
    async fn test_health_endpoint_returns_ok() {
        let app = build_router(create_test_state(MockCredentialStore::new()));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: HealthResponse = response.json();
        assert_eq!(body.status, "healthy");
        assert!(!body.version.is_empty());
    }

    // Test 2: Register returns 201 with the profile
    #[tokio::test]
    async fn test_register_created() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));
        store.expect_insert_user().returning(|_| Ok(()));

        let server = TestServer::new(build_router(create_test_state(store))).unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({"username": "johndoe", "password": "password123"}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["username"], "johndoe");
        assert_eq!(body["role"], "user");
        assert!(body.get("password_hash").is_none());
        assert!(body.get("password").is_none());
    }

    // Test 3: Register with a short username returns 400
    #[tokio::test]
    async fn test_register_validation_error() {
        let server =
            TestServer::new(build_router(create_test_state(MockCredentialStore::new()))).unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({"username": "jo", "password": "password123"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "validation_error");
    }

    // Test 4: Malformed JSON returns 400
    #[tokio::test]
    async fn test_register_malformed_body() {
        let server =
            TestServer::new(build_router(create_test_state(MockCredentialStore::new()))).unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({"username": "johndoe"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "validation_error");
    }

    // Test 5: Register with a taken username returns 409
    #[tokio::test]
    async fn test_register_conflict() {
        let existing = User::new("johndoe", "hash", Role::User);
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(move |_| Ok(Some(existing.clone())));

        let server = TestServer::new(build_router(create_test_state(store))).unwrap();

        let response = server
            .post("/auth/register")
            .json(&json!({"username": "johndoe", "password": "password123"}))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    // Test 6: Login with good credentials returns a token
    #[tokio::test]
    async fn test_login_ok() {
        let user = User::new("johndoe", hash_password("password123").unwrap(), Role::User);
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let server = TestServer::new(build_router(create_test_state(store))).unwrap();

        let response = server
            .post("/auth/login")
            .json(&json!({"username": "johndoe", "password": "password123"}))
            .await;

        response.assert_status_ok();
        let body: LoginResponse = response.json();
        assert_eq!(body.access_token.split('.').count(), 3);
    }

    // Test 7: Login with bad credentials returns 401
    #[tokio::test]
    async fn test_login_unauthorized() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_username().returning(|_| Ok(None));

        let server = TestServer::new(build_router(create_test_state(store))).unwrap();

        let response = server
            .post("/auth/login")
            .json(&json!({"username": "nouser", "password": "whatever"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "invalid_credentials");
        assert_eq!(body.message, "Invalid credentials");
    }

    // Test 8: /auth/me requires a token
    #[tokio::test]
    async fn test_me_requires_token() {
        let server =
            TestServer::new(build_router(create_test_state(MockCredentialStore::new()))).unwrap();

        let response = server.get("/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    // Test 9: /auth/me returns the caller's profile
    #[tokio::test]
    async fn test_me_returns_profile() {
        let user = User::new("johndoe", "hash", Role::User);
        let stored = user.clone();
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));

        let state = create_test_state(store);
        let token = state.auth_manager.codec().issue_for(&user).unwrap();
        let server = TestServer::new(build_router(state)).unwrap();

        let response = server
            .get("/auth/me")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        response.assert_status_ok();
        let body: UserProfile = response.json();
        assert_eq!(body, user.profile());
    }

    // Test 10: /auth/admin distinguishes user and admin
    #[tokio::test]
    async fn test_admin_route_roles() {
        let user = User::new("johndoe", "hash", Role::User);
        let admin = User::new("root", "hash", Role::Admin);
        let users = [user.clone(), admin.clone()];

        let mut store = MockCredentialStore::new();
        store.expect_find_by_id().returning(move |id| {
            Ok(users.iter().find(|u| u.id == id).cloned())
        });

        let state = create_test_state(store);
        let user_token = state.auth_manager.codec().issue_for(&user).unwrap();
        let admin_token = state.auth_manager.codec().issue_for(&admin).unwrap();
        let server = TestServer::new(build_router(state)).unwrap();

        let response = server
            .get("/auth/admin")
            .add_header(header::AUTHORIZATION, bearer(&user_token))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .get("/auth/admin")
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .await;
        response.assert_status_ok();
        let body: MessageResponse = response.json();
        assert_eq!(body.message, "Admin access granted");
    }

    // Test 11: Store failure surfaces as a generic 500
    #[tokio::test]
    async fn test_store_failure_is_500() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_username()
            .returning(|_| Err(DbError::Connection("database is locked".to_string())));

        let server = TestServer::new(build_router(create_test_state(store))).unwrap();

        let response = server
            .post("/auth/login")
            .json(&json!({"username": "johndoe", "password": "password123"}))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = response.json();
        assert_eq!(body.error, "store_failure");
        assert!(!body.message.contains("locked"));
    }
}
