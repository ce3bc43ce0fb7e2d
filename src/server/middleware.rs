//! HTTP middleware for passgate
//!
//! This module provides middleware layers for:
//! - Bearer token authentication with per-route role requirements
//! - Error to HTTP response mapping
//! - Request/response logging

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthManager;
use crate::database::CredentialStore;
use crate::error::AuthError;
use crate::models::{ErrorBody, Role, User};

/// Access requirement attached to a group of routes
///
/// An empty role list admits any authenticated user.
pub struct AccessGuard<S: CredentialStore> {
    auth_manager: Arc<AuthManager<S>>,
    required_roles: Arc<[Role]>,
}

impl<S: CredentialStore> AccessGuard<S> {
    /// Require a valid token only
    pub fn authenticated(auth_manager: Arc<AuthManager<S>>) -> Self {
        Self::with_roles(auth_manager, &[])
    }

    /// Require a valid token and one of `roles`
    pub fn with_roles(auth_manager: Arc<AuthManager<S>>, roles: &[Role]) -> Self {
        Self {
            auth_manager,
            required_roles: Arc::from(roles),
        }
    }

    pub fn required_roles(&self) -> &[Role] {
        &self.required_roles
    }
}

impl<S: CredentialStore> Clone for AccessGuard<S> {
    fn clone(&self) -> Self {
        Self {
            auth_manager: Arc::clone(&self.auth_manager),
            required_roles: Arc::clone(&self.required_roles),
        }
    }
}

/// Authenticated user extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

/// Authentication middleware function
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Verifies the bearer token and loads the user
/// 3. Checks the user's role against the guard
/// 4. Adds the authenticated user to the request extensions
pub async fn auth_middleware<S: CredentialStore + 'static>(
    State(guard): State<AccessGuard<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let user = guard
        .auth_manager
        .authenticate_request(auth_header, &guard.required_roles)
        .await?;

    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

/// Error response for the HTTP API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError(pub AuthError);

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        if self.0.is_unauthenticated() {
            return StatusCode::UNAUTHORIZED;
        }

        match &self.0 {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername => StatusCode::CONFLICT,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected request body");
        Self(AuthError::Validation("Invalid request body".to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
