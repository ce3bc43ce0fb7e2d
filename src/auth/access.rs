//! Role-based access checks
//!
//! Route restrictions are plain data (a list of allowed roles) checked with
//! [`authorize`], rather than metadata looked up at request time.

use crate::models::{Role, User};

/// Authentication scheme for bearer credentials in the `Authorization` header
pub const BEARER_SCHEME: &str = "Bearer";

/// Whether `identity` may access a resource restricted to `required_roles`
///
/// An empty `required_roles` means the resource is open to any
/// authenticated user.
pub fn authorize(identity: &User, required_roles: &[Role]) -> bool {
    required_roles.is_empty() || required_roles.contains(&identity.role)
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively. Returns `None` for other schemes
/// and for an empty token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
