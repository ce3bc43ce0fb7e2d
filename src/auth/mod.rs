//! Authentication system for passgate
//!
//! This module provides authentication and authorization functionality:
//! - Password hashing and verification
//! - Access token issuance and verification
//! - Role-based access checks

pub mod access;
pub mod jwt;
pub mod manager;
pub mod password;

pub use access::{authorize, bearer_token, BEARER_SCHEME};
pub use jwt::{Claims, TokenCodec, TokenError};
pub use manager::{validate_registration, AuthConfig, AuthManager};
pub use password::{hash_password, verify_password, HashError};
