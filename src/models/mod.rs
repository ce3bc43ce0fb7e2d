//! Data models for passgate
//!
//! This module contains the stored user record and the request and response
//! bodies of the HTTP API.

pub mod api;
pub mod user;

pub use api::{ErrorBody, HealthResponse, MessageResponse};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserProfile};
