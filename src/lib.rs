//! passgate - username/password authentication service
//!
//! This crate provides user registration, password login issuing signed
//! access tokens, and bearer-token authentication with role checks, served
//! over HTTP and backed by SQLite.

pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;
pub mod telemetry;
