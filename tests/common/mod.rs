//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use passgate::auth::{AuthConfig, AuthManager};
use passgate::config::ServerConfig;
use passgate::database::SqliteStore;
use passgate::server::{AppState, Server};

/// Signing secret used by every integration test
pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789";

/// Create an in-memory credential store for testing
pub async fn create_test_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create a test authentication manager with a one hour token lifetime
pub fn create_test_auth_manager(store: Arc<SqliteStore>) -> Arc<AuthManager<SqliteStore>> {
    create_test_auth_manager_with_ttl(store, chrono::Duration::hours(1))
}

/// Create a test authentication manager with a custom token lifetime
pub fn create_test_auth_manager_with_ttl(
    store: Arc<SqliteStore>,
    ttl: chrono::Duration,
) -> Arc<AuthManager<SqliteStore>> {
    Arc::new(AuthManager::new(store, AuthConfig::new(TEST_JWT_SECRET, ttl)))
}

/// Create a test application state
pub async fn create_test_state() -> AppState<SqliteStore> {
    let store = create_test_store().await;
    AppState::new(create_test_auth_manager(store))
}

/// Create a test server configuration with a random port
pub fn create_test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign a free port
    }
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteStore>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let server = Server::new(create_test_server_config(), state);
    tokio::spawn(async move {
        server
            .run_with_listener(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    (addr, shutdown_tx)
}
