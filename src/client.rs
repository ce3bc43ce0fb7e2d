//! HTTP client for the passgate API
//!
//! The access token is an argument of each protected call. The client holds
//! no credentials of its own, so one instance can be shared between callers
//! acting as different users.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{
    ErrorBody, HealthResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    UserProfile,
};

/// Client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Server answered with an API error body
    #[error("{} ({status}): {}", .body.error, .body.message)]
    Api { status: u16, body: ErrorBody },

    /// Server answered with something that is not an API response
    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl ClientError {
    /// HTTP status if the server responded
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request(_) => None,
            ClientError::Api { status, .. } | ClientError::UnexpectedResponse { status, .. } => {
                Some(*status)
            }
        }
    }

    /// Machine-readable error kind if the server sent one
    pub fn kind(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => Some(&body.error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(err.to_string())
    }
}

/// Typed client for the passgate HTTP API
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client with a custom reqwest Client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.client.get(self.url("/health")).send().await?;
        parse(response).await
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        debug!(username = %request.username, "Registering user");
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await?;
        parse(response).await
    }

    /// `POST /auth/login`
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        debug!(username = %username, "Logging in");
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest::new(username, password))
            .send()
            .await?;
        parse(response).await
    }

    /// `GET /auth/me` as the holder of `token`
    pub async fn me(&self, token: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        parse(response).await
    }

    /// `GET /auth/admin` as the holder of `token`
    pub async fn admin(&self, token: &str) -> Result<MessageResponse, ClientError> {
        let response = self
            .client
            .get(self.url("/auth/admin"))
            .bearer_auth(token)
            .send()
            .await?;
        parse(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(Into::into);
    }

    let text = response.text().await?;
    Err(error_from(status, &text))
}

fn error_from(status: StatusCode, text: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => ClientError::Api {
            status: status.as_u16(),
            body,
        },
        Err(_) => ClientError::UnexpectedResponse {
            status: status.as_u16(),
            body: text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Test 1: register posts the request and parses the profile
    #[tokio::test]
    async fn test_register() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({"username": "johndoe", "password": "password123"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "u-1",
                "username": "johndoe",
                "role": "user"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = AuthClient::new(mock_server.uri()).unwrap();
        let profile = client
            .register(&RegisterRequest::new("johndoe", "password123"))
            .await
            .unwrap();

        assert_eq!(profile.id, "u-1");
        assert_eq!(profile.role, Role::User);
    }

    // Test 2: API errors are decoded
    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_credentials",
                "message": "Invalid credentials"
            })))
            .mount(&mock_server)
            .await;

        let client = AuthClient::new(mock_server.uri()).unwrap();
        let err = client.login("johndoe", "nope").await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.kind(), Some("invalid_credentials"));
    }

    // Test 3: protected calls send the token they are given
    #[tokio::test]
    async fn test_token_is_sent_per_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer token-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a",
                "username": "alice",
                "role": "user"
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer token-b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "b",
                "username": "bob",
                "role": "admin"
            })))
            .mount(&mock_server)
            .await;

        let client = AuthClient::new(mock_server.uri()).unwrap();

        assert_eq!(client.me("token-a").await.unwrap().username, "alice");
        assert_eq!(client.me("token-b").await.unwrap().username, "bob");
        assert_eq!(client.me("token-a").await.unwrap().username, "alice");
    }

    // Test 4: unauthenticated calls carry no Authorization header
    #[tokio::test]
    async fn test_login_sends_no_authorization() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "a.b.c"})),
            )
            .mount(&mock_server)
            .await;

        let client = AuthClient::new(mock_server.uri()).unwrap();
        client.login("johndoe", "password123").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        let login = requests
            .iter()
            .find(|r| r.url.path() == "/auth/login")
            .unwrap();
        assert!(!login.headers.contains_key("authorization"));
    }

    // Test 5: non-JSON error bodies are kept verbatim
    #[tokio::test]
    async fn test_unexpected_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/admin"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let client = AuthClient::new(mock_server.uri()).unwrap();
        let err = client.admin("token").await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::UnexpectedResponse { status: 502, ref body } if body == "Bad Gateway"
        ));
        assert_eq!(err.kind(), None);
    }

    // Test 6: trailing slash in the base URL is ignored
    #[test]
    fn test_base_url_trailing_slash() {
        let client = AuthClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }

    // Test 7: connection failures are transport errors
    #[tokio::test]
    async fn test_connection_refused() {
        let client = AuthClient::new("http://127.0.0.1:9").unwrap();
        let err = client.health().await.unwrap_err();

        assert!(matches!(err, ClientError::Request(_)));
        assert_eq!(err.status(), None);
    }
}
