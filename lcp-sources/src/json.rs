//! Generic JSON-over-HTTP source.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use lcp_core::constants::REQUEST_TIMEOUT;
use lcp_core::error::{LcpError, Result};

/// Builds the outbound client shared by all sources.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LcpError::Config(format!("failed to build HTTP client: {e}")))
}

/// A JSON document served by an upstream URL.
#[derive(Clone, Debug)]
pub struct JsonSource {
    url: String,
    token: Option<String>,
}

impl JsonSource {
    /// Creates a source for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Upstream URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches and decodes the document.
    #[instrument(skip(self, client), fields(url = %self.url))]
    pub async fn fetch<T: DeserializeOwned>(&self, client: &Client) -> Result<T> {
        let mut request = client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        debug!(bytes = body.len(), "Fetched upstream document");

        serde_json::from_slice(&body).map_err(|e| LcpError::InvalidPayload(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> LcpError {
    if err.is_timeout() {
        LcpError::Timeout(err.to_string())
    } else {
        LcpError::Http(err.to_string())
    }
}

fn status_error(status: StatusCode) -> LcpError {
    let message = status.canonical_reason().unwrap_or("unknown status").to_string();
    if status == StatusCode::TOO_MANY_REQUESTS {
        LcpError::RateLimited(message)
    } else {
        LcpError::Upstream {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcp_core::models::SteamGame;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_decodes_json() {
        let server = serve(200, r#"[{"name":"Portal 2"}]"#).await;
        let source = JsonSource::new(format!("{}/games", server.uri()));

        let games: Value = source.fetch(&http_client().unwrap()).await.unwrap();
        assert_eq!(games, json!([{"name": "Portal 2"}]));
    }

    #[tokio::test]
    async fn test_fetch_decodes_typed_payload() {
        let server = serve(
            200,
            r#"[{"name":"Portal 2","app_id":620,"icon_url":"i","playtime_forever":1200,"url":"u","header_url":"h","achievement_progress":0.5}]"#,
        )
        .await;
        let source = JsonSource::new(format!("{}/games", server.uri()));

        let games: Vec<SteamGame> = source.fetch(&http_client().unwrap()).await.unwrap();
        assert_eq!(games[0].app_id, 620);
        assert_eq!(games[0].achievement_progress, Some(0.5));
        assert!(games[0].achievements.is_none());
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .and(header("authorization", "Bearer upstream-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
            .expect(1)
            .mount(&server)
            .await;

        let source = JsonSource::new(format!("{}/games", server.uri())).bearer("upstream-secret");
        let body: Value = source.fetch(&http_client().unwrap()).await.unwrap();
        assert_eq!(body, json!([1]));
    }

    #[tokio::test]
    async fn test_server_errors_are_expected() {
        let server = serve(503, "down").await;
        let source = JsonSource::new(format!("{}/games", server.uri()));

        let err = source.fetch::<Value>(&http_client().unwrap()).await.unwrap_err();
        assert!(matches!(err, LcpError::Upstream { status: 503, .. }));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_rate_limit_is_expected() {
        let server = serve(429, "").await;
        let source = JsonSource::new(format!("{}/games", server.uri()));

        let err = source.fetch::<Value>(&http_client().unwrap()).await.unwrap_err();
        assert!(matches!(err, LcpError::RateLimited(_)));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn test_client_errors_and_bad_payloads_are_unexpected() {
        let missing = serve(404, "").await;
        let err = JsonSource::new(format!("{}/games", missing.uri()))
            .fetch::<Value>(&http_client().unwrap())
            .await
            .unwrap_err();
        assert!(!err.is_expected());

        let garbled = serve(200, "<html>").await;
        let err = JsonSource::new(format!("{}/games", garbled.uri()))
            .fetch::<Value>(&http_client().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LcpError::InvalidPayload(_)));
        assert!(!err.is_expected());
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = Client::builder().timeout(Duration::from_millis(100)).build().unwrap();
        let err = JsonSource::new(server.uri()).fetch::<Value>(&client).await.unwrap_err();
        assert!(matches!(err, LcpError::Timeout(_)));
    }
}
