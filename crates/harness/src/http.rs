//! HTTP test server client
//!
//! Thin wrapper around the local test server's base URL: creates echo
//! endpoints and composes static asset URLs. Failures surface through the
//! returned future; nothing is retried.

use pagetest_protocol::EchoDefinition;
use tracing::debug;

use crate::error::{HarnessError, Result};

/// Client for the local HTTP test server.
#[derive(Debug, Clone)]
pub struct TestServer {
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create an echo endpoint and return its URL.
    ///
    /// A non-2xx reply fails with the response's status text; a 2xx reply
    /// without a string `id` field fails with the offending payload.
    pub async fn create_echo(&self, options: &EchoDefinition) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/create", self.base_url))
            .json(options)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map_or_else(|| status.as_u16().to_string(), str::to_string);
            return Err(HarnessError::EchoCreate(reason));
        }
        let data: serde_json::Value = response.json().await?;
        match data.get("id").and_then(serde_json::Value::as_str) {
            Some(id) => {
                debug!(id, "echo endpoint created");
                Ok(format!("{}/echo/{id}", self.base_url))
            }
            None => Err(HarnessError::InvalidServerResponse(data.to_string())),
        }
    }

    /// URL of a static asset under the server's `/static/` prefix, with
    /// any trailing separator trimmed. An empty path yields the bare
    /// `/static` base.
    pub fn static_url(&self, path: &str) -> String {
        format!("{}/static/{path}", self.base_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// The `/static` base as handed to asynchronous test bodies.
    pub fn static_base_url(&self) -> String {
        self.static_url("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_url_composition() {
        let server = TestServer::new("http://localhost:8000");
        assert_eq!(
            server.static_url("sub/asset.css"),
            "http://localhost:8000/static/sub/asset.css"
        );
    }

    #[test]
    fn test_static_url_trims_trailing_separator() {
        let server = TestServer::new("http://localhost:8000");
        assert_eq!(server.static_url(""), "http://localhost:8000/static");
        assert_eq!(server.static_url("dir/"), "http://localhost:8000/static/dir");
        assert_eq!(server.static_base_url(), "http://localhost:8000/static");
    }

    #[test]
    fn test_base_url_normalized() {
        let server = TestServer::new("http://localhost:8000/");
        assert_eq!(server.base_url(), "http://localhost:8000");
    }
}
