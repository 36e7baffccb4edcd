//! Echo endpoint wire contract
//!
//! An echo endpoint is created by POSTing an `EchoDefinition` to `/create`;
//! the server answers with a `CreateEchoResponse` and from then on serves
//! the definition verbatim under `/echo/{id}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Caller-supplied description of what an echo endpoint should reply with.
///
/// Every field is optional; the default is an instant `200` response with
/// no headers and an empty body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoDefinition {
    /// HTTP status code to respond with (default 200)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Response headers, sent exactly as given and nothing else
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Seconds to wait before responding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl EchoDefinition {
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay = Some(seconds);
        self
    }
}

/// Reply to `POST /create`: the identifier of the new echo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEchoResponse {
    pub id: String,
}
