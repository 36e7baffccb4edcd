//! Harness error taxonomy
//!
//! Protocol violations are raised synchronously from the guarded entry
//! points; echo client failures surface through the returned future and
//! are never retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// A second test registration or completion went through a guarded path.
    #[error("must only call test() or async_test() once per page")]
    TestAlreadyRegistered,

    /// Output was recorded before document-ready created the sink.
    #[error("output sink does not exist yet; println is only valid after document-ready")]
    OutputSinkMissing,

    /// The node passed to `print_element` is not an element.
    #[error("not an element node")]
    NotAnElement,

    /// `/create` answered with a non-2xx status.
    #[error("error creating echo: {0}")]
    EchoCreate(String),

    /// `/create` answered 2xx but without a string `id` field.
    #[error("invalid response from HTTP test server: {0}")]
    InvalidServerResponse(String),

    /// Transport-level failure talking to the test server.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}
