// pagetest-harness library
// Mediates how a test page announces "I am done" exactly once, collecting
// whatever text was written to the output sink along the way.

// Core lifecycle
pub mod page;

// Output capture document model
pub mod dom;

// Host capability object
pub mod internals;

// HTTP test server client
pub mod http;

// Error taxonomy
pub mod error;

pub use dom::{Document, NodeId};
pub use error::HarnessError;
pub use http::TestServer;
pub use internals::{Internals, NoopInternals};
pub use page::{timeout, ErrorHandlerToken, Page, Phase, TestCompletion};
