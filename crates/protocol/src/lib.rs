//! Shared wire types for pagetest
//!
//! Defines the JSON structures exchanged between the harness-side HTTP
//! client and the local test server.

pub mod echo;

pub use echo::{CreateEchoResponse, EchoDefinition};
