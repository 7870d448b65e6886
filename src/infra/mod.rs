//! Infrastructure adapters for the upstream campus API.

pub mod http;

pub use http::HttpUpstream;
