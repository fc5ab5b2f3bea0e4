//! Platform adapter implementations.

mod http;

pub use http::HttpConnectorAdapter;
