//! Execution layer
//!
//! The network exchange is behind [`HttpTransport`]; [`ReqwestTransport`] is
//! the default implementation.

pub mod reqwest_transport;
pub mod transport;

pub use reqwest_transport::ReqwestTransport;
pub use transport::{HttpTransport, TransportRequest, TransportResponse};
