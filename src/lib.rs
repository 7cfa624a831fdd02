//! # Courier - an HTTP client convenience layer
//!
//! Courier wraps an HTTP transport with the chores most callers repeat on
//! every request.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Layered options**: library defaults, per-client options and per-call
//!   options merge into one effective configuration; headers and query
//!   parameters merge key by key.
//! - **Cancellation**: every call gets its own token combining an optional
//!   caller token with a timeout, and `abort_all` stops everything in flight.
//! - **Content negotiation**: request bodies are encoded from the
//!   `Content-Type` (JSON, form, multipart) and responses are decoded by a
//!   priority-ordered decoder table.
//! - **Lifecycle events**: `Configured`, `Success`, `Error`, `Aborted`,
//!   `Timeout`, `Complete` and `AllComplete`, per client and process wide.
//! - **One error shape**: every failure becomes a [`RequestError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::builder("https://api.example.com/v1/")
//!         .options(RequestOptions::new().timeout_ms(5_000))
//!         .build()?;
//!
//!     client.register(EventKind::Error, |event| {
//!         if let RequestEvent::Error { error, .. } = event {
//!             eprintln!("request failed: {error}");
//!         }
//!     });
//!
//!     let users = client
//!         .get("/users", RequestOptions::new().query("role", "admin"))
//!         .await?;
//!     println!("{users:?}");
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod defaults;
pub mod encoding;
pub mod error;
pub mod events;
pub mod execution;
pub mod hub;
pub mod types;
pub mod utils;

pub use cancel::{AbortReason, CancellationToken, new_cancel_token};
pub use client::{HttpClient, HttpClientBuilder, Response};
pub use config::{RequestConfig, RequestOptions};
pub use error::{ErrorKind, HttpError, RequestError};
pub use events::{EventBus, EventKind, RequestEvent, SubscriptionHandle};
pub use hub::Hub;

/// Commonly used types.
pub mod prelude {
    pub use crate::cancel::{AbortReason, CancellationToken, new_cancel_token};
    pub use crate::client::{HttpClient, HttpClientBuilder, Response};
    pub use crate::config::{RequestConfig, RequestOptions};
    pub use crate::encoding::{
        Decoder, DecoderRegistry, HtmlDocument, MediaMatcher, MultipartForm, XmlDocument,
    };
    pub use crate::error::{ErrorKind, HttpError, RequestError};
    pub use crate::events::{EventKind, RequestEvent, SubscriptionHandle};
    pub use crate::execution::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};
    pub use crate::hub::Hub;
    pub use crate::types::{
        Blob, BodySource, ByteStream, CachePolicy, CredentialsPolicy, HeaderMap, HeaderName,
        HeaderValue, MediaType, Method, ParameterMap, RedirectPolicy, ReferrerPolicy,
        RequestBody, RequestMode, ResponseBody, ResponseStatus, Timeout, media_type,
    };
}
