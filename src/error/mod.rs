//! Error Handling Module
//!
//! - `HttpError`: the failure taxonomy (invalid argument/address, encoding,
//!   decoding, transport, status, abort, timeout)
//! - `RequestError`: the normalized shape every call returns on failure
//! - conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use courier::error::{ErrorKind, HttpError, RequestError};
//!
//! let error = RequestError::new(None, HttpError::AbortError);
//! assert_eq!(error.kind(), ErrorKind::Abort);
//! assert_eq!(error.status_code(), Some(499));
//! ```

mod conversions;
pub mod types;

pub use types::*;
