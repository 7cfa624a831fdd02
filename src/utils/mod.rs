//! Utility modules
//!
//! Address building and media-type guessing used by the client and codecs.

pub mod mime;
pub mod url;

pub use self::url::build_address;
