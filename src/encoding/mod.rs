//! Body codecs
//!
//! Outgoing: [`request::encode_body`] turns a [`RequestBody`](crate::types::RequestBody)
//! into wire bytes according to the effective content type.
//!
//! Incoming: a [`DecoderRegistry`] maps the response content type to a
//! [`Decoder`].

pub mod html;
pub mod multipart;
pub mod request;
pub mod response;
pub mod xml;

pub use html::HtmlDocument;
pub use multipart::{MultipartForm, Part};
pub use request::{EncodedBody, carries_body, encode_body, needs_serialization};
pub use response::{Decoder, DecoderRegistry, MediaMatcher};
pub use xml::{XmlDocument, XmlElement, XmlNode};
