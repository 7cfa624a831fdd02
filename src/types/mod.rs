//! Core data types shared by the resolver, codecs and client.

pub mod body;
pub mod media_type;
pub mod params;
pub mod policy;
pub mod status;
pub mod timeout;

pub use body::{Blob, BodySource, ByteStream, RequestBody, ResponseBody};
pub use media_type::MediaType;
pub use params::ParameterMap;
pub use policy::{CachePolicy, CredentialsPolicy, RedirectPolicy, ReferrerPolicy, RequestMode};
pub use status::ResponseStatus;
pub use timeout::Timeout;

pub use reqwest::Method;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
