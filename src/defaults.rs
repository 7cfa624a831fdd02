//! Default Configuration Values
//!
//! This module centralizes the library-level defaults: the lowest of the three
//! option layers, the sentinel statuses used for aborted and timed-out calls,
//! and the environment overrides applied on top of them.

use std::time::Duration;

/// Request defaults applied before instance and call options.
pub mod request {
    use super::*;

    /// Default per-call timeout.
    pub const TIMEOUT: Duration = Duration::from_millis(30_000);

    /// Default `Accept` header value.
    pub const ACCEPT: &str = crate::types::media_type::JSON;

    /// Content type assumed for a body whose caller did not set one.
    pub const CONTENT_TYPE: &str = crate::types::media_type::JSON;

    /// Default referrer.
    pub const REFERRER: &str = "about:client";

    /// Environment variable overriding [`TIMEOUT`], in milliseconds.
    /// `none`, `off` or `infinity` disable the timeout.
    pub const TIMEOUT_ENV: &str = "COURIER_REQUEST_TIMEOUT_MS";
}

/// Sentinel statuses for failures that never produced a response.
pub mod status {
    use crate::types::ResponseStatus;

    pub const ABORTED_CODE: u16 = 499;
    pub const ABORTED_TEXT: &str = "Aborted";
    pub const TIMED_OUT_CODE: u16 = 504;
    pub const TIMED_OUT_TEXT: &str = "Request Timeout";

    pub fn aborted() -> ResponseStatus {
        ResponseStatus::new(ABORTED_CODE, ABORTED_TEXT)
    }

    pub fn timed_out() -> ResponseStatus {
        ResponseStatus::new(TIMED_OUT_CODE, TIMED_OUT_TEXT)
    }
}

/// Tracing target used by every log line the crate emits.
pub const LOG_TARGET: &str = "courier::http";

/// Resolve the default timeout, honoring [`request::TIMEOUT_ENV`].
pub(crate) fn default_timeout() -> crate::types::Timeout {
    use crate::types::Timeout;

    match std::env::var(request::TIMEOUT_ENV) {
        Ok(val) => {
            let v = val.trim().to_lowercase();
            if v == "none" || v == "off" || v == "infinity" {
                return Timeout::Never;
            }
            match v.parse::<i64>() {
                Ok(ms) => Timeout::Millis(ms),
                Err(_) => {
                    tracing::warn!(
                        target: LOG_TARGET,
                        value = %val,
                        "ignoring unparseable {}", request::TIMEOUT_ENV
                    );
                    Timeout::from(request::TIMEOUT)
                }
            }
        }
        Err(_) => Timeout::from(request::TIMEOUT),
    }
}
