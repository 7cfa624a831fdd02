//! Per-call timeout setting.

use crate::error::HttpError;
use std::time::Duration;

/// Timeout as supplied by a caller.
///
/// Kept signed so that a negative value can be rejected with
/// [`HttpError::InvalidArgument`] instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// No timer is armed.
    Never,
    /// Fire after this many milliseconds.
    Millis(i64),
}

impl Timeout {
    /// Validate and convert; `Ok(None)` means "no timeout".
    pub fn duration(self) -> Result<Option<Duration>, HttpError> {
        match self {
            Self::Never => Ok(None),
            Self::Millis(ms) if ms < 0 => Err(HttpError::InvalidArgument(format!(
                "The timeout cannot be negative (got {ms} ms)"
            ))),
            Self::Millis(ms) => Ok(Some(Duration::from_millis(ms as u64))),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Millis(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        d.map(Self::from).unwrap_or(Self::Never)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_is_rejected() {
        assert!(matches!(
            Timeout::Millis(-1).duration(),
            Err(HttpError::InvalidArgument(_))
        ));
        assert_eq!(Timeout::Never.duration().unwrap(), None);
        assert_eq!(
            Timeout::Millis(0).duration().unwrap(),
            Some(Duration::ZERO)
        );
    }
}
