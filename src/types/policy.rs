//! Request policy catalogs (cache, credentials, mode, redirect, referrer).
//!
//! These are passed through to the transport; the wire names match the Fetch
//! standard so a config file can spell them the usual way.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! policy_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::HttpError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(crate::error::HttpError::InvalidArgument(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

policy_enum!(
    /// How the request interacts with an HTTP cache.
    CachePolicy {
        Default => "default",
        ForceCache => "force-cache",
        NoCache => "no-cache",
        NoStore => "no-store",
        OnlyIfCached => "only-if-cached",
        Reload => "reload",
    }
);

policy_enum!(
    /// Whether credentials accompany the request.
    CredentialsPolicy {
        Include => "include",
        Omit => "omit",
        SameOrigin => "same-origin",
    }
);

policy_enum!(
    RequestMode {
        Cors => "cors",
        Navigate => "navigate",
        NoCors => "no-cors",
        SameOrigin => "same-origin",
    }
);

policy_enum!(
    RedirectPolicy {
        Error => "error",
        Follow => "follow",
        Manual => "manual",
    }
);

policy_enum!(
    ReferrerPolicy {
        NoReferrer => "no-referrer",
        NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
        Origin => "origin",
        OriginWhenCrossOrigin => "origin-when-cross-origin",
        SameOrigin => "same-origin",
        StrictOrigin => "strict-origin",
        StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
        UnsafeUrl => "unsafe-url",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_serde() {
        let json = serde_json::to_string(&ReferrerPolicy::StrictOriginWhenCrossOrigin).unwrap();
        assert_eq!(json, "\"strict-origin-when-cross-origin\"");
        let parsed: CachePolicy = serde_json::from_str("\"no-store\"").unwrap();
        assert_eq!(parsed, CachePolicy::NoStore);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert_eq!("follow".parse::<RedirectPolicy>().unwrap(), RedirectPolicy::Follow);
        assert!("sideways".parse::<RedirectPolicy>().is_err());
    }
}
