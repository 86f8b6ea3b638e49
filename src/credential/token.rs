//! Bearer tokens and their expiry bookkeeping.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// Tokens are refreshed this long before they expire.
pub(super) const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Bearer token issued for Resource Manager.
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken {
    secret: String,
    expires_on: Option<SystemTime>,
}

impl AccessToken {
    /// Wraps a raw token value.
    #[must_use]
    pub const fn new(secret: String, expires_on: Option<SystemTime>) -> Self {
        Self { secret, expires_on }
    }

    /// Raw token value for the `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Expiry reported by the issuer, when known.
    #[must_use]
    pub const fn expires_on(&self) -> Option<SystemTime> {
        self.expires_on
    }

    /// Whether the token remains usable past the refresh margin.
    #[must_use]
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        self.expires_on
            .is_some_and(|expiry| now + REFRESH_MARGIN < expiry)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// `expires_on` as sent by identity endpoints: IMDS and App Service use a
/// numeric string, newer Azure CLI builds a JSON number.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub(super) enum EpochSeconds {
    Number(u64),
    Text(String),
}

impl EpochSeconds {
    pub(super) fn to_system_time(&self) -> Option<SystemTime> {
        let seconds = match self {
            Self::Number(value) => *value,
            Self::Text(value) => value.trim().parse().ok()?,
        };
        UNIX_EPOCH.checked_add(Duration::from_secs(seconds))
    }
}
