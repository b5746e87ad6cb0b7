use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Opaque identifier of a browser session, carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-user token record.
///
/// When `public_token` is set, `refresh_token` and `expires_at` are set as
/// well and come from the same refresh response.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, with = "time::serde::timestamp::option", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<OffsetDateTime>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("internal_token", &self.internal_token.as_ref().map(|_| "<redacted>"))
            .field("public_token", &self.public_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where a session stands in the sign-in lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Valid,
    Expired,
}

impl Session {
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        self.public_token.is_some()
    }

    /// A session without an expiry is treated as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_none_or(|expires_at| now > expires_at)
    }

    #[must_use]
    pub fn state_at(&self, now: OffsetDateTime) -> TokenState {
        if !self.is_authorized() {
            TokenState::Unauthenticated
        } else if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Valid
        }
    }

    /// Whole seconds until expiry, rounded to nearest. Negative once expired.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn expires_in_at(&self, now: OffsetDateTime) -> i64 {
        self.expires_at.map_or(0, |expires_at| (expires_at - now).as_seconds_f64().round() as i64)
    }

    /// Absolute expiry for a lifetime reported by the authorization service.
    ///
    /// `None` for a non-positive lifetime or one past the representable range.
    #[must_use]
    pub fn expiry_after(now: OffsetDateTime, expires_in_secs: i64) -> Option<OffsetDateTime> {
        if expires_in_secs <= 0 {
            return None;
        }
        now.checked_add(Duration::seconds(expires_in_secs))
    }

    /// Replaces all four token fields from one exchange or refresh cycle.
    pub(crate) fn store_tokens(
        &mut self,
        internal_token: String,
        public_token: String,
        refresh_token: String,
        expires_at: OffsetDateTime,
    ) {
        self.internal_token = Some(internal_token);
        self.public_token = Some(public_token);
        self.refresh_token = Some(refresh_token);
        self.expires_at = Some(expires_at);
    }
}

/// Token handed to callers together with its remaining lifetime.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken").field("access_token", &"<redacted>").field("expires_in", &self.expires_in).finish()
    }
}
