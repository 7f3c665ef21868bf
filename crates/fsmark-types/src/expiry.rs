use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Wall-clock nanoseconds since the UNIX epoch, UTC.
///
/// Saturates at `u64::MAX` (year 2554) and reads as `0` for clocks set
/// before the epoch.
pub fn now_nanos() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

/// The absolute instant after which a marker is gone.
///
/// Persisted as decimal ASCII nanoseconds since the UNIX epoch. The value
/// `0` is reserved as the sentinel for [`Expiry::Never`]; no real marker can
/// expire at the epoch itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expiry {
    /// The marker never expires.
    Never,
    /// The marker expires once the clock passes this many nanoseconds.
    At(u64),
}

impl Expiry {
    /// Expiry `ttl` from now. A zero TTL means the marker never expires.
    pub fn after(ttl: Duration) -> Self {
        Self::after_from(now_nanos(), ttl)
    }

    /// Expiry `ttl` after the given instant.
    pub fn after_from(now: u64, ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::Never;
        }
        // A non-zero TTL is at least 1ns, so the sum never hits the sentinel.
        let ttl = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        Self::At(now.saturating_add(ttl))
    }

    /// Returns `true` if the expiry lies strictly before `now`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self {
            Self::Never => false,
            Self::At(at) => *at < now,
        }
    }

    /// Returns `true` if the expiry lies strictly before the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_nanos())
    }

    /// Remaining lifetime relative to `now`, or `None` for [`Expiry::Never`].
    pub fn remaining_at(&self, now: u64) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(Duration::from_nanos(at.saturating_sub(now))),
        }
    }

    /// The persisted form of this expiry.
    pub fn encode(&self) -> String {
        match self {
            Self::Never => "0".to_string(),
            Self::At(at) => at.to_string(),
        }
    }

    /// Parse the persisted form. Surrounding ASCII whitespace is tolerated;
    /// anything else that is not a non-negative decimal integer is corrupt.
    pub fn decode(raw: &[u8]) -> Result<Self, TypeError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| TypeError::InvalidExpiry(String::from_utf8_lossy(raw).into_owned()))?;
        let trimmed = text.trim_ascii();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidExpiry(text.to_string()));
        }
        let at: u64 = trimmed
            .parse()
            .map_err(|_| TypeError::InvalidExpiry(text.to_string()))?;
        Ok(match at {
            0 => Self::Never,
            at => Self::At(at),
        })
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::At(at) => write!(f, "{at}ns"),
        }
    }
}
