//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the instant type carried by entries and anchors.
//!
//! ## Security Invariant
//!
//! Timestamps must be UTC with a `Z` designator for deterministic
//! canonicalization. A local offset would give the same instant two canonical
//! encodings, so two honest parties would compute different signing payloads.
//!
//! Non-UTC inputs are **rejected at parse time**, including `+00:00`. There
//! is no silent conversion. Sub-second precision is kept as given and rendered
//! with the minimal number of fractional digits (0, 3, 6 or 9).

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LbxError;

/// A UTC-only instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to whole seconds.
    pub fn now() -> Self {
        let now = Utc::now();
        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Wrap an existing UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Parse an RFC 3339 string that ends in `Z`.
    ///
    /// # Errors
    ///
    /// Returns [`LbxError::InvalidTimestamp`] if the string is not RFC 3339 or
    /// carries any explicit offset.
    pub fn parse(s: &str) -> Result<Self, LbxError> {
        if !is_utc_designated(s) {
            return Err(LbxError::InvalidTimestamp {
                value: s.to_string(),
                reason: "timestamp must be UTC with a Z designator".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| LbxError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as RFC 3339 with a `Z` designator.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = LbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Whether a raw timestamp string carries the UTC `Z` designator.
pub fn is_utc_designated(s: &str) -> bool {
    s.trim_end().ends_with('Z')
}
