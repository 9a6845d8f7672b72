// crates/bench-gate-core/src/core/time.rs
// ============================================================================
// Module: Bench Gate Time Model
// Description: Canonical timestamp representation for manifests and history.
// Purpose: Provide deterministic, host-supplied time values across records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Bench Gate core never reads wall-clock time directly; hosts supply explicit
//! timestamps (manifest start, finalize time, the anti-gaming "now"). This
//! keeps validation deterministic and lets tests inject arbitrary clocks.
//! Evidence timing fields arrive as RFC 3339 strings and are parsed here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::well_known::Iso8601;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the signed distance from `earlier` to `self` in milliseconds.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    /// Renders as RFC 3339 UTC, falling back to raw millis for out-of-range
    /// values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000_000)
            .ok()
            .and_then(|instant| instant.format(&Rfc3339).ok());
        match rendered {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ms", self.0),
        }
    }
}

// ============================================================================
// SECTION: RFC 3339 Parsing
// ============================================================================

/// Parses an ISO-8601 date-time string into a [`Timestamp`].
///
/// Accepts RFC 3339 values with an explicit offset, and naive date-times
/// (no offset), which are interpreted as UTC. Returns `None` when the string
/// does not parse; callers treat unparseable evidence timing as absent rather
/// than fatal.
#[must_use]
pub fn parse_iso8601_millis(value: &str) -> Option<Timestamp> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339).map_or_else(
        |_| {
            PrimitiveDateTime::parse(value, &Iso8601::DEFAULT)
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        },
        Some,
    )?;
    let millis = parsed.unix_timestamp_nanos() / 1_000_000;
    let millis = i64::try_from(millis).ok()?;
    Some(Timestamp::from_unix_millis(millis))
}
