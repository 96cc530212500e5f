//! Retention literals for `InfluxDB` retention policies.
//!
//! Retention durations are kept as the literal the user wrote (`2d`, `1h30m`,
//! `INF`) and only checked for well-formedness before they are embedded in a
//! statement.

use std::fmt;
use thiserror::Error;

/// Error returned for a malformed retention literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid retention duration {literal:?}: {reason}")]
pub struct InvalidRetention {
    /// The rejected literal.
    pub literal: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Units accepted by `InfluxQL` duration literals. Longest first so `ms`
/// wins over `m`.
const UNITS: [&str; 9] = ["ns", "ms", "u", "µ", "s", "m", "h", "d", "w"];

/// A validated retention duration literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDuration(String);

impl RetentionDuration {
    /// Parses a retention literal.
    ///
    /// Accepts `INF` (any case) or one or more `<integer><unit>` groups.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::RetentionDuration;
    ///
    /// assert!(RetentionDuration::parse("2d").is_ok());
    /// assert!(RetentionDuration::parse("1h30m").is_ok());
    /// assert!(RetentionDuration::parse("INF").unwrap().is_infinite());
    /// assert!(RetentionDuration::parse("2 days").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the literal is empty, lacks a unit, uses an
    /// unknown unit, or contains anything besides digits and units.
    pub fn parse(literal: &str) -> Result<Self, InvalidRetention> {
        let invalid = |reason| InvalidRetention {
            literal: literal.to_string(),
            reason,
        };

        if literal.is_empty() {
            return Err(invalid("duration is empty"));
        }
        if literal.eq_ignore_ascii_case("inf") {
            return Ok(Self(literal.to_string()));
        }

        let mut rest = literal;
        while !rest.is_empty() {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return Err(invalid("expected a number"));
            }
            rest = &rest[digits..];

            let unit = UNITS
                .iter()
                .find(|unit| rest.starts_with(*unit))
                .ok_or_else(|| invalid("expected a unit (ns, u, ms, s, m, h, d, w)"))?;
            rest = &rest[unit.len()..];
        }

        Ok(Self(literal.to_string()))
    }

    /// Returns true for the `INF` literal, which keeps data forever.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.0.eq_ignore_ascii_case("inf")
    }

    /// Returns the literal as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RetentionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
