//! Concurrency limit for translation requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Effective `max_concurrent_requests` when a profile does not set one.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: u32 = 3;

/// Smallest value accepted by the concurrency setter.
pub const MIN_CONCURRENT_REQUESTS: u32 = 1;

/// Largest value accepted by the concurrency setter.
pub const MAX_CONCURRENT_REQUESTS: u32 = 10;

/// A validated number of in-flight translation requests, always within
/// `MIN_CONCURRENT_REQUESTS..=MAX_CONCURRENT_REQUESTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct ConcurrencyLimit(u32);

impl ConcurrencyLimit {
    /// Validate an integer.
    pub fn new(value: i64) -> Result<Self> {
        let range = i64::from(MIN_CONCURRENT_REQUESTS)..=i64::from(MAX_CONCURRENT_REQUESTS);
        if range.contains(&value) {
            Ok(Self(value as u32))
        } else {
            Err(invalid(value.to_string()))
        }
    }

    /// Parse user input with leading-integer semantics.
    ///
    /// Surrounding whitespace and a sign are accepted, then as many decimal
    /// digits as are present; anything after the digits is ignored. So
    /// `"7abc"` is 7 and `"3.9"` is 3, while `"abc"` and `""` are rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let value = parse_leading_int(input).ok_or_else(|| invalid(input))?;
        Self::new(value).map_err(|_| invalid(input))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for ConcurrencyLimit {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ConcurrencyLimit> for u32 {
    fn from(limit: ConcurrencyLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn invalid(value: impl Into<String>) -> Error {
    Error::InvalidConcurrency {
        value: value.into(),
        min: MIN_CONCURRENT_REQUESTS,
        max: MAX_CONCURRENT_REQUESTS,
    }
}

/// Read the integer prefix of `input`, or `None` when there are no digits.
///
/// Values beyond `i64` saturate, which keeps them out of any valid range.
fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut seen = false;
    let mut value: i64 = 0;
    for digit in digits {
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_range_bounds() {
        assert_eq!(ConcurrencyLimit::parse("1").unwrap().get(), 1);
        assert_eq!(ConcurrencyLimit::parse("10").unwrap().get(), 10);
        assert_eq!(ConcurrencyLimit::parse("5").unwrap().get(), 5);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        for input in ["0", "11", "-3", "99999999999999999999999"] {
            let err = ConcurrencyLimit::parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConcurrency { ref value, .. } if value == input),
                "unexpected error for {input}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(ConcurrencyLimit::parse("abc").is_err());
        assert!(ConcurrencyLimit::parse("").is_err());
        assert!(ConcurrencyLimit::parse("   ").is_err());
        assert!(ConcurrencyLimit::parse("-").is_err());
    }

    #[test]
    fn test_parse_uses_integer_prefix() {
        assert_eq!(ConcurrencyLimit::parse(" 7abc").unwrap().get(), 7);
        assert_eq!(ConcurrencyLimit::parse("3.9").unwrap().get(), 3);
        assert_eq!(ConcurrencyLimit::parse("+4").unwrap().get(), 4);
    }

    #[test]
    fn test_default_and_serde() {
        assert_eq!(ConcurrencyLimit::default().get(), DEFAULT_MAX_CONCURRENT_REQUESTS);

        let limit: ConcurrencyLimit = serde_json::from_str("6").unwrap();
        assert_eq!(limit.get(), 6);
        assert_eq!(serde_json::to_string(&limit).unwrap(), "6");
        assert!(serde_json::from_str::<ConcurrencyLimit>("12").is_err());
    }
}
