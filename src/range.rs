//! Validated `"min,max"` ranges for catalog constraints.
//!
//! Parsing is pure: malformed or inverted input comes back as a
//! [`RangeError`] and the caller decides whether to re-prompt or abort.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Why a range string was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    /// The text is not two comma-separated numbers.
    #[error("expected 'min,max' with two numbers, got '{0}'")]
    Format(String),
    /// Both numbers parsed but `min >= max`.
    #[error("minimum {min} must be smaller than maximum {max}")]
    Order { min: f64, max: f64 },
}

/// Closed numeric interval with `min < max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    min: f64,
    max: f64,
}

impl ValueRange {
    /// Build a range, rejecting `min >= max` and non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, RangeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(RangeError::Format(format!("{min},{max}")));
        }
        if min >= max {
            return Err(RangeError::Order { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Parse a `"min,max"` pair such as `"0,10"` or `" -10.5 , 10 "`.
///
/// # Errors
/// * [`RangeError::Format`] when there are not exactly two numeric parts
/// * [`RangeError::Order`] when `min >= max`
pub fn parse_range(s: &str) -> Result<ValueRange, RangeError> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [lo, hi] = parts.as_slice() else {
        return Err(RangeError::Format(s.trim().to_string()));
    };

    let parse = |tok: &str| {
        tok.parse::<f64>()
            .map_err(|_| RangeError::Format(s.trim().to_string()))
    };
    let (min, max) = (parse(lo)?, parse(hi)?);
    ValueRange::new(min, max)
}

impl FromStr for ValueRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_range(s)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_padded_pairs() {
        let r = parse_range("0,10").unwrap();
        assert_eq!((r.min(), r.max()), (0.0, 10.0));

        let r = parse_range("  -10.5 ,  10 ").unwrap();
        assert_eq!((r.min(), r.max()), (-10.5, 10.0));

        let r: ValueRange = "0,0.1".parse().unwrap();
        assert_eq!(r.max(), 0.1);
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "10", "1,2,3", "a,b", "1;2", "1,", ",2", "nan,1", "1,inf"] {
            assert!(
                matches!(parse_range(bad), Err(RangeError::Format(_))),
                "'{bad}' should be a format error"
            );
        }
    }

    #[test]
    fn rejects_inverted_or_empty_interval() {
        assert_eq!(
            parse_range("10,0"),
            Err(RangeError::Order { min: 10.0, max: 0.0 })
        );
        assert!(matches!(parse_range("5,5"), Err(RangeError::Order { .. })));
    }

    #[test]
    fn display_round_trips() {
        let r = parse_range("-10,10").unwrap();
        assert_eq!(r.to_string(), "-10,10");
        assert_eq!(parse_range(&r.to_string()).unwrap(), r);
        assert!(r.contains(0.0));
        assert!(!r.contains(10.5));
    }
}
