//! Values that may be written as an integer or a percentage string.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value that deserializes from either a bare integer or a string.
///
/// String values must be percentages (`"25%"`) and are resolved against a
/// total with [`scaled_value`](IntOrString::scaled_value). Used for fields
/// like an update strategy's `maxUnavailable`, where users may express a
/// budget either absolutely or relative to the desired size.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i32),
    String(String),
}

impl Default for IntOrString {
    fn default() -> Self {
        IntOrString::Int(0)
    }
}

impl From<i32> for IntOrString {
    fn from(value: i32) -> Self {
        IntOrString::Int(value)
    }
}

/// A string value that could not be resolved against a total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid value {0:?}: not a percentage")]
    NotAPercentage(String),
    #[error("invalid percentage value: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),
}

impl IntOrString {
    /// Resolve against `total`, interpreting string values as percentages.
    ///
    /// `round_up` picks the rounding direction for fractional results;
    /// budget-style fields round up so that small totals still get a non-zero
    /// allowance from percentage values.
    pub fn scaled_value(&self, total: i32, round_up: bool) -> Result<i32, ParseError> {
        match self {
            IntOrString::Int(value) => Ok(*value),
            IntOrString::String(value) => {
                let percent: i64 = value
                    .strip_suffix('%')
                    .ok_or_else(|| ParseError::NotAPercentage(value.clone()))?
                    .trim()
                    .parse()?;
                let scaled = percent * i64::from(total);
                let resolved = if round_up {
                    (scaled + 99) / 100
                } else {
                    scaled / 100
                };
                Ok(resolved as i32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IntOrString, ParseError};

    #[test]
    fn integers_resolve_to_themselves() {
        assert_eq!(IntOrString::Int(3).scaled_value(10, true), Ok(3));
        assert_eq!(IntOrString::Int(0).scaled_value(0, false), Ok(0));
    }

    #[test]
    fn percentages_scale_against_the_total() {
        let pct = IntOrString::String("20%".into());
        assert_eq!(pct.scaled_value(10, true), Ok(2));
        assert_eq!(pct.scaled_value(10, false), Ok(2));
    }

    #[test]
    fn rounding_direction_matters_for_fractions() {
        let pct = IntOrString::String("25%".into());
        assert_eq!(pct.scaled_value(10, true), Ok(3));
        assert_eq!(pct.scaled_value(10, false), Ok(2));
        // 1% of anything small still rounds up to one
        assert_eq!(IntOrString::String("1%".into()).scaled_value(10, true), Ok(1));
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!(
            IntOrString::String("20".into()).scaled_value(10, true),
            Err(ParseError::NotAPercentage("20".into()))
        );
        assert!(matches!(
            IntOrString::String("abc%".into()).scaled_value(10, true),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn deserializes_untagged() {
        assert_eq!(
            serde_json::from_str::<IntOrString>("2").unwrap(),
            IntOrString::Int(2)
        );
        assert_eq!(
            serde_json::from_str::<IntOrString>(r#""50%""#).unwrap(),
            IntOrString::String("50%".into())
        );
    }
}
