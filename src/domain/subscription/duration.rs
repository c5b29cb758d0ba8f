//! Purchased access length.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Access length in whole days. Serialized as `"<days>d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionDuration(u32);

impl SubscriptionDuration {
    pub const DEFAULT_DAYS: u32 = 30;

    pub fn days(days: u32) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::invalid_format(
                "duration",
                "must be at least one day",
            ));
        }
        Ok(Self(days))
    }

    pub fn as_days(&self) -> u32 {
        self.0
    }

    pub fn as_chrono(&self) -> Duration {
        Duration::days(i64::from(self.0))
    }
}

impl Default for SubscriptionDuration {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

impl fmt::Display for SubscriptionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.0)
    }
}

impl FromStr for SubscriptionDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s
            .trim()
            .strip_suffix('d')
            .ok_or_else(|| ValidationError::invalid_format("duration", "expected '<days>d'"))?
            .parse::<u32>()
            .map_err(|e| ValidationError::invalid_format("duration", e.to_string()))?;
        Self::days(days)
    }
}

impl TryFrom<String> for SubscriptionDuration {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubscriptionDuration> for String {
    fn from(value: SubscriptionDuration) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_suffix() {
        assert_eq!("30d".parse::<SubscriptionDuration>().unwrap().as_days(), 30);
        assert_eq!(" 90d ".parse::<SubscriptionDuration>().unwrap().as_days(), 90);
    }

    #[test]
    fn rejects_other_forms() {
        for bad in ["30", "30h", "d", "0d", "-5d", ""] {
            assert!(bad.parse::<SubscriptionDuration>().is_err(), "{bad}");
        }
    }

    #[test]
    fn default_is_thirty_days() {
        assert_eq!(SubscriptionDuration::default().to_string(), "30d");
        assert_eq!(SubscriptionDuration::default().as_chrono(), Duration::days(30));
    }
}
