//! Account lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Lifecycle status of an account's VPN access.
///
/// `Expired` is set only after the remote provisioning account has been
/// disabled; a new purchase moves the account back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Expired,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "expired" => Ok(AccountStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "account_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for AccountStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use AccountStatus::*;
        matches!(
            (self, target),
            (Active, Expired) | (Expired, Active) | (Active, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use AccountStatus::*;
        match self {
            Active => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}
