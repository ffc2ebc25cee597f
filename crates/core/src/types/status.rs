//! Cart record lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an abandoned cart record.
///
/// Only `Pending` can move to another state, and only to one of the two
/// terminal states:
///
/// ```text
/// Pending ──checkout──▶ Recovered
///    │
///    └──expiry window──▶ Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Awaiting checkout or abandonment dispatch.
    #[default]
    Pending,
    /// The owning email completed a checkout (or an admin marked it).
    Recovered,
    /// Aged past the expiry window without recovery.
    Expired,
}

impl CartStatus {
    /// Stored representation, used in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Recovered => "recovered",
            Self::Expired => "expired",
        }
    }

    /// Whether moving from `self` to `next` is a valid lifecycle transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Recovered | Self::Expired)
        )
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "recovered" => Ok(Self::Recovered),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}
