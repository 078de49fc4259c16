//! The fixed set of synchronized collections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A top-level budget collection that is chunked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    /// Ledger transactions. Usually by far the largest collection.
    Transactions,
    /// Envelope (category) definitions.
    Envelopes,
    /// Recurring bills.
    Bills,
    /// Debts.
    Debts,
    /// Savings goals.
    SavingsGoals,
    /// Paycheck history.
    PaycheckHistory,
}

/// Error for a field name that is not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tracked field: {0:?}")]
pub struct UnknownField(pub String);

impl TrackedField {
    /// Every tracked field, in write order.
    pub const ALL: [TrackedField; 6] = [
        TrackedField::Transactions,
        TrackedField::Envelopes,
        TrackedField::Bills,
        TrackedField::Debts,
        TrackedField::SavingsGoals,
        TrackedField::PaycheckHistory,
    ];

    /// Returns the stored name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TrackedField::Transactions => "transactions",
            TrackedField::Envelopes => "envelopes",
            TrackedField::Bills => "bills",
            TrackedField::Debts => "debts",
            TrackedField::SavingsGoals => "savingsGoals",
            TrackedField::PaycheckHistory => "paycheckHistory",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}
