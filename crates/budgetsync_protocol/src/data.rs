//! The synchronized budget dataset.

use crate::field::TrackedField;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One opaque record of a tracked collection.
///
/// Records are carried as arbitrary JSON; the sync engine only measures
/// and moves them.
pub type Record = Value;

/// The full dataset of one budget.
///
/// Missing collections deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetData {
    /// Ledger transactions.
    pub transactions: Vec<Record>,
    /// Envelope definitions.
    pub envelopes: Vec<Record>,
    /// Recurring bills.
    pub bills: Vec<Record>,
    /// Debts.
    pub debts: Vec<Record>,
    /// Savings goals.
    pub savings_goals: Vec<Record>,
    /// Paycheck history.
    pub paycheck_history: Vec<Record>,
}

impl BudgetData {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records of `field`.
    #[must_use]
    pub fn field(&self, field: TrackedField) -> &[Record] {
        match field {
            TrackedField::Transactions => &self.transactions,
            TrackedField::Envelopes => &self.envelopes,
            TrackedField::Bills => &self.bills,
            TrackedField::Debts => &self.debts,
            TrackedField::SavingsGoals => &self.savings_goals,
            TrackedField::PaycheckHistory => &self.paycheck_history,
        }
    }

    /// Returns the records of `field` mutably.
    pub fn field_mut(&mut self, field: TrackedField) -> &mut Vec<Record> {
        match field {
            TrackedField::Transactions => &mut self.transactions,
            TrackedField::Envelopes => &mut self.envelopes,
            TrackedField::Bills => &mut self.bills,
            TrackedField::Debts => &mut self.debts,
            TrackedField::SavingsGoals => &mut self.savings_goals,
            TrackedField::PaycheckHistory => &mut self.paycheck_history,
        }
    }

    /// Builder-style setter for one collection.
    #[must_use]
    pub fn with_field(mut self, field: TrackedField, records: Vec<Record>) -> Self {
        *self.field_mut(field) = records;
        self
    }

    /// Record count per field, keyed by stored field name.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<String, usize> {
        TrackedField::ALL
            .into_iter()
            .map(|field| (field.as_str().to_owned(), self.field(field).len()))
            .collect()
    }

    /// Total number of records across all fields.
    #[must_use]
    pub fn total_records(&self) -> usize {
        TrackedField::ALL
            .into_iter()
            .map(|field| self.field(field).len())
            .sum()
    }

    /// Returns true if every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_empty() {
        let data: BudgetData =
            serde_json::from_value(json!({"bills": [{"id": 1}]})).unwrap();
        assert_eq!(data.bills.len(), 1);
        assert!(data.transactions.is_empty());
        assert_eq!(data.total_records(), 1);
    }

    #[test]
    fn field_accessors_cover_all_fields() {
        let mut data = BudgetData::new();
        for (i, field) in TrackedField::ALL.into_iter().enumerate() {
            data.field_mut(field).extend((0..=i).map(|n| json!(n)));
        }
        for (i, field) in TrackedField::ALL.into_iter().enumerate() {
            assert_eq!(data.field(field).len(), i + 1);
        }
        assert_eq!(data.counts()["paycheckHistory"], 6);
    }

    #[test]
    fn serializes_camel_case() {
        let data = BudgetData::new().with_field(TrackedField::SavingsGoals, vec![json!({})]);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["savingsGoals"].as_array().unwrap().len(), 1);
        assert!(value.get("savings_goals").is_none());
    }
}
