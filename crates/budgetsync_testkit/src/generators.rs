//! Property-based test generators using proptest.
//!
//! Provides strategies for generating budget records and datasets of
//! realistic shape.

use budgetsync_protocol::{BudgetData, Record, TrackedField};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for a tracked field.
pub fn tracked_field_strategy() -> impl Strategy<Value = TrackedField> {
    prop::sample::select(TrackedField::ALL.to_vec())
}

/// Strategy for JSON scalars as found in budget records.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1_000_000i64..1_000_000).prop_map(|cents| json!(cents as f64 / 100.0)),
        "[a-zA-Z0-9 .,'-]{0,40}".prop_map(Value::String),
        Just(Value::Null),
    ]
}

/// Strategy for a flat record with an `id` and up to eight other fields.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        "[a-z]{3}-[0-9]{1,7}",
        prop::collection::btree_map("[a-z][a-zA-Z]{0,11}", scalar_strategy(), 0..8),
    )
        .prop_map(|(id, fields)| {
            let mut object: Map<String, Value> = fields.into_iter().collect();
            object.insert("id".into(), Value::String(id));
            Value::Object(object)
        })
}

/// Strategy for records whose size varies from a few bytes to `max_len`.
pub fn sized_record_strategy(max_len: usize) -> impl Strategy<Value = Record> {
    (0..=max_len, "[a-z]{4}").prop_map(|(len, id)| json!({"id": id, "note": "n".repeat(len)}))
}

/// Strategy for a list of records.
pub fn records_strategy(max_count: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 0..=max_count)
}

/// Strategy for a budget dataset with up to `max_per_field` records per field.
pub fn budget_data_strategy(max_per_field: usize) -> impl Strategy<Value = BudgetData> {
    prop::collection::vec(records_strategy(max_per_field), TrackedField::ALL.len()).prop_map(
        |mut columns| {
            let mut data = BudgetData::new();
            for field in TrackedField::ALL.iter().rev() {
                *data.field_mut(*field) = columns.pop().unwrap_or_default();
            }
            data
        },
    )
}

/// Strategy for budget ids.
pub fn budget_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,36}"
}
