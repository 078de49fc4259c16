//! Inspect command implementation.

use super::{open_engine, open_store, KeySource, Target};
use budgetsync_protocol::{RootDocument, CHUNKS_COLLECTION};
use budgetsync_store::{CollectionPath, DocumentStore, FileDocumentStore};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Budget inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Budget id.
    pub budget_id: String,
    /// What the root document is: absent, tombstone, manifest or unrecognized.
    pub root: String,
    /// Cleartext generation stamp of the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
    /// Cleartext chunk count of the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// Whether the manifest carries a key check value.
    pub has_key_check: bool,
    /// Whether the given key matches the key check, if both are present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_matches: Option<bool>,
    /// Chunk documents stored for the budget.
    pub stored_chunks: usize,
    /// Records per field, if the data could be loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<BTreeMap<String, usize>>,
    /// Problems found while loading.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

/// Runs the inspect command.
pub fn run(
    target: &Target,
    key: Option<&KeySource>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(target, key)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Gathers the inspection result.
pub fn inspect(
    target: &Target,
    key: Option<&KeySource>,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let store = open_store(target)?;
    let root_path = CollectionPath::root(&target.root_collection)?.doc(&target.budget_id)?;
    let stored_chunks = count_chunks(&store, target)?;

    let mut result = InspectResult {
        budget_id: target.budget_id.clone(),
        root: "absent".into(),
        last_modified: None,
        chunk_count: None,
        has_key_check: false,
        key_matches: None,
        stored_chunks,
        records: None,
        problems: Vec::new(),
    };

    let Some(raw) = store.get(&root_path)? else {
        return Ok(result);
    };
    let manifest = match RootDocument::from_value(raw) {
        Ok(RootDocument::Tombstone(_)) => {
            result.root = "tombstone".into();
            return Ok(result);
        }
        Ok(RootDocument::Manifest(doc)) => doc,
        Err(e) => {
            result.root = "unrecognized".into();
            result.problems.push(e.to_string());
            return Ok(result);
        }
    };

    result.root = "manifest".into();
    result.last_modified = Some(manifest.last_modified);
    result.chunk_count = Some(manifest.chunk_count);
    result.has_key_check = manifest.key_check.is_some();

    let Some(source) = key else {
        return Ok(result);
    };
    let key = source.resolve()?;
    result.key_matches = manifest
        .key_check
        .as_deref()
        .map(|check| key.matches_key_check(check));

    let engine = open_engine(target, store, source)?;
    match engine.load_from_cloud() {
        Ok(loaded) => {
            if let Some(fault) = loaded.corruption {
                result.problems.push(format!("manifest: {fault}"));
            }
            for skipped in &loaded.report.skipped {
                result
                    .problems
                    .push(format!("chunk {}: {}", skipped.chunk_id, skipped.fault));
            }
            for stale in &loaded.report.stale {
                result.problems.push(format!("chunk {stale}: stale generation"));
            }
            result.records = loaded.data.map(|data| data.counts());
        }
        Err(e) => result.problems.push(e.to_string()),
    }

    Ok(result)
}

/// Counts chunk documents stamped with the target's budget id.
pub(crate) fn count_chunks(
    store: &Arc<FileDocumentStore>,
    target: &Target,
) -> Result<usize, Box<dyn std::error::Error>> {
    let chunks = CollectionPath::root(&target.root_collection)?
        .doc(&target.budget_id)?
        .collection(CHUNKS_COLLECTION)?;
    Ok(store
        .query_eq(&chunks, "budgetId", &Value::String(target.budget_id.clone()))?
        .len())
}

fn print_text_output(result: &InspectResult) {
    println!("Budget: {}", result.budget_id);
    println!("Root: {}", result.root);
    if let Some(generation) = result.last_modified {
        println!("Generation: {}", generation);
    }
    if let Some(count) = result.chunk_count {
        println!("Listed chunks: {}", count);
    }
    println!("Stored chunks: {}", result.stored_chunks);
    println!(
        "Key check: {}",
        match (result.has_key_check, result.key_matches) {
            (false, _) => "absent",
            (true, None) => "present",
            (true, Some(true)) => "matches",
            (true, Some(false)) => "DIFFERENT KEY",
        }
    );

    if let Some(records) = &result.records {
        println!();
        println!("Records:");
        for (field, count) in records {
            println!("  {:<16} {}", field, count);
        }
    }

    if !result.problems.is_empty() {
        println!();
        println!("Problems:");
        for problem in &result.problems {
            println!("  - {}", problem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{key, seed, target};

    #[test]
    fn inspect_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let result = inspect(&target(dir.path()), None).unwrap();
        assert_eq!(result.root, "absent");
        assert_eq!(result.stored_chunks, 0);
    }

    #[test]
    fn inspect_seeded_budget() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        seed(&target);

        let result = inspect(&target, Some(&key())).unwrap();
        assert_eq!(result.root, "manifest");
        assert!(result.has_key_check);
        assert_eq!(result.key_matches, Some(true));
        assert_eq!(result.chunk_count, Some(2));
        assert_eq!(result.stored_chunks, 2);
        assert!(result.problems.is_empty());
        let records = result.records.unwrap();
        assert_eq!(records["transactions"], 25);
        assert_eq!(records["bills"], 1);
    }

    #[test]
    fn inspect_with_other_key() {
        let dir = tempfile::tempdir().unwrap();
        let target = target(dir.path());
        seed(&target);

        let other = KeySource::Passphrase {
            passphrase: "nope".into(),
            salt: "salt".into(),
        };
        let result = inspect(&target, Some(&other)).unwrap();
        assert_eq!(result.key_matches, Some(false));
        assert!(result.records.is_none());
        assert_eq!(result.problems.len(), 1);
    }
}
