//! The atomic write path.
//!
//! One save produces one generation: every chunk document, the deletes of
//! orphaned chunks, and finally the manifest are staged into a single
//! batch and committed once. Either the whole generation lands or none of
//! it does.

use crate::chunk_codec::encode_chunk;
use crate::chunker::{envelope_overhead, Chunker};
use crate::context::{now_millis, EngineContext};
use crate::error::{SyncError, SyncResult};
use crate::manifest::{build_manifest, encode_manifest};
use budgetsync_codec::estimate_size;
use budgetsync_protocol::{
    AuthorInfo, AuthorMeta, BudgetData, ChunkDocument, ChunkId, ChunkMap, ManifestMetadata,
    Record, RootDocument, TrackedField,
};
use budgetsync_store::WriteBatch;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::{debug, error, info, warn};

/// What a committed save wrote.
#[derive(Debug, Clone)]
pub(crate) struct WriteSummary {
    pub(crate) generation: u64,
    pub(crate) chunk_counts: BTreeMap<TrackedField, usize>,
    pub(crate) documents_written: usize,
    pub(crate) orphans_pruned: usize,
    pub(crate) bisections: u32,
}

/// Writes `data` as a new generation.
///
/// `previous_generation` is the last stamp this engine committed; the new
/// stamp is strictly greater than it and than the stamp found remotely.
pub(crate) fn write_generation(
    ctx: &EngineContext,
    data: &BudgetData,
    author: &AuthorMeta,
    previous_generation: u64,
) -> SyncResult<WriteSummary> {
    let now = now_millis();
    let floor = previous_generation.max(remote_stamp(ctx)?);
    let generation = now.max(floor.saturating_add(1));

    let mut batch = WriteBatch::new();
    let mut chunk_map = ChunkMap::new();
    let mut chunk_counts = BTreeMap::new();
    let mut bisections = 0;

    for field in TrackedField::ALL {
        let documents = encode_field(ctx, field, data.field(field), generation, &mut bisections)?;
        let mut ids = Vec::with_capacity(documents.len());
        for (id, doc) in documents {
            batch.set(ctx.chunk_path(&id)?, serde_json::to_value(&doc)?);
            ids.push(id);
        }
        chunk_counts.insert(field, ids.len());
        chunk_map.insert(field.as_str().to_owned(), ids);
    }
    let chunks_written = batch.len();

    // Chunks and the manifest must land together. Orphan deletes only get
    // whatever room is left and the rest wait for garbage collection.
    let max_ops = ctx.store.max_batch_ops();
    if chunks_written + 1 > max_ops {
        return Err(SyncError::GenerationTooLarge {
            operations: chunks_written + 1,
            limit: max_ops,
        });
    }

    let mut orphans_pruned = 0;
    if ctx.config.prune_orphans {
        let referenced: BTreeSet<&str> = chunk_map
            .values()
            .flatten()
            .map(ChunkId::as_str)
            .collect();
        let room = max_ops - chunks_written - 1;
        let mut deferred = 0;
        for (path, _) in ctx.query_chunks()? {
            if referenced.contains(path.id()) {
                continue;
            }
            if orphans_pruned == room {
                deferred += 1;
                continue;
            }
            debug!(budget_id = ctx.log_id(), chunk_id = path.id(), "pruning orphan chunk");
            batch.delete(path);
            orphans_pruned += 1;
        }
        if deferred > 0 {
            warn!(
                budget_id = ctx.log_id(),
                deferred,
                "batch full, leaving orphan chunks for garbage collection"
            );
        }
    }

    let metadata = ManifestMetadata {
        current_user: AuthorInfo::from_meta(author, now),
        stats: data.counts(),
        total_documents: 0,
        created_at: now,
    };
    let manifest = build_manifest(chunk_map, metadata, &ctx.budget_id, generation);
    let manifest_doc = serde_json::to_value(encode_manifest(ctx, &manifest)?)?;
    let manifest_size = estimate_size(&manifest_doc)?;
    if manifest_size > ctx.hard_limit {
        return Err(SyncError::OversizedChunk {
            chunk_id: "manifest".into(),
            size: manifest_size,
            limit: ctx.hard_limit,
        });
    }
    batch.set(ctx.root_path.clone(), manifest_doc);

    if let Err(e) = ctx.store.commit(batch) {
        error!(
            budget_id = ctx.log_id(),
            generation,
            error = %e,
            "generation commit failed, nothing was written"
        );
        return Err(e.into());
    }

    info!(
        budget_id = ctx.log_id(),
        generation,
        chunks = chunks_written,
        orphans_pruned,
        bisections,
        "committed generation"
    );

    Ok(WriteSummary {
        generation,
        chunk_counts,
        documents_written: chunks_written + 1,
        orphans_pruned,
        bisections,
    })
}

/// Chunks and encodes one field, halving any chunk whose encoded document
/// exceeds the hard limit. A split restarts the field so every document
/// carries the final chunk count.
fn encode_field(
    ctx: &EngineContext,
    field: TrackedField,
    items: &[Record],
    generation: u64,
    bisections: &mut u32,
) -> SyncResult<Vec<(ChunkId, ChunkDocument)>> {
    let chunker = Chunker::new(
        ctx.effective_budget(),
        envelope_overhead(field, &ctx.budget_id)?,
    )
    .with_ratios(ctx.config.oversize_warn_ratio, ctx.config.proactive_split_ratio);

    let mut plan: Vec<(Range<usize>, u32)> = chunker
        .plan(items, field)?
        .into_iter()
        .map(|range| (range, 0))
        .collect();

    loop {
        let total = u32::try_from(plan.len()).unwrap_or(u32::MAX);
        let mut documents = Vec::with_capacity(plan.len());
        let mut oversized = None;

        for (i, (range, _)) in plan.iter().enumerate() {
            let index = u32::try_from(i).unwrap_or(u32::MAX);
            let doc = encode_chunk(ctx, &items[range.clone()], field, index, total, generation)?;
            let size = estimate_size(&doc)?;
            if size > ctx.hard_limit {
                oversized = Some((i, size));
                break;
            }
            debug!(
                budget_id = ctx.log_id(),
                %field,
                chunk_index = index,
                items = range.len(),
                size,
                "encoded chunk"
            );
            documents.push((ChunkId::new(field, index), doc));
        }

        let Some((i, size)) = oversized else {
            return Ok(documents);
        };

        let (range, depth) = plan[i].clone();
        let chunk_id = ChunkId::new(field, u32::try_from(i).unwrap_or(u32::MAX));
        if range.len() == 1 {
            return Err(SyncError::OversizedItem {
                field,
                size,
                limit: ctx.hard_limit,
            });
        }
        if depth >= ctx.config.max_bisect_depth {
            return Err(SyncError::OversizedChunk {
                chunk_id: chunk_id.to_string(),
                size,
                limit: ctx.hard_limit,
            });
        }

        warn!(
            budget_id = ctx.log_id(),
            %chunk_id,
            size,
            limit = ctx.hard_limit,
            depth = depth + 1,
            "encoded chunk over the store limit, bisecting"
        );
        let mid = range.start + range.len() / 2;
        plan.splice(
            i..=i,
            [(range.start..mid, depth + 1), (mid..range.end, depth + 1)],
        );
        *bisections += 1;
    }
}

/// Cleartext generation stamp currently stored at the root, or 0.
fn remote_stamp(ctx: &EngineContext) -> SyncResult<u64> {
    let Some(value) = ctx.store.get(&ctx.root_path)? else {
        return Ok(0);
    };
    Ok(match RootDocument::from_value(value) {
        Ok(RootDocument::Manifest(doc)) => {
            if let Some(check) = &doc.key_check {
                if !ctx.payload.matches_key_check(check) {
                    warn!(
                        budget_id = ctx.log_id(),
                        "overwriting a manifest written with a different key"
                    );
                }
            }
            doc.last_modified
        }
        Ok(RootDocument::Tombstone(tombstone)) => tombstone.deleted_at,
        Err(_) => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use budgetsync_crypto::{AesGcmCipher, EncryptionKey};
    use budgetsync_store::{DocumentStore, InMemoryDocumentStore};
    use serde_json::json;
    use std::sync::Arc;

    fn context(store: Arc<InMemoryDocumentStore>, config: SyncConfig) -> EngineContext {
        EngineContext::new(
            "budget-w".into(),
            EncryptionKey::generate(),
            store,
            Arc::new(AesGcmCipher::new()),
            config,
        )
        .unwrap()
    }

    fn records(n: usize, len: usize) -> Vec<Record> {
        (0..n).map(|i| json!({"id": i, "memo": "m".repeat(len)})).collect()
    }

    #[test]
    fn writes_every_field_and_manifest_in_one_commit() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let ctx = context(store.clone(), SyncConfig::default());
        let data = BudgetData::new()
            .with_field(TrackedField::Transactions, records(10, 20))
            .with_field(TrackedField::Bills, records(2, 20));

        let summary = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap();
        assert_eq!(store.commit_count(), 1);
        assert_eq!(summary.chunk_counts[&TrackedField::Transactions], 1);
        assert_eq!(summary.chunk_counts[&TrackedField::Bills], 1);
        assert_eq!(summary.chunk_counts[&TrackedField::Debts], 0);
        assert_eq!(summary.documents_written, 3);
        assert_eq!(store.len(), 3);
        assert!(store.get(&ctx.root_path).unwrap().is_some());
    }

    #[test]
    fn generation_is_strictly_increasing() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let ctx = context(store, SyncConfig::default());
        let far_future = now_millis() + 1_000_000;
        let summary =
            write_generation(&ctx, &BudgetData::new(), &AuthorMeta::anonymous(), far_future)
                .unwrap();
        assert_eq!(summary.generation, far_future + 1);

        let again = write_generation(&ctx, &BudgetData::new(), &AuthorMeta::anonymous(), 0)
            .unwrap();
        assert_eq!(again.generation, far_future + 2);
    }

    #[test]
    fn bisects_chunks_that_encode_too_large() {
        // A generous overhead guess lets the chunker pack more than the
        // store accepts once encrypted and base64 encoded.
        let store = Arc::new(InMemoryDocumentStore::with_limits(8 * 1024, 500));
        let config = SyncConfig::new()
            .with_store_hard_limit(8 * 1024)
            .with_overhead_multiplier(1.0);
        let ctx = context(store.clone(), config);
        let data = BudgetData::new().with_field(TrackedField::Transactions, records(60, 100));

        let summary = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap();
        assert!(summary.bisections > 0);
        for path in store.paths() {
            let doc = store.get(&path).unwrap().unwrap();
            assert!(estimate_size(&doc).unwrap() <= 8 * 1024);
        }
    }

    #[test]
    fn single_huge_item_is_rejected() {
        let store = Arc::new(InMemoryDocumentStore::with_limits(4 * 1024, 500));
        let config = SyncConfig::new().with_store_hard_limit(4 * 1024);
        let ctx = context(store.clone(), config);
        let data = BudgetData::new().with_field(TrackedField::Bills, records(1, 10_000));

        let err = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap_err();
        assert!(matches!(
            err,
            SyncError::OversizedItem {
                field: TrackedField::Bills,
                limit: 4096,
                ..
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn exhausted_bisection_is_reported() {
        let store = Arc::new(InMemoryDocumentStore::with_limits(8 * 1024, 500));
        let config = SyncConfig::new()
            .with_store_hard_limit(8 * 1024)
            .with_overhead_multiplier(1.0)
            .with_max_bisect_depth(0);
        let ctx = context(store, config);
        let data = BudgetData::new().with_field(TrackedField::Transactions, records(60, 100));

        let err = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap_err();
        assert!(matches!(err, SyncError::OversizedChunk { .. }));
    }

    #[test]
    fn orphans_are_pruned_in_the_same_commit() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let config = SyncConfig::new().with_store_hard_limit(16 * 1024);
        let ctx = context(store.clone(), config);

        let big = BudgetData::new().with_field(TrackedField::Transactions, records(200, 60));
        let first = write_generation(&ctx, &big, &AuthorMeta::anonymous(), 0).unwrap();
        assert!(first.chunk_counts[&TrackedField::Transactions] > 2);

        let small = BudgetData::new().with_field(TrackedField::Transactions, records(5, 60));
        let second =
            write_generation(&ctx, &small, &AuthorMeta::anonymous(), first.generation).unwrap();

        assert_eq!(
            second.orphans_pruned,
            first.chunk_counts[&TrackedField::Transactions] - 1
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.commit_count(), 2);
    }

    #[test]
    fn generation_over_batch_limit_is_rejected() {
        let store = Arc::new(InMemoryDocumentStore::with_limits(1_048_576, 3));
        let config = SyncConfig::new().with_store_hard_limit(16 * 1024);
        let ctx = context(store.clone(), config);
        let data = BudgetData::new().with_field(TrackedField::Transactions, records(200, 60));

        let err = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap_err();
        assert!(matches!(
            err,
            SyncError::GenerationTooLarge { operations, limit: 3 } if operations > 3
        ));
        assert!(store.is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn orphans_beyond_batch_room_are_left_for_gc() {
        let store = Arc::new(InMemoryDocumentStore::with_limits(1_048_576, 4));
        let config = SyncConfig::new().with_store_hard_limit(16 * 1024);
        let ctx = context(store.clone(), config);
        for i in 0..5 {
            store.insert_raw(
                ctx.chunk_path(&ChunkId::new(TrackedField::Debts, i)).unwrap(),
                json!({"budgetId": "budget-w", "chunkType": "debts"}),
            );
        }

        // One chunk plus the manifest leaves room for two deletes.
        let data = BudgetData::new().with_field(TrackedField::Transactions, records(5, 20));
        let summary = write_generation(&ctx, &data, &AuthorMeta::anonymous(), 0).unwrap();
        assert_eq!(summary.orphans_pruned, 2);
        assert_eq!(store.len(), 2 + 3);

        assert_eq!(crate::recovery::collect_garbage(&ctx).unwrap(), 3);
        assert_eq!(store.len(), 2);
    }
}
