//! The read path: resolve the manifest, fetch and decode listed chunks,
//! and rebuild the dataset.
//!
//! Chunk-level problems never fail a load. They are skipped and listed in
//! the [`LoadReport`].

use crate::chunk_codec::{decode_chunk, ChunkFault, DecodedChunk};
use crate::context::EngineContext;
use crate::error::SyncResult;
use crate::manifest::{decode_manifest, ManifestFault};
use crate::outcome::{LoadReport, SkippedChunk};
use budgetsync_protocol::{BudgetData, ChunkId, Manifest, RootDocument, TrackedField};
use budgetsync_store::Document;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// What the root path currently holds.
#[derive(Debug)]
pub(crate) enum RootState {
    /// Nothing was ever written.
    Absent,
    /// The root was reset.
    Tombstoned,
    /// A readable manifest.
    Live(Manifest),
    /// A manifest that could not be resolved, with the document as read.
    Faulty {
        fault: ManifestFault,
        document: Document,
    },
}

/// Reads and classifies the root document.
pub(crate) fn resolve_root(ctx: &EngineContext) -> SyncResult<RootState> {
    let Some(value) = ctx.store.get(&ctx.root_path)? else {
        return Ok(RootState::Absent);
    };
    let fault = match RootDocument::from_value(value.clone()) {
        Ok(RootDocument::Tombstone(_)) => return Ok(RootState::Tombstoned),
        Ok(RootDocument::Manifest(doc)) => match decode_manifest(ctx, &doc) {
            Ok(manifest) => return Ok(RootState::Live(manifest)),
            Err(fault) => fault,
        },
        Err(e) => ManifestFault::Malformed(e.to_string()),
    };
    Ok(RootState::Faulty {
        fault,
        document: value,
    })
}

/// Result of reading a root.
#[derive(Debug)]
pub(crate) enum LoadStep {
    /// No data remotely.
    Empty,
    /// Data was reconstructed.
    Loaded {
        data: BudgetData,
        last_modified: u64,
        report: LoadReport,
    },
    /// The manifest could not be resolved. `document` is the root exactly
    /// as it was judged.
    Unreadable {
        fault: ManifestFault,
        document: Document,
    },
}

pub(crate) fn load(ctx: &EngineContext) -> SyncResult<LoadStep> {
    match resolve_root(ctx)? {
        RootState::Absent => {
            debug!(budget_id = ctx.log_id(), "no remote manifest");
            Ok(LoadStep::Empty)
        }
        RootState::Tombstoned => {
            debug!(budget_id = ctx.log_id(), "remote root is tombstoned");
            Ok(LoadStep::Empty)
        }
        RootState::Faulty { fault, document } => Ok(LoadStep::Unreadable { fault, document }),
        RootState::Live(manifest) => {
            let (data, report) = reconstruct(ctx, &manifest)?;
            info!(
                budget_id = ctx.log_id(),
                generation = manifest.last_modified,
                records = data.total_records(),
                chunks = report.chunks_loaded,
                skipped = report.skipped.len(),
                "loaded generation"
            );
            Ok(LoadStep::Loaded {
                data,
                last_modified: manifest.last_modified,
                report,
            })
        }
    }
}

fn reconstruct(ctx: &EngineContext, manifest: &Manifest) -> SyncResult<(BudgetData, LoadReport)> {
    let mut data = BudgetData::new();
    let mut report = LoadReport::default();
    let mut seen = BTreeSet::new();

    for field in TrackedField::ALL {
        let mut decoded: Vec<(ChunkId, DecodedChunk)> = Vec::new();

        for id in manifest.chunks_for(field) {
            let fetched = if seen.insert(id.clone()) {
                fetch_chunk(ctx, id, field)?
            } else {
                Err(ChunkFault::Mismatched("listed more than once".into()))
            };
            match fetched {
                Ok(chunk) => decoded.push((id.clone(), chunk)),
                Err(fault) => {
                    warn!(
                        budget_id = ctx.log_id(),
                        %field,
                        chunk_id = %id,
                        %fault,
                        "skipping chunk"
                    );
                    report.skipped.push(SkippedChunk {
                        field,
                        chunk_id: id.clone(),
                        fault,
                    });
                }
            }
        }

        decoded.sort_by_key(|(_, chunk)| chunk.index);
        let records = data.field_mut(field);
        for (id, chunk) in decoded {
            if chunk.last_modified != manifest.last_modified {
                warn!(
                    budget_id = ctx.log_id(),
                    chunk_id = %id,
                    chunk_generation = chunk.last_modified,
                    manifest_generation = manifest.last_modified,
                    "chunk is from another generation"
                );
                report.stale.push(id);
            }
            records.extend(chunk.items);
            report.chunks_loaded += 1;
        }

        let expected = manifest.metadata.stats.get(field.as_str()).copied();
        if expected.is_some_and(|n| records.len() < n) {
            report.short_fields.push(field);
        }
    }

    Ok((data, report))
}

/// Fetches one listed chunk. Store errors propagate, everything else is a
/// fault to skip.
fn fetch_chunk(
    ctx: &EngineContext,
    id: &ChunkId,
    field: TrackedField,
) -> SyncResult<Result<DecodedChunk, ChunkFault>> {
    let Ok(path) = ctx.chunk_path(id) else {
        return Ok(Err(ChunkFault::Malformed(format!("invalid chunk id {id:?}"))));
    };
    Ok(match ctx.store.get(&path)? {
        None => Err(ChunkFault::Missing),
        Some(document) => decode_chunk(ctx, document, field).and_then(|chunk| match id.parse() {
            Some((listed, index)) if listed == field && index == chunk.index => Ok(chunk),
            _ => Err(ChunkFault::Mismatched(format!(
                "listed as {id} but holds {field} chunk {}",
                chunk.index
            ))),
        }),
    })
}
