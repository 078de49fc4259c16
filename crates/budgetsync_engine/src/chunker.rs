//! Size-bounded, order-preserving splitting of a field's items.
//!
//! Items are packed greedily: an item joins the open chunk while the
//! chunk's running size plus the envelope overhead stays within the
//! budget. A chunk that crosses the proactive split threshold gives its
//! last item to the next chunk, so closed multi-item chunks stay below
//! that threshold. An item never shares a chunk if it alone exceeds the
//! budget.

use crate::error::SyncResult;
use budgetsync_codec::estimate_size;
use budgetsync_protocol::{ChunkEnvelope, TrackedField};
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, warn};

/// Splits item slices into chunks that fit the effective budget.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    budget: usize,
    base_overhead: usize,
    warn_threshold: usize,
    split_threshold: usize,
}

impl Chunker {
    /// Creates a chunker for `budget` bytes per chunk, of which
    /// `base_overhead` is taken by the envelope around the items.
    ///
    /// Uses the default warning (80%) and split (90%) ratios.
    pub fn new(budget: usize, base_overhead: usize) -> Self {
        Self {
            budget,
            base_overhead,
            warn_threshold: scale(budget, 0.8),
            split_threshold: scale(budget, 0.9),
        }
    }

    /// Overrides the oversized-item warning and proactive split ratios.
    pub fn with_ratios(mut self, warn_ratio: f64, split_ratio: f64) -> Self {
        self.warn_threshold = scale(self.budget, warn_ratio);
        self.split_threshold = scale(self.budget, split_ratio);
        self
    }

    /// The byte budget per chunk.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Envelope overhead accounted for in every chunk.
    pub fn base_overhead(&self) -> usize {
        self.base_overhead
    }

    /// Computes chunk boundaries as index ranges over `items`.
    ///
    /// The ranges are contiguous, non-empty, and cover `items` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if an item cannot be serialized.
    pub fn plan<T: Serialize>(
        &self,
        items: &[T],
        field: TrackedField,
    ) -> SyncResult<Vec<Range<usize>>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        let mut running = 0;

        for (i, item) in items.iter().enumerate() {
            // One extra byte for the array separator.
            let size = estimate_size(item)? + 1;
            if size > self.warn_threshold {
                warn!(
                    %field,
                    index = i,
                    size,
                    budget = self.budget,
                    "item exceeds 80% of the chunk budget"
                );
            }

            if i > start && running + size + self.base_overhead > self.budget {
                ranges.push(start..i);
                start = i;
                running = size;
                continue;
            }
            running += size;

            if i > start && running + self.base_overhead > self.split_threshold {
                ranges.push(start..i);
                start = i;
                running = size;
            }
        }

        if start < items.len() {
            ranges.push(start..items.len());
        }

        debug!(
            %field,
            items = items.len(),
            chunks = ranges.len(),
            budget = self.budget,
            "planned chunks"
        );
        Ok(ranges)
    }

    /// Splits `items` into borrowed chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if an item cannot be serialized.
    pub fn chunk<'a, T: Serialize>(
        &self,
        items: &'a [T],
        field: TrackedField,
    ) -> SyncResult<Vec<&'a [T]>> {
        Ok(self
            .plan(items, field)?
            .into_iter()
            .map(|range| &items[range])
            .collect())
    }
}

/// Serialized size of an envelope around zero items, using the widest
/// possible numbers so the estimate is an upper bound.
pub(crate) fn envelope_overhead(field: TrackedField, budget_id: &str) -> SyncResult<usize> {
    let skeleton = ChunkEnvelope {
        chunk_type: field.as_str().to_owned(),
        chunk_index: u32::MAX,
        total_chunks: u32::MAX,
        data: Vec::new(),
        budget_id: budget_id.to_owned(),
        last_modified: u64::MAX,
    };
    Ok(estimate_size(&skeleton)?)
}

fn scale(budget: usize, ratio: f64) -> usize {
    (budget as f64 * ratio) as usize
}
