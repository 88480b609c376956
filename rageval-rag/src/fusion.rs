//! Reciprocal Rank Fusion.

use std::collections::HashMap;

use crate::document::{ScoredPoint, sort_by_score};

/// Rank offset used by the vector store's RRF implementation.
pub const DEFAULT_RRF_K: f32 = 2.0;

/// Fuse ranked lists with Reciprocal Rank Fusion.
///
/// Each point scores `Σ 1 / (k + rank)` over the lists it appears in, with
/// `rank` starting at 1. Lists are expected to be ordered best-first. The
/// output is sorted by fused score, ties by id, and truncated to `limit`, so
/// the result does not depend on the order of `lists`.
pub fn reciprocal_rank_fusion(
    lists: &[Vec<ScoredPoint>],
    k: f32,
    limit: usize,
) -> Vec<ScoredPoint> {
    let mut fused: HashMap<&str, ScoredPoint> = HashMap::new();

    for list in lists {
        for (rank, point) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (rank + 1) as f32);
            fused
                .entry(point.id.as_str())
                .and_modify(|p| p.score += contribution)
                .or_insert_with(|| ScoredPoint { score: contribution, ..point.clone() });
        }
    }

    let mut results: Vec<ScoredPoint> = fused.into_values().collect();
    sort_by_score(&mut results);
    results.truncate(limit);
    results
}
