//! Reciprocal-rank fusion of the two subtracks
//!
//! Pure: output depends only on the candidate lists, alpha, and top-k.

use std::collections::HashMap;

use crate::types::{
    MatchSource, MatchType, RRF_K, SearchResultItem, TextCandidate, VectorCandidate,
};

/// Per-key fusion state, keeping the first (best) rank seen per channel
struct Fused {
    item: SearchResultItem,
    text_rank: Option<usize>,
    vector_rank: Option<usize>,
}

fn key_of(chunk_id: Option<&uuid::Uuid>, resource_id: &uuid::Uuid, filepath: &str, line_start: i32) -> String {
    chunk_id.map_or_else(
        || format!("{resource_id}:{filepath}:{line_start}"),
        ToString::to_string,
    )
}

fn rrf(rank: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let r = rank as f64;
    1.0 / (RRF_K + r)
}

/// Fuse text and vector candidates into the final ranked list
///
/// Ranks are 1-based in the order each channel returned its candidates. A
/// key present in both channels keeps the smaller (better) vector rank and
/// reports `match_type = hybrid` with sources `[text, vector]`. Ties in the
/// final score preserve insertion order (text candidates first).
pub fn fuse(
    text: &[TextCandidate],
    vector: &[VectorCandidate],
    alpha: f64,
    top_k: usize,
) -> Vec<SearchResultItem> {
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Fused> = HashMap::new();

    for (i, candidate) in text.iter().enumerate() {
        let rank = i + 1;
        let key = key_of(
            None,
            &candidate.resource_id,
            &candidate.filepath,
            candidate.line_start,
        );
        map.entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Fused {
                    item: SearchResultItem {
                        chunk_id: None,
                        resource_id: candidate.resource_id,
                        resource_name: candidate.resource_name.clone(),
                        filepath: candidate.filepath.clone(),
                        line_start: candidate.line_start,
                        line_end: candidate.line_end,
                        text: candidate.text.clone(),
                        score: 0.0,
                        match_type: MatchType::Text,
                        match_sources: vec![MatchSource::Text],
                    },
                    text_rank: Some(rank),
                    vector_rank: None,
                }
            })
            .text_rank
            .get_or_insert(rank);
    }

    for (i, candidate) in vector.iter().enumerate() {
        let rank = i + 1;
        let key = key_of(
            Some(&candidate.chunk_id),
            &candidate.resource_id,
            &candidate.filepath,
            candidate.line_start,
        );
        // A vector hit can collide with a text window at the same location
        let collision_key = key_of(
            None,
            &candidate.resource_id,
            &candidate.filepath,
            candidate.line_start,
        );
        let slot_key = if map.contains_key(&key) {
            key
        } else if map.contains_key(&collision_key) {
            collision_key
        } else {
            order.push(key.clone());
            map.insert(
                key.clone(),
                Fused {
                    item: SearchResultItem {
                        chunk_id: Some(candidate.chunk_id),
                        resource_id: candidate.resource_id,
                        resource_name: candidate.resource_name.clone(),
                        filepath: candidate.filepath.clone(),
                        line_start: candidate.line_start,
                        line_end: candidate.line_end,
                        text: candidate.text.clone(),
                        score: 0.0,
                        match_type: MatchType::Vector,
                        match_sources: vec![MatchSource::Vector],
                    },
                    text_rank: None,
                    vector_rank: Some(rank),
                },
            );
            continue;
        };

        if let Some(fused) = map.get_mut(&slot_key) {
            // Ranks ascend through the loop, so the first write per key is
            // the smaller (better) vector rank
            fused.vector_rank.get_or_insert(rank);
            if fused.item.chunk_id.is_none() {
                fused.item.chunk_id = Some(candidate.chunk_id);
            }
        }
    }

    let mut results: Vec<SearchResultItem> = order
        .into_iter()
        .filter_map(|key| map.remove(&key))
        .map(|fused| {
            let text_score = fused.text_rank.map_or(0.0, rrf);
            let vector_score = fused.vector_rank.map_or(0.0, rrf);
            let mut item = fused.item;
            item.score = alpha * vector_score + (1.0 - alpha) * text_score;
            (item.match_type, item.match_sources) =
                match (fused.text_rank.is_some(), fused.vector_rank.is_some()) {
                    (true, true) => (
                        MatchType::Hybrid,
                        vec![MatchSource::Text, MatchSource::Vector],
                    ),
                    (true, false) => (MatchType::Text, vec![MatchSource::Text]),
                    (false, _) => (MatchType::Vector, vec![MatchSource::Vector]),
                };
            item
        })
        .collect();

    // Stable sort: equal scores keep insertion order
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);
    results
}
