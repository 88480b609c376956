//! Maximal marginal relevance selection.

/// Cosine similarity, 0.0 when either vector is zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

/// Greedily pick up to `k` candidate indices balancing relevance and diversity.
///
/// Each step picks the candidate maximising
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, s) for s in selected)`.
/// The first pick is always the most query-similar candidate.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let relevance: Vec<f32> = candidates.iter().map(|c| cosine(query, c)).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k.min(candidates.len()) {
        let mut best: Option<(usize, f32)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let redundancy = selected
                .iter()
                .map(|&s| cosine(candidate, &candidates[s]))
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };
            let score = lambda * relevance[i] - (1.0 - lambda) * redundancy;
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        match best {
            Some((i, _)) => selected.push(i),
            None => break,
        }
    }

    selected
}
