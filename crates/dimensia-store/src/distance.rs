//! Similarity scoring for brute-force search.
//!
//! Every metric yields a score where **higher is better**:
//! - cosine: cosine similarity in \[-1, 1\], 0 when either vector has zero norm
//! - dot: raw inner product
//! - L2: `1 / (1 + euclidean distance)` in (0, 1\]

use dimensia_core::DistanceMetric;

/// Score `b` against query `a` under `metric`. Slices must have equal length.
pub fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Dot => dot_product(a, b),
        DistanceMetric::L2 => 1.0 / (1.0 + euclidean_distance(a, b)),
    }
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
