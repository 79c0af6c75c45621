use std::cmp::Ordering;

use num::Float;

/// Cosine similarity of two dense vectors
/// cos(θ) = Σ(a_i * b_i) / (||a|| * ||b||)
/// Returns 0.0 when either vector has zero norm
#[inline]
pub fn cosine_similarity<N>(a: &[N], b: &[N]) -> f64
where
    N: Float + Into<f64>,
{
    let mut dot = 0_f64;
    let mut norm_a = 0_f64;
    let mut norm_b = 0_f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y): (f64, f64) = (x.into(), y.into());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Scale in place so the entries sum to 1
/// Vectors summing to zero are left untouched
#[inline]
pub fn normalize_l1<N: Float>(vec: &mut [N]) {
    let sum = vec.iter().fold(N::zero(), |acc, &v| acc + v.abs());
    if sum > N::zero() {
        vec.iter_mut().for_each(|v| *v = *v / sum);
    }
}

/// Scale in place to unit euclidean length
#[inline]
pub fn normalize_l2<N: Float>(vec: &mut [N]) {
    let norm = vec.iter().fold(N::zero(), |acc, &v| acc + v * v).sqrt();
    if norm > N::zero() {
        vec.iter_mut().for_each(|v| *v = *v / norm);
    }
}

/// Indices of the `k` largest positive weights, largest first
/// Ties keep ascending index order
pub fn top_k_indices<N>(weights: &[N], k: usize) -> Vec<usize>
where
    N: Float,
{
    let mut idx: Vec<usize> = (0..weights.len())
        .filter(|&i| weights[i] > N::zero())
        .collect();
    idx.sort_by(|&a, &b| {
        weights[b]
            .partial_cmp(&weights[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    idx.truncate(k);
    idx
}

/// Keep only the given indices, zero everything else
pub fn masked<N: Float>(weights: &[N], keep: &[usize]) -> Vec<N> {
    let mut out = vec![N::zero(); weights.len()];
    for &i in keep {
        out[i] = weights[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal() {
        assert!((cosine_similarity(&[1.0_f64, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0_f64, 0.0], &[0.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0_f64, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn normalizers_leave_zero_vectors_alone() {
        let mut v = [0.0_f64; 3];
        normalize_l1(&mut v);
        normalize_l2(&mut v);
        assert_eq!(v, [0.0; 3]);

        let mut v = [1.0_f64, 3.0];
        normalize_l1(&mut v);
        assert_eq!(v, [0.25, 0.75]);

        let mut v = [3.0_f32, 4.0];
        normalize_l2(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn top_k_orders_by_weight_then_index() {
        let w = [0.1_f64, 0.5, 0.0, 0.5, 0.3];
        assert_eq!(top_k_indices(&w, 3), vec![1, 3, 4]);
        // zero weights never count as associated terms
        assert_eq!(top_k_indices(&w, 10), vec![1, 3, 4, 0]);
        assert!(top_k_indices(&w, 0).is_empty());
    }

    #[test]
    fn masked_keeps_selected_entries() {
        assert_eq!(masked(&[1.0_f64, 2.0, 3.0], &[2, 0]), vec![1.0, 0.0, 3.0]);
    }
}
