//! Allocation helpers (probability vectors).
//!
//! Deterministic utilities for turning non-negative weights into a probability
//! distribution in a stable (reproducible) way.

/// Normalize `weights` into a distribution aligned with the input.
///
/// - Non-finite and negative weights count as 0.
/// - If nothing positive remains, the result is uniform.
/// - Empty input gives an empty output.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let denom: f64 = weights.iter().copied().map(clean).sum();
    if denom <= 0.0 || !denom.is_finite() {
        // Degenerate fallback: uniform.
        let n = weights.len() as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.iter().map(|&w| clean(w) / denom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalize_sums_to_one() {
        let p = normalize(&[0.2, 0.6, 0.2, 1.0]);
        let s: f64 = p.iter().sum();
        assert!((s - 1.0).abs() < 1e-12, "sum={}", s);
        assert!((p[3] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_input_is_uniform() {
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.5, 0.5]);
        assert_eq!(normalize(&[f64::NAN, -1.0, 0.0, f64::NEG_INFINITY]), vec![0.25; 4]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn bad_entries_are_zeroed() {
        let p = normalize(&[f64::NAN, 1.0, f64::INFINITY, 3.0]);
        assert_eq!(p, vec![0.0, 0.25, 0.0, 0.75]);
    }

    proptest! {
        #[test]
        fn normalize_is_a_distribution(
            // Keep bounded: small vectors, bounded magnitudes.
            ws in proptest::collection::vec(
                prop_oneof![Just(f64::NAN), Just(0.0), Just(-1.0), 0.0f64..1.0e6f64],
                1..20,
            ),
        ) {
            let p = normalize(&ws);

            // Deterministic.
            prop_assert_eq!(&p, &normalize(&ws));
            prop_assert_eq!(p.len(), ws.len());

            let sum: f64 = p.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9, "sum={}", sum);
            for &v in &p {
                prop_assert!(v.is_finite());
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
