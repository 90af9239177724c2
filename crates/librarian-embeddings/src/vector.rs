//! L2 normalization of embedding vectors, computed via scaled sum-of-squares so a vector
//! with very large or very small components never overflows or underflows `f64` (spec
//! §4.2 "Normalization").

use librarian_core::error::ProviderError;

/// L2 norm of `v`, scaled by the largest-magnitude component before squaring.
pub fn l2_norm(v: &[f64]) -> f64 {
    let max_abs = v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if max_abs == 0.0 {
        return 0.0;
    }
    let scaled_sum_sq: f64 = v.iter().map(|x| (x / max_abs).powi(2)).sum();
    max_abs * scaled_sum_sq.sqrt()
}

/// Normalize `v` to unit L2 norm, within `tolerance` of 1.0 the vector passes through
/// unchanged. Non-finite or zero-norm vectors are rejected; a non-unit vector is only
/// rescaled when `auto_normalize` is set, otherwise it fails.
pub fn normalize(v: Vec<f64>, tolerance: f64, auto_normalize: bool) -> Result<Vec<f64>, ProviderError> {
    if v.iter().any(|x| !x.is_finite()) {
        return Err(ProviderError::InvalidRequest(
            "embedding vector contains non-finite components".to_string(),
        ));
    }
    let norm = l2_norm(&v);
    if norm == 0.0 {
        return Err(ProviderError::InvalidRequest(
            "embedding vector has zero norm".to_string(),
        ));
    }
    if (norm - 1.0).abs() <= tolerance {
        return Ok(v);
    }
    if !auto_normalize {
        return Err(ProviderError::InvalidRequest(format!(
            "embedding vector norm {norm} outside tolerance {tolerance} and auto-normalize is disabled"
        )));
    }
    Ok(v.into_iter().map(|x| x / norm).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_vector_passes_through_unchanged() {
        let v = vec![1.0, 0.0, 0.0];
        let out = normalize(v.clone(), 1e-6, true).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn non_unit_vector_is_rescaled_when_enabled() {
        let out = normalize(vec![3.0, 4.0], 1e-6, true).unwrap();
        assert!((l2_norm(&out) - 1.0).abs() < 1e-9);
        assert!((out[0] - 0.6).abs() < 1e-9);
        assert!((out[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn non_unit_vector_fails_when_auto_normalize_disabled() {
        assert!(normalize(vec![3.0, 4.0], 1e-6, false).is_err());
    }

    #[test]
    fn zero_vector_fails() {
        assert!(normalize(vec![0.0, 0.0], 1e-6, true).is_err());
    }

    #[test]
    fn non_finite_vector_fails() {
        assert!(normalize(vec![f64::NAN, 1.0], 1e-6, true).is_err());
        assert!(normalize(vec![f64::INFINITY, 1.0], 1e-6, true).is_err());
    }

    #[test]
    fn scaled_sum_of_squares_matches_naive_norm_for_reasonable_magnitudes() {
        let v = vec![1e10, 1e10];
        let naive = (v.iter().map(|x: &f64| x * x).sum::<f64>()).sqrt();
        assert!((l2_norm(&v) - naive).abs() / naive < 1e-9);
    }
}
