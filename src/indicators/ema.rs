// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Recursive EMA without bias correction:
//   alpha  = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = alpha * x_t + (1 - alpha) * EMA_{t-1}
//
// The output is aligned 1:1 with the input, so the first value is the first
// observation itself rather than an SMA seed.
// =============================================================================

/// Smoothing factor for a given span.
pub fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA series for `values` with the given `span`.
///
/// Returns an empty `Vec` when the input is empty or the span is zero.
/// Callers are expected to have validated the input as finite; a non-finite
/// value propagates through every later element.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    if span == 0 {
        return Vec::new();
    }

    let a = alpha(span);
    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &x in &values[1..] {
        let ema = a * x + (1.0 - a) * prev;
        result.push(ema);
        prev = ema;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_span_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let ema = calculate_ema(&[7.0, 8.0, 9.0], 3);
        assert_eq!(ema.len(), 3);
        assert!((ema[0] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn ema_known_values() {
        // span 3 => alpha 0.5
        let ema = calculate_ema(&[2.0, 4.0, 8.0, 0.0], 3);
        let expected = [2.0, 3.0, 5.5, 2.75];
        for (a, b) in ema.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "got {a}, expected {b}");
        }
    }

    #[test]
    fn ema_span_one_tracks_input() {
        let closes = vec![3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(calculate_ema(&closes, 1), closes);
    }

    #[test]
    fn ema_of_constant_is_constant() {
        let ema = calculate_ema(&[42.0; 50], 26);
        assert!(ema.iter().all(|v| (v - 42.0).abs() < 1e-12));
    }
}
