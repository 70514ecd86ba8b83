//! Rolling statistics
//!
//! Series-level calculations feeding the breakout filter. Every function
//! returns one entry per input value, `None` where the value is undefined.

/// Calculate Simple Moving Average over a trailing window that includes the
/// current value.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if period == 0 {
        result.resize(values.len(), None);
        return result;
    }

    for i in 0..values.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Simple period-over-period return: `(v[t] - v[t-1]) / v[t-1]`
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if i == 0 || values[i - 1] == 0.0 {
            result.push(None);
        } else {
            result.push(Some((values[i] - values[i - 1]) / values[i - 1]));
        }
    }

    result
}

/// Element-wise `numerator / baseline`.
///
/// A missing or zero baseline yields `None` rather than an infinite ratio.
pub fn ratio_to_baseline(numerator: &[f64], baseline: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(baseline)
        .map(|(&value, base)| match base {
            Some(b) if *b != 0.0 => Some(value / b),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(2.0));
        assert_eq!(result[3], Some(3.0));
        assert_eq!(result[4], Some(4.0));
    }

    #[test]
    fn test_pct_change() {
        let values = vec![100.0, 110.0, 99.0];
        let result = pct_change(&values);

        assert_eq!(result[0], None);
        assert_eq!(result[1], Some(0.1));
        assert!((result[2].unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_skips_zero_baseline() {
        let result = ratio_to_baseline(&[0.0, 50.0, 300.0], &[Some(0.0), None, Some(100.0)]);
        assert_eq!(result, vec![None, None, Some(3.0)]);
    }
}
