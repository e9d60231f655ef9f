pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Applies `reduce` to every full window of `window` consecutive values.
///
/// A row gets `None` until `window` values exist, and whenever any value in
/// its window is `None`.
pub(crate) fn rolling<F>(values: &[Option<f64>], window: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    let mut buffer = Vec::with_capacity(window);
    for end in (window - 1)..values.len() {
        buffer.clear();
        buffer.extend(values[end + 1 - window..=end].iter().map_while(|x| *x));
        if buffer.len() == window {
            out[end] = Some(reduce(&buffer));
        }
    }
    out
}

pub(crate) fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

pub(crate) fn rolling_sum(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().sum())
}

pub(crate) fn rolling_range(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| {
        let max = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = w.iter().copied().fold(f64::INFINITY, f64::min);
        max - min
    })
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_requires_full_valid_window() {
        let values = [None, Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)];
        let out = rolling_sum(&values, 2);
        assert_eq!(out, vec![None, None, Some(3.0), Some(5.0), None, None]);
    }

    #[test]
    fn rolling_range_uses_window_extremes() {
        let values = [Some(4.0), Some(1.0), Some(3.0)];
        assert_eq!(rolling_range(&values, 3), vec![None, None, Some(3.0)]);
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_to(1825.004, 2), 1825.0);
        assert_eq!(round_to(12.345_6, 2), 12.35);
    }
}
