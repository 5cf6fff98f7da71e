// 聚合運算：缺值一律略過，空集合的平均值為 NaN

pub fn sum(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    values.into_iter().flatten().sum()
}

pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (total, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

pub fn max(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    values
        .into_iter()
        .flatten()
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

pub fn min(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    values
        .into_iter()
        .flatten()
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

/// Differences between consecutive values; a pair with a gap yields no difference.
pub fn diffs(values: &[Option<f64>]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => Some(b - a),
            _ => None,
        })
        .collect()
}

pub fn mean_slice(values: &[f64]) -> f64 {
    mean(values.iter().copied().map(Some))
}
