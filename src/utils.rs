use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {prefix:>12.bold} {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )
    .expect("invalid progress template")
    .progress_chars("##-")
}

/// 将向量线性缩放到 [0, 1]，常数向量返回全 0
pub fn minmax_scale(v: &[f64]) -> Vec<f64> {
    let (min, max) = min_max(v.iter().copied());
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| (x - min) / range).collect()
}

/// 返回迭代器中的最小值和最大值，空迭代器返回 (0, 0)
pub fn min_max(iter: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut iter = iter.into_iter();
    let Some(first) = iter.next() else {
        return (0.0, 0.0);
    };
    iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)))
}

/// 两个向量之间的平方欧氏距离
#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
