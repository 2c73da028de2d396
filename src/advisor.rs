use crate::error::{Error, Result};

/// 根据样本数量推荐聚类数量
///
/// `k = base + round(scale * log10(max(n / divisor, 1)))`，
/// 结果至少为 2，且不超过 `n - 1`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCountAdvisor {
    base: usize,
    scale: f64,
    divisor: f64,
}

impl ClusterCountAdvisor {
    pub const DEFAULT_BASE: usize = 2;
    pub const DEFAULT_SCALE: f64 = 8.0;
    pub const DEFAULT_DIVISOR: f64 = 10.0;

    pub fn new(base: usize, scale: f64, divisor: f64) -> Result<Self> {
        if !(divisor.is_finite() && divisor > 0.0) {
            return Err(Error::InvalidConfiguration(format!("除数必须为正数: {divisor}")));
        }
        if !scale.is_finite() {
            return Err(Error::InvalidConfiguration(format!("无效的缩放系数: {scale}")));
        }
        Ok(Self { base, scale, divisor })
    }

    pub fn recommend(&self, n_samples: usize) -> usize {
        // log10 的参数至少为 1，样本较少时退化为 base
        let ratio = (n_samples as f64 / self.divisor).max(1.0);
        let k = self.base as f64 + (self.scale * ratio.log10()).round();
        let k = if k.is_finite() && k > 0.0 { k as usize } else { 0 };
        k.max(2).min(n_samples.saturating_sub(1)).max(1)
    }
}

impl Default for ClusterCountAdvisor {
    fn default() -> Self {
        Self {
            base: Self::DEFAULT_BASE,
            scale: Self::DEFAULT_SCALE,
            divisor: Self::DEFAULT_DIVISOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10, 2)]
    #[case(100, 10)]
    #[case(1000, 18)]
    #[case(31, 6)]
    fn test_recommend_default(#[case] n: usize, #[case] expected: usize) {
        assert_eq!(ClusterCountAdvisor::default().recommend(n), expected);
    }

    #[test]
    fn test_log_floor_clamp() {
        // n / divisor <= 1 时结果恰好为 base
        let advisor = ClusterCountAdvisor::new(5, 8.0, 100.0).unwrap();
        assert_eq!(advisor.recommend(50), 5);
        let advisor = ClusterCountAdvisor::new(5, 8.0, 50.0).unwrap();
        assert_eq!(advisor.recommend(50), 5);
    }

    #[test]
    fn test_recommend_is_clamped() {
        let advisors = [
            ClusterCountAdvisor::default(),
            ClusterCountAdvisor::new(0, 0.0, 1.0).unwrap(),
            ClusterCountAdvisor::new(50, 20.0, 1.0).unwrap(),
            ClusterCountAdvisor::new(3, -40.0, 0.5).unwrap(),
        ];
        for advisor in advisors {
            for n in 3..500 {
                let k = advisor.recommend(n);
                assert!(k >= 2 && k <= n - 1, "{advisor:?} n={n} k={k}");
            }
        }
    }

    #[test]
    fn test_tiny_inputs() {
        let advisor = ClusterCountAdvisor::default();
        assert_eq!(advisor.recommend(2), 1);
        assert_eq!(advisor.recommend(1), 1);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn test_invalid_divisor(#[case] divisor: f64) {
        assert!(matches!(
            ClusterCountAdvisor::new(2, 1.0, divisor),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
