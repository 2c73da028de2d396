//! 聚类算法的统一封装
//!
//! 需要聚类数量的算法（Ward、k-means）由 [`CountPolicy`] 决定数量；
//! 密度聚类（DBSCAN）使用邻域参数，并用 [`NOISE`](crate::types::NOISE) 标记离群点。
//! 使用哪一类算法在构造时确定。

use log::info;
use ndarray::ArrayView2;

use crate::advisor::ClusterCountAdvisor;
use crate::dbscan::Dbscan;
use crate::error::{Error, Result};
use crate::kmeans::kmeans;
use crate::types::Label;
use crate::ward::ward;

/// 聚类数量的确定方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountPolicy {
    /// 固定数量
    Fixed(usize),
    /// 根据样本数量推荐
    Advised(ClusterCountAdvisor),
}

impl CountPolicy {
    pub fn resolve(&self, n_samples: usize) -> usize {
        match self {
            CountPolicy::Fixed(k) => *k,
            CountPolicy::Advised(advisor) => advisor.recommend(n_samples),
        }
    }
}

/// 需要指定聚类数量的算法
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountedAlgorithm {
    Ward,
    KMeans { max_iter: usize, seed: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flavor {
    Counted { algorithm: CountedAlgorithm, policy: CountPolicy },
    Density(Dbscan),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterModelAdapter {
    flavor: Flavor,
}

impl ClusterModelAdapter {
    pub fn counted(algorithm: CountedAlgorithm, policy: CountPolicy) -> Result<Self> {
        if policy == CountPolicy::Fixed(0) {
            return Err(Error::InvalidConfiguration("聚类数量必须大于 0".to_string()));
        }
        if let CountedAlgorithm::KMeans { max_iter: 0, .. } = algorithm {
            return Err(Error::InvalidConfiguration("最大迭代次数必须大于 0".to_string()));
        }
        Ok(Self { flavor: Flavor::Counted { algorithm, policy } })
    }

    pub fn density(dbscan: Dbscan) -> Self {
        Self { flavor: Flavor::Density(dbscan) }
    }

    /// 对给定样本数量将使用的聚类数量，密度聚类返回 None
    pub fn resolve_count(&self, n_samples: usize) -> Option<usize> {
        match &self.flavor {
            Flavor::Counted { policy, .. } => Some(policy.resolve(n_samples)),
            Flavor::Density(_) => None,
        }
    }

    /// 密度聚类的参数，计数聚类返回 None
    pub fn density_params(&self) -> Option<Dbscan> {
        match self.flavor {
            Flavor::Density(dbscan) => Some(dbscan),
            Flavor::Counted { .. } => None,
        }
    }

    /// 对特征矩阵聚类，返回每个样本的标签
    pub fn fit_predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Label>> {
        let n = x.nrows();
        if n == 0 {
            return Err(Error::invalid_input("cluster", "特征矩阵为空"));
        }

        let labels = match &self.flavor {
            Flavor::Counted { algorithm, policy } => {
                let k = policy.resolve(n);
                if k == 0 || k > n {
                    return Err(Error::InvalidConfiguration(format!(
                        "聚类数量 {k} 超出范围 [1, {n}]"
                    )));
                }
                info!("使用 {:?} 将 {} 个样本聚为 {} 类", algorithm, n, k);
                let labels = match *algorithm {
                    CountedAlgorithm::Ward => ward(x, k),
                    CountedAlgorithm::KMeans { max_iter, seed } => {
                        kmeans(x, k, max_iter, seed).assignments
                    }
                };
                labels.into_iter().map(|l| l as Label).collect()
            }
            Flavor::Density(dbscan) => {
                info!(
                    "使用 DBSCAN 聚类 {} 个样本，eps = {}，min_samples = {}，标准化: {}",
                    n,
                    dbscan.eps(),
                    dbscan.min_samples().resolve(n),
                    dbscan.is_standardized()
                );
                dbscan.fit_predict(x)
            }
        };
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::types::NOISE;

    #[test]
    fn test_fixed_policy() {
        let adapter =
            ClusterModelAdapter::counted(CountedAlgorithm::Ward, CountPolicy::Fixed(2)).unwrap();
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        assert_eq!(adapter.fit_predict(x.view()).unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(adapter.resolve_count(100), Some(2));
    }

    #[test]
    fn test_advised_policy() {
        let advisor = ClusterCountAdvisor::new(3, 0.0, 1.0).unwrap();
        let adapter = ClusterModelAdapter::counted(
            CountedAlgorithm::KMeans { max_iter: 50, seed: 3 },
            CountPolicy::Advised(advisor),
        )
        .unwrap();
        let x = array![[0.0], [0.1], [5.0], [5.1], [10.0], [10.1]];
        let labels = adapter.fit_predict(x.view()).unwrap();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[2]);
        assert_ne!(labels[2], labels[4]);
    }

    #[test]
    fn test_density_flavor() {
        let adapter = ClusterModelAdapter::density(Dbscan::new(0.5, 2).unwrap());
        let x = array![[0.0], [0.1], [9.0]];
        assert_eq!(adapter.fit_predict(x.view()).unwrap(), vec![0, 0, NOISE]);
        assert_eq!(adapter.resolve_count(3), None);
        assert!(adapter.density_params().is_some());
    }

    #[test]
    fn test_invalid_counts() {
        assert!(matches!(
            ClusterModelAdapter::counted(CountedAlgorithm::Ward, CountPolicy::Fixed(0)),
            Err(Error::InvalidConfiguration(_))
        ));
        let adapter =
            ClusterModelAdapter::counted(CountedAlgorithm::Ward, CountPolicy::Fixed(5)).unwrap();
        let x = array![[0.0], [1.0]];
        assert!(matches!(adapter.fit_predict(x.view()), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_empty_matrix() {
        let adapter =
            ClusterModelAdapter::counted(CountedAlgorithm::Ward, CountPolicy::Fixed(2)).unwrap();
        let x = ndarray::Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            adapter.fit_predict(x.view()),
            Err(Error::InvalidInput { stage: "cluster", .. })
        ));
    }
}
