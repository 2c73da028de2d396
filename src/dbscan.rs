//! DBSCAN 密度聚类
//!
//! 邻域半径内（含自身）至少有 `min_samples` 个点的样本为核心点，
//! 从核心点出发可达的点归入同一聚类，其余点标记为离群点 [`NOISE`]。

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::types::{Label, NOISE};
use crate::utils::squared_euclidean;

const UNCLASSIFIED: Label = -2;

/// 核心点所需邻居数量的确定方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MinSamplesPolicy {
    /// 固定数量
    Fixed(usize),
    /// 样本数量乘以比例后向上取整，至少为 1
    PerSamples(f64),
}

impl MinSamplesPolicy {
    pub fn resolve(&self, n_samples: usize) -> usize {
        match *self {
            MinSamplesPolicy::Fixed(m) => m,
            MinSamplesPolicy::PerSamples(ratio) => {
                ((n_samples as f64 * ratio).ceil() as usize).max(1)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    eps: f64,
    min_samples: MinSamplesPolicy,
    standardize: bool,
}

impl Dbscan {
    pub fn new(eps: f64, min_samples: usize) -> Result<Self> {
        Self::with_policy(eps, MinSamplesPolicy::Fixed(min_samples))
    }

    pub fn with_policy(eps: f64, min_samples: MinSamplesPolicy) -> Result<Self> {
        if !(eps.is_finite() && eps > 0.0) {
            return Err(Error::InvalidConfiguration(format!("邻域半径必须为正数: {eps}")));
        }
        match min_samples {
            MinSamplesPolicy::Fixed(0) => {
                return Err(Error::InvalidConfiguration("min_samples 必须大于 0".to_string()));
            }
            MinSamplesPolicy::PerSamples(ratio) if !(ratio.is_finite() && ratio > 0.0) => {
                return Err(Error::InvalidConfiguration(format!(
                    "min_samples 比例必须为正数: {ratio}"
                )));
            }
            _ => {}
        }
        Ok(Self { eps, min_samples, standardize: false })
    }

    /// 聚类前将每一列标准化为均值 0、标准差 1
    pub fn standardized(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> MinSamplesPolicy {
        self.min_samples
    }

    pub fn is_standardized(&self) -> bool {
        self.standardize
    }

    pub fn fit_predict(&self, x: ArrayView2<'_, f64>) -> Vec<Label> {
        let min_samples = self.min_samples.resolve(x.nrows());
        let rows = if self.standardize {
            standardize(x).outer_iter().map(|row| row.to_vec()).collect::<Vec<_>>()
        } else {
            x.outer_iter().map(|row| row.to_vec()).collect::<Vec<_>>()
        };
        let eps2 = self.eps * self.eps;
        let neighbors = (0..rows.len())
            .into_par_iter()
            .map(|i| {
                (0..rows.len())
                    .filter(|&j| squared_euclidean(&rows[i], &rows[j]) <= eps2)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let is_core = |i: usize| neighbors[i].len() >= min_samples;

        let mut labels = vec![UNCLASSIFIED; rows.len()];
        let mut cluster: Label = 0;
        for i in 0..rows.len() {
            if labels[i] != UNCLASSIFIED {
                continue;
            }
            if !is_core(i) {
                // 之后可能被某个核心点吸收为边界点
                labels[i] = NOISE;
                continue;
            }

            labels[i] = cluster;
            let mut queue = neighbors[i].clone();
            while let Some(j) = queue.pop() {
                if labels[j] == NOISE {
                    labels[j] = cluster;
                }
                if labels[j] != UNCLASSIFIED {
                    continue;
                }
                labels[j] = cluster;
                if is_core(j) {
                    queue.extend(neighbors[j].iter().copied().filter(|&n| labels[n] < 0));
                }
            }
            cluster += 1;
        }
        labels
    }
}

/// 按列减去均值并除以总体标准差，常数列变为 0
fn standardize(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = x.to_owned();
    if out.nrows() == 0 {
        return out;
    }
    for mut column in out.axis_iter_mut(Axis(1)) {
        let mean = column.mean().unwrap_or(0.0);
        let std = column.std(0.0);
        let scale = if std > 0.0 { std } else { 1.0 };
        column.mapv_inplace(|v| (v - mean) / scale);
    }
    out
}
