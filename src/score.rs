//! 聚类质量评估
//!
//! 轮廓系数与 Calinski-Harabasz 指数均基于欧氏距离，另外统计各聚类的大小。

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{Label, NOISE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub silhouette: f64,
    pub calinski_harabasz: f64,
    pub n_samples: usize,
    pub n_clusters: usize,
    pub n_outliers: usize,
    pub label_size_min: f64,
    pub label_size_max: f64,
    pub label_size_mean: f64,
    pub label_size_var: f64,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score:")?;
        writeln!(f, "\tsilhouette: {:.2}", self.silhouette)?;
        writeln!(f, "\tcalinski_harabasz: {:.2}", self.calinski_harabasz)?;
        writeln!(f, "\tn_samples: {}", self.n_samples)?;
        writeln!(f, "\tn_clusters: {}", self.n_clusters)?;
        writeln!(f, "\tn_outliers: {}", self.n_outliers)?;
        writeln!(f, "\tlabel_size_min: {:.2}", self.label_size_min)?;
        writeln!(f, "\tlabel_size_max: {:.2}", self.label_size_max)?;
        writeln!(f, "\tlabel_size_mean: {:.2}", self.label_size_mean)?;
        write!(f, "\tlabel_size_var: {:.2}", self.label_size_var)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCalculator {
    /// 为 false 时，离群点不参与轮廓系数和 CH 指数的计算
    pub include_noise_in_metrics: bool,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self { include_noise_in_metrics: true }
    }
}

impl ScoreCalculator {
    pub fn new(include_noise_in_metrics: bool) -> Self {
        Self { include_noise_in_metrics }
    }

    pub fn score(&self, x: ArrayView2<'_, f64>, labels: &[Label]) -> Result<Score> {
        if x.nrows() != labels.len() {
            return Err(Error::invalid_input(
                "score",
                format!("特征矩阵有 {} 行，标签有 {} 个", x.nrows(), labels.len()),
            ));
        }

        let selected = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| self.include_noise_in_metrics || l != NOISE)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let x_sel = x.select(Axis(0), &selected);
        let labels_sel = selected.iter().map(|&i| labels[i]).collect::<Vec<_>>();

        let groups = group_indices(&labels_sel);
        if groups.len() < 2 {
            return Err(Error::invalid_input(
                "score",
                format!("至少需要 2 个不同的标签，实际只有 {} 个", groups.len()),
            ));
        }
        if groups.len() == labels_sel.len() {
            return Err(Error::invalid_input(
                "score",
                format!("{} 个样本各自成为一个聚类，无法评估", labels_sel.len()),
            ));
        }

        let silhouette = silhouette(x_sel.view(), &labels_sel, &groups);
        let calinski_harabasz = calinski_harabasz(x_sel.view(), &groups);

        let sizes = group_indices(labels)
            .into_iter()
            .filter(|(label, _)| *label >= 0)
            .map(|(_, idx)| idx.len() as f64)
            .collect::<Vec<_>>();
        let (label_size_min, label_size_max, label_size_mean, label_size_var) = size_stats(&sizes);

        Ok(Score {
            silhouette,
            calinski_harabasz,
            n_samples: labels.len(),
            n_clusters: sizes.len(),
            n_outliers: labels.iter().filter(|&&l| l == NOISE).count(),
            label_size_min,
            label_size_max,
            label_size_mean,
            label_size_var,
        })
    }
}

fn group_indices(labels: &[Label]) -> BTreeMap<Label, Vec<usize>> {
    let mut groups: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    groups
}

fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// 平均轮廓系数，单元素聚类中的样本记为 0
fn silhouette(
    x: ArrayView2<'_, f64>,
    labels: &[Label],
    groups: &BTreeMap<Label, Vec<usize>>,
) -> f64 {
    let n = labels.len();
    let total = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = &groups[&labels[i]];
            if own.len() <= 1 {
                return 0.0;
            }
            let row = x.row(i);
            let mean_dist = |members: &[usize]| {
                members.iter().map(|&j| euclidean(row, x.row(j))).sum::<f64>()
            };
            let a = mean_dist(own) / (own.len() - 1) as f64;
            let b = groups
                .iter()
                .filter(|(label, _)| **label != labels[i])
                .map(|(_, members)| mean_dist(members) / members.len() as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        })
        .sum::<f64>();
    total / n as f64
}

/// 组间离散度与组内离散度之比，组内离散度为 0 时返回 1
fn calinski_harabasz(x: ArrayView2<'_, f64>, groups: &BTreeMap<Label, Vec<usize>>) -> f64 {
    let (n, k) = (x.nrows(), groups.len());
    let Some(mean) = x.mean_axis(Axis(0)) else {
        return 1.0;
    };

    let mut between = 0.0;
    let mut within = 0.0;
    for members in groups.values() {
        let cluster = x.select(Axis(0), members);
        let centroid = cluster.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        between += members.len() as f64 * (&centroid - &mean).mapv(|v| v * v).sum();
        within += cluster.rows().into_iter().map(|r| (&r - &centroid).mapv(|v| v * v).sum()).sum::<f64>();
    }

    if within == 0.0 {
        1.0
    } else {
        between * (n - k) as f64 / (within * (k - 1) as f64)
    }
}

/// 最小值、最大值、平均值、总体方差
fn size_stats(sizes: &[f64]) -> (f64, f64, f64, f64) {
    if sizes.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let min = sizes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sizes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;
    let var = sizes.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / sizes.len() as f64;
    (min, max, mean, var)
}
