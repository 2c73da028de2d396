use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::utils::squared_euclidean;

#[derive(Debug, Clone)]
pub struct KMeansState {
    /// 所有向量到所属聚类中心的距离平方和
    pub distsum: f64,
    /// 聚类中心，k x d
    pub centroids: Array2<f64>,
    /// 每个向量所属的聚类中心序号
    pub assignments: Vec<usize>,
    /// 每个聚类中心包含的向量数量
    pub centroid_frequency: Vec<usize>,
}

/// Lloyd 算法的 k-means 聚类，使用固定种子的 k-means++ 初始化，结果可复现
pub fn kmeans(x: ArrayView2<'_, f64>, k: usize, max_iter: usize, seed: u64) -> KMeansState {
    let n = x.nrows();
    let data = x.outer_iter().map(|row| row.to_vec()).collect::<Vec<_>>();
    if n == 0 || k == 0 {
        return KMeansState {
            distsum: 0.0,
            centroids: Array2::zeros((0, x.ncols())),
            assignments: vec![0; n],
            centroid_frequency: vec![],
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = init_plusplus(&data, k, &mut rng);
    let (mut assignments, mut distsum) = update_assignments(&data, &centroids);

    for iter in 0..max_iter {
        centroids = (0..k)
            .into_par_iter()
            .map(|cluster_id| update_centroid(&data, &assignments, cluster_id, &centroids[cluster_id]))
            .collect();

        let (new_assignments, new_distsum) = update_assignments(&data, &centroids);
        let changed = new_assignments != assignments;
        assignments = new_assignments;
        debug!("第 {} 轮 - 距离和：{:.4} | 变化：{:+.4}", iter + 1, new_distsum, new_distsum - distsum);
        distsum = new_distsum;
        if !changed {
            break;
        }
    }

    let mut centroid_frequency = vec![0; k];
    assignments.iter().for_each(|&c| centroid_frequency[c] += 1);
    debug!("k-means 完成，不平衡度：{:.2}", imbalance_factor(&centroid_frequency));

    let centroids = Array2::from_shape_fn((k, x.ncols()), |(i, j)| centroids[i][j]);
    KMeansState { distsum, centroids, assignments, centroid_frequency }
}

/// k-means++：按到最近中心的距离平方加权随机选取下一个中心
fn init_plusplus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)].clone());

    let mut nearest = data.iter().map(|p| squared_euclidean(p, &centroids[0])).collect::<Vec<_>>();
    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // 所有点都与已选中心重合
            rng.random_range(0..n)
        };
        let centroid = data[next].clone();
        nearest
            .iter_mut()
            .zip(data)
            .for_each(|(d, p)| *d = d.min(squared_euclidean(p, &centroid)));
        centroids.push(centroid);
    }
    centroids
}

/// 将每个点分配给最近的聚类中心，并返回聚类中心的序号和总距离
fn update_assignments(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<usize>, f64) {
    let (assignments, distances): (Vec<_>, Vec<_>) = data
        .par_iter()
        .map(|point| {
            let mut min_distance = f64::INFINITY;
            let mut best_cluster = 0;

            for (j, centroid) in centroids.iter().enumerate() {
                let distance = squared_euclidean(point, centroid);
                if distance < min_distance {
                    min_distance = distance;
                    best_cluster = j;
                }
            }

            (best_cluster, min_distance)
        })
        .unzip();
    let distance = distances.iter().sum();
    (assignments, distance)
}

/// 更新聚类中心为所属点的均值，没有点的聚类保持原中心
fn update_centroid(
    data: &[Vec<f64>],
    assignments: &[usize],
    cluster_id: usize,
    previous: &[f64],
) -> Vec<f64> {
    let mut sum = vec![0.0; previous.len()];
    let mut count = 0usize;
    for (point, _) in data.iter().zip(assignments).filter(|(_, a)| **a == cluster_id) {
        sum.iter_mut().zip(point).for_each(|(s, v)| *s += v);
        count += 1;
    }
    if count == 0 {
        return previous.to_vec();
    }
    sum.iter_mut().for_each(|s| *s /= count as f64);
    sum
}

/// 计算不平衡因子
fn imbalance_factor(hist: &[usize]) -> f64 {
    let (mut tot, mut uf) = (0.0, 0.0);
    for h in hist {
        let h = *h as f64;
        tot += h;
        uf += h.powf(2.0);
    }
    uf * hist.len() as f64 / tot.powf(2.0)
}
