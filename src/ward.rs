//! Ward 连接的层次聚类
//!
//! 使用最近邻链算法构建完整的合并树，再按合并距离排序并截取前 `n - k` 次合并。
//! Ward 距离满足可约性，最近邻链得到的合并树与逐次贪心合并一致。
//! 距离矩阵为 n x n，内存占用为 O(n²)。

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::utils::squared_euclidean;

/// 一次合并，`a` 和 `b` 为两个聚类中任意一个原始样本的序号
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub distance: f64,
}

/// 将样本聚为 `k` 类，标签按首次出现的顺序从 0 开始编号
pub fn ward(x: ArrayView2<'_, f64>, k: usize) -> Vec<usize> {
    let n = x.nrows();
    if n == 0 {
        return vec![];
    }
    let k = k.clamp(1, n);

    let mut merges = linkage(x);
    merges.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut uf = UnionFind::new(n);
    for merge in &merges[..n - k] {
        uf.union(merge.a, merge.b);
    }

    let mut roots = vec![usize::MAX; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = uf.find(i);
            if roots[root] == usize::MAX {
                roots[root] = next;
                next += 1;
            }
            roots[root]
        })
        .collect()
}

/// 计算完整的合并序列（共 n - 1 次），距离为 Lance-Williams 更新后的 Ward 距离
pub fn linkage(x: ArrayView2<'_, f64>) -> Vec<Merge> {
    let n = x.nrows();
    if n < 2 {
        return vec![];
    }
    let rows = x.outer_iter().map(|row| row.to_vec()).collect::<Vec<_>>();
    let mut dist = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let rows = &rows;
            (0..n).map(move |j| squared_euclidean(&rows[i], &rows[j]))
        })
        .collect::<Vec<_>>();

    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        // 沿最近邻链前进，直到找到互为最近邻的一对
        let (a, b) = loop {
            let a = chain[chain.len() - 1];
            let prev = if chain.len() >= 2 { Some(chain[chain.len() - 2]) } else { None };

            // 距离相同时优先选择链上的前一个节点，避免成环
            let mut best = prev;
            let mut best_dist = prev.map_or(f64::INFINITY, |p| dist[a * n + p]);
            for c in (0..n).filter(|&c| active[c] && c != a) {
                let d = dist[a * n + c];
                if d < best_dist || best.is_none() {
                    best_dist = d;
                    best = Some(c);
                }
            }

            match best {
                Some(b) if Some(b) == prev => break (a, b),
                Some(b) => chain.push(b),
                None => unreachable!("at least two active clusters remain"),
            }
        };
        chain.truncate(chain.len() - 2);

        merges.push(Merge { a, b, distance: dist[a * n + b] });

        // 合并后的聚类保存在 keep 位置
        let (keep, drop) = (a.min(b), a.max(b));
        let (na, nb) = (size[a] as f64, size[b] as f64);
        let dab = dist[a * n + b];
        for c in (0..n).filter(|&c| active[c] && c != a && c != b) {
            let nc = size[c] as f64;
            let d = ((na + nc) * dist[a * n + c] + (nb + nc) * dist[b * n + c] - nc * dab)
                / (na + nb + nc);
            dist[keep * n + c] = d;
            dist[c * n + keep] = d;
        }
        size[keep] += size[drop];
        active[drop] = false;
    }

    merges
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}
