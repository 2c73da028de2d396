use criterion::{Criterion, black_box, criterion_group, criterion_main};
use imcluster::kmeans::kmeans;
use imcluster::score::ScoreCalculator;
use imcluster::ward::ward;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// 生成有聚类模式的测试数据：每个样本在所属中心附近加入少量噪声
fn generate_clustered_data(n: usize, d: usize, num_clusters: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let centers = Array2::from_shape_fn((num_clusters, d), |_| rng.random::<f64>());
    Array2::from_shape_fn((n, d), |(i, j)| centers[[i % num_clusters, j]] + rng.random::<f64>() * 0.05)
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering_512");
    group.sample_size(10);

    let data = black_box(generate_clustered_data(2000, 512, 20));
    let labels = kmeans(data.view(), 20, 50, 42).assignments.iter().map(|&l| l as i32).collect::<Vec<_>>();

    group.bench_function("ward_2000", |b| b.iter(|| ward(data.view(), 20)));
    group.bench_function("kmeans_2000", |b| b.iter(|| kmeans(data.view(), 20, 50, 42)));
    group.bench_function("score_2000", |b| {
        b.iter(|| ScoreCalculator::default().score(data.view(), &labels).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_clustering);
criterion_main!(benches);
