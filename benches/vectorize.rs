use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use imcluster::vectorizer::{Similarity, WindowVectorizer};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// 随机生成的二值图片，墨迹占比约 30%
fn generate_mask(rows: usize, cols: usize) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(42);
    Array2::from_shape_fn((rows, cols), |_| if rng.random_bool(0.3) { 1.0 } else { 0.0 })
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorize_64x64");
    let image = black_box(generate_mask(64, 64));

    for (rows, cols) in [(2, 2), (3, 3)] {
        for similarity in [Similarity::ExactMatch, Similarity::Iou] {
            let vectorizer = WindowVectorizer::new(rows, cols, similarity, false).unwrap();
            group.bench_with_input(
                BenchmarkId::new(similarity.to_string(), format!("{rows}x{cols}")),
                &image,
                |b, image| b.iter(|| vectorizer.vectorize(image.view()).unwrap()),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_vectorize);
criterion_main!(benches);
