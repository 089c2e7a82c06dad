use chrono::NaiveDate;
use comments::{
    comment::{builder::build_tree, flatten::flatten},
    Category, Comment, MaterializedPath,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("comment_trees");
    for n in [10, 100, 1000, 10000, 100000].iter() {
        let (root, descendants) = generate_comments(*n);
        group.bench_function(BenchmarkId::new("build", n), |b| {
            b.iter(|| build_tree(root.clone(), descendants.clone()).unwrap())
        });
        group.bench_function(BenchmarkId::new("build_and_flatten", n), |b| {
            b.iter(|| flatten(&[build_tree(root.clone(), descendants.clone()).unwrap()]))
        });
    }
    group.finish();
}

/// One root and `n - 1` replies hanging off pseudo-randomly chosen earlier
/// comments, sorted by path the way the store returns them.
fn generate_comments(n: usize) -> (Comment, Vec<Comment>) {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let target_id = Uuid::new_v4();

    let mut all: Vec<Comment> = Vec::with_capacity(n);
    for i in 0..n {
        let id = Uuid::new_v4();
        let parent = (i > 0).then(|| &all[(i.wrapping_mul(2_654_435_761) / 7) % i]);
        let comment = Comment {
            id,
            body: "content".to_string(),
            category: Category::Manga,
            target_id,
            post_id: None,
            user_id: Uuid::new_v4(),
            path: MaterializedPath::encode(parent.map(|p| &p.path), id).unwrap(),
            parent_id: parent.map(|p| p.id),
            created_at: start + chrono::Duration::seconds(i as i64),
        };
        all.push(comment);
    }

    let root = all.remove(0);
    all.sort_by(|a, b| a.path.cmp(&b.path));
    (root, all)
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
