//! Completion performance benchmarks: Knuth–Bendix on a dihedral-style
//! presentation, and generating-pair closure over a transformation
//! semigroup (the S3 fixture).

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use congruence_engine::base_semigroup::BaseSemigroup;
use congruence_engine::common::{Kind, Letter, Word};
use congruence_engine::knuth_bendix::KnuthBendix;
use congruence_engine::pair_closure::PairClosure;
use congruence_engine::runner::Runner;
use congruence_engine::transformation::{Transformation, TransformationSemigroup};

fn w(s: &str) -> Word {
    s.bytes().map(|b| (b - b'a') as Letter).collect()
}

fn bench_dihedral_completion(c: &mut Criterion) {
    let mut group = c.benchmark_group("knuth_bendix_dihedral");
    for &n in &[3usize, 7, 11] {
        let rels_word: Word = "ab".repeat(n).bytes().map(|b| (b - b'a') as Letter).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut kb = KnuthBendix::new(Kind::Monoid, 2);
                kb.add_rule(&w("aa"), &[]).unwrap();
                kb.add_rule(&w("bb"), &[]).unwrap();
                kb.add_rule(&rels_word, &[]).unwrap();
                kb.run();
                kb.confluent()
            });
        });
    }
    group.finish();
}

fn bench_transformation_semigroup_closure(c: &mut Criterion) {
    c.bench_function("pair_closure_s3_transformation_semigroup", |b| {
        b.iter(|| {
            let a = Transformation::new(vec![0, 2, 3, 1, 2]);
            let bb = Transformation::new(vec![2, 1, 0, 2, 2]);
            let mut base = TransformationSemigroup::new(5, vec![a, bb]);
            base.enumerate(&mut || false);
            let mut pc = PairClosure::new(base);
            pc.add_generating_pair(&w("aabaabba"), &w("bbaabbb")).unwrap();
            pc.nr_classes().unwrap()
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_dihedral_completion, bench_transformation_semigroup_closure
}
criterion_main!(benches);
