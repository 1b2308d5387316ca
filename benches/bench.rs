//! Criterion benchmarks for changelearn.
//!
//! Covers the per-observation hot path:
//! - Feature extraction (hashing and length normalisation)
//! - Prediction and gradient updates of the three classifiers
//! - Confusion matrix evaluation

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use changelearn::config::LearnerConfig;
use changelearn::feed::{ChangeFeed, Observation, SyntheticFeed};
use changelearn::ml::{FeatureExtractor, FeatureHasher, HashFunction, OnlineTrainer};
use changelearn::ml::hashing::FeatureField;

/// Generate observations for benchmarking.
fn generate_observations(count: usize) -> Vec<Observation> {
    let mut feed = SyntheticFeed::new(42, count).with_limit(count);
    feed.next_batch()
        .unwrap()
        .into_iter()
        .map(Observation::from)
        .collect()
}

fn bench_config() -> LearnerConfig {
    LearnerConfig {
        log_every: 0,
        ..LearnerConfig::default()
    }
}

/// Benchmark feature hashing and extraction.
fn bench_feature_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_extraction");
    let observations = generate_observations(1_000);

    for function in [HashFunction::Crc32, HashFunction::AHash] {
        let hasher = FeatureHasher::new(function, 1 << 18);
        group.bench_function(format!("hash_username_{function:?}"), |b| {
            b.iter(|| hasher.index(FeatureField::Username, black_box("ExampleEditor")))
        });
    }

    group.throughput(Throughput::Elements(observations.len() as u64));
    group.bench_function("extract_batch", |b| {
        b.iter(|| {
            let mut extractor = FeatureExtractor::new(HashFunction::Crc32, 1 << 18);
            for observation in &observations {
                black_box(extractor.extract(black_box(observation)));
            }
        })
    });

    group.finish();
}

/// Benchmark the predict-then-update step.
fn bench_online_learning(c: &mut Criterion) {
    let mut group = c.benchmark_group("online_learning");
    group.sample_size(20); // Model construction allocates 3 x 2^18 weights
    let observations = generate_observations(1_000);

    group.throughput(Throughput::Elements(observations.len() as u64));
    group.bench_function("learn_batch", |b| {
        let mut trainer = OnlineTrainer::new(&bench_config()).unwrap();
        b.iter(|| {
            for observation in &observations {
                black_box(trainer.learn_one(black_box(observation)).unwrap());
            }
        })
    });

    group.throughput(Throughput::Elements(observations.len() as u64));
    group.bench_function("predict_batch", |b| {
        let mut trainer = OnlineTrainer::new(&bench_config()).unwrap();
        for observation in &observations {
            trainer.learn_one(observation).unwrap();
        }
        b.iter(|| {
            for observation in &observations {
                black_box(trainer.predict_one(black_box(observation)).unwrap());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_feature_extraction, bench_online_learning);
criterion_main!(benches);
