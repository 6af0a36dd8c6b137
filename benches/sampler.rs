//! Criterion benchmarks for the Gibbs kernel and the count map.
//!
//! Run with:
//!   cargo bench --bench sampler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bitalign::{Alignment, Corpus, CountMap, Model, Rng};

fn synthetic_corpus(seed: u64, n_sentences: usize, vocab: u32, max_len: u32) -> Corpus {
    let mut rng = Rng::from_seed(seed);
    let sentences = (0..n_sentences)
        .map(|_| {
            let len = rng.uint32_biased(max_len) + 4;
            Some((0..len).map(|_| rng.uint32_biased(vocab)).collect())
        })
        .collect();
    Corpus::from_sentences("bench", vocab, sentences).unwrap()
}

fn bench_sweep(c: &mut Criterion) {
    let source = synthetic_corpus(1, 500, 2000, 20);
    let target = synthetic_corpus(2, 500, 2500, 20);
    let total_positions: usize = (0..target.n_sentences())
        .map(|i| target.sentence(i).map_or(0, |s| s.len()))
        .sum();

    let mut group = c.benchmark_group("sweep");
    group.throughput(Throughput::Elements(total_positions as u64));
    for model in [Model::Lexical, Model::Hmm, Model::Fertility] {
        let mut rng = Rng::from_seed(42);
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        ta.randomize(&mut rng);
        ta.set_model(model);
        ta.make_counts();
        group.bench_with_input(
            BenchmarkId::new("model", model.index()),
            &model,
            |b, _| b.iter(|| ta.sample(&mut rng, 1.0)),
        );
    }
    group.finish();
}

fn bench_countmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("countmap");

    // The sampler's access pattern: mostly lookups, occasional +/-1 updates
    // on a key set small enough to stay inline part of the time.
    group.bench_function("mixed_ops_small_keyspace", |b| {
        let mut rng = Rng::from_seed(7);
        let mut map = CountMap::new();
        b.iter(|| {
            let key = rng.uint32_biased(32);
            match rng.uint32_biased(8) {
                0 => {
                    map.add(key, 1);
                }
                1 => {
                    if map.get(key).is_some_and(|v| v > 0) {
                        map.add(key, 1u32.wrapping_neg());
                    }
                }
                _ => {
                    std::hint::black_box(map.get(key));
                }
            }
        })
    });

    group.bench_function("grow_to_dynamic", |b| {
        b.iter(|| {
            let mut map = CountMap::new();
            for key in 0..64u32 {
                map.add(key * 3, key);
            }
            std::hint::black_box(map.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sweep, bench_countmap);
criterion_main!(benches);
