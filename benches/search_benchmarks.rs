//! Criterion benchmarks for the core indexing and query operations.
//!
//! Run with: `cargo bench`
//!
//! Uses synthetic data so results are reproducible across machines rather
//! than depending on a checked-out source tree.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::path::PathBuf;

use fileindex::{intern, FilePath, IndexStore, Position, PositionList, Token};

/// Build a synthetic store with `num_files` files, each holding
/// `tokens_per_file` positions drawn from a pool of 500 unique tokens,
/// plus a handful of tokens common to every file and one rare token
/// shared by 1% of files — similar token-distribution shape to a real
/// source tree (a long tail of identifiers plus a few ubiquitous keywords).
fn build_synthetic_store(num_files: usize, tokens_per_file: usize) -> IndexStore {
    let store = IndexStore::new();

    for file_id in 0..num_files {
        let path: FilePath = PathBuf::from(format!("src/file_{file_id}.rs"));
        let mut positions: HashMap<Token, PositionList> = HashMap::new();
        let mut pos: Position = 0;

        for t in 0..tokens_per_file {
            let token = intern(&format!("token_{}", t % 500));
            positions.entry(token).or_default().push(pos);
            pos += 1;
        }

        for common in &["fn", "pub", "struct", "impl", "use", "mod"] {
            positions.entry(intern(common)).or_default().push(pos);
            pos += 1;
        }

        if file_id % 100 == 0 {
            positions.entry(intern("raredashmap")).or_default().push(pos);
            pos += 1;
        }

        store.replace_file(path, positions, None);
    }

    store
}

fn bench_query(c: &mut Criterion) {
    let store = build_synthetic_store(10_000, 200);
    let mut group = c.benchmark_group("query");

    group.bench_function("common_token", |b| {
        b.iter(|| black_box(store.query(&intern("fn"))))
    });
    group.bench_function("rare_token", |b| {
        b.iter(|| black_box(store.query(&intern("raredashmap"))))
    });
    group.bench_function("unknown_token", |b| {
        b.iter(|| black_box(store.query(&intern("doesnotexist"))))
    });

    group.finish();
}

fn bench_query_phrase(c: &mut Criterion) {
    let store = IndexStore::new();
    // A handful of files where the same two tokens appear in different
    // relative orders, so phrase matching actually has to check adjacency
    // rather than degenerate to single-token lookups.
    for file_id in 0..2000 {
        let path: FilePath = PathBuf::from(format!("src/file_{file_id}.rs"));
        let mut positions: HashMap<Token, PositionList> = HashMap::new();
        if file_id % 2 == 0 {
            positions.insert(intern("quick"), vec![0]);
            positions.insert(intern("brown"), vec![1]);
        } else {
            positions.insert(intern("brown"), vec![0]);
            positions.insert(intern("quick"), vec![1]);
        }
        store.replace_file(path, positions, None);
    }

    let phrase = vec![intern("quick"), intern("brown")];
    c.bench_function("query_phrase_two_tokens", |b| {
        b.iter(|| black_box(store.query_phrase(&phrase)))
    });
}

fn bench_replace_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace_file");

    for tokens_per_file in [50usize, 500, 2000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(tokens_per_file),
            &tokens_per_file,
            |b, &tokens_per_file| {
                let store = IndexStore::new();
                let mut positions: HashMap<Token, PositionList> = HashMap::new();
                for t in 0..tokens_per_file {
                    positions.insert(intern(&format!("tok_{t}")), vec![t as Position]);
                }
                let path: FilePath = PathBuf::from("bench_target.rs");
                b.iter(|| {
                    store.replace_file(path.clone(), positions.clone(), None);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_query, bench_query_phrase, bench_replace_file);
criterion_main!(benches);
