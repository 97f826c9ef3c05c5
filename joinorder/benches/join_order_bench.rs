/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate criterion;
extern crate kolibrie_joinorder;

use criterion::*;
use kolibrie_joinorder::join_optimizer::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::terms::{Term, TriplePattern};
use shared::triple::Triple;

fn setup_statistics() -> TripleStatistics {
    let mut rng = StdRng::seed_from_u64(42);
    let triples: Vec<Triple> = (0..20_000)
        .map(|_| {
            Triple::new(
                rng.gen_range(0..2_000),
                rng.gen_range(100..110),
                rng.gen_range(0..2_000),
            )
        })
        .collect();
    TripleStatistics::from_triples(triples)
}

fn var(name: &str) -> Term {
    Term::Variable(name.to_string())
}

// ?v0 -p100-> ?v1 -p101-> ?v2 ...
fn path_query(length: usize) -> Vec<TriplePattern> {
    (0..length)
        .map(|i| {
            (
                var(&format!("?v{}", i)),
                Term::Constant(100 + (i % 10) as u32),
                var(&format!("?v{}", i + 1)),
            )
        })
        .collect()
}

// ?center -p10x-> ?leaf_x
fn star_query(arms: usize) -> Vec<TriplePattern> {
    (0..arms)
        .map(|i| {
            (
                var("?center"),
                Term::Constant(100 + (i % 10) as u32),
                var(&format!("?leaf{}", i)),
            )
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let stats = setup_statistics();
    let parallel = JoinOrderOptimizer::new(&stats);
    let sequential =
        match JoinOrderOptimizer::with_config(&stats, OptimizerConfig::default().sequential()) {
            Ok(optimizer) => optimizer,
            Err(err) => panic!("invalid benchmark configuration: {}", err),
        };

    let mut group = c.benchmark_group("join_order");
    for size in [3usize, 5, 7] {
        let query = path_query(size);
        group.bench_with_input(BenchmarkId::new("path_sequential", size), &query, |b, q| {
            b.iter(|| sequential.optimize(black_box(q)))
        });
        group.bench_with_input(BenchmarkId::new("path_parallel", size), &query, |b, q| {
            b.iter(|| parallel.optimize(black_box(q)))
        });
    }
    for size in [7usize, 12, 20] {
        let query = star_query(size);
        group.bench_with_input(BenchmarkId::new("star_split", size), &query, |b, q| {
            b.iter(|| parallel.optimize(black_box(q)))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
