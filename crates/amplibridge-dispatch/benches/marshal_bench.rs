// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for user-property marshaling and argument extraction
// in the amplibridge-dispatch crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Map, Value, json};

use amplibridge_dispatch::args::Args;
use amplibridge_dispatch::marshal::trait_set;

/// Properties object with `n` keys cycling through every value shape.
fn properties(n: usize) -> Map<String, Value> {
    let mut map = Map::new();
    for i in 0..n {
        let value = match i % 6 {
            0 => json!(format!("value-{i}")),
            1 => json!(i),
            2 => json!(5_000_000_000_i64 + i as i64),
            3 => json!(i as f64 + 0.5),
            4 => json!(i % 2 == 0),
            _ => json!([i, i + 1]),
        };
        map.insert(format!("prop_{i}"), value);
    }
    map
}

fn bench_trait_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("trait_set");
    for size in [8, 64, 512] {
        let props = properties(size);
        group.bench_function(format!("{size}_keys"), |b| {
            b.iter(|| trait_set(black_box(&props)))
        });
    }
    group.finish();
}

fn bench_revenue_args(c: &mut Criterion) {
    let raw = vec![
        json!("sku1"),
        json!(2),
        json!(9.99),
        json!("type"),
        json!({ "ignored": 1 }),
    ];
    c.bench_function("revenue_args", |b| {
        b.iter(|| {
            let args = Args::new(black_box(&raw));
            (
                args.string(0).unwrap(),
                args.int(1).unwrap(),
                args.double(2).unwrap(),
                args.opt_string(3).unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_trait_set, bench_revenue_args);
criterion_main!(benches);
