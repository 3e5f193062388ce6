//! Benchmarks for signal classification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use yasce::prelude::*;

/// Simple test bar structure
#[derive(Debug, Clone, Copy)]
struct TestBar {
  o: f64,
  h: f64,
  l: f64,
  c: f64,
}

impl OHLC for TestBar {
  fn open(&self) -> f64 {
    self.o
  }

  fn high(&self) -> f64 {
    self.h
  }

  fn low(&self) -> f64 {
    self.l
  }

  fn close(&self) -> f64 {
    self.c
  }
}

/// Generate realistic random bars
fn generate_bars(n: usize) -> Vec<TestBar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 0.5 + ((i * 3) % 10) as f64 / 10.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(TestBar { o, h, l, c });
    price = c;
  }

  bars
}

fn bench_classify(c: &mut Criterion) {
  let engine = EngineBuilder::new().with_defaults().build().unwrap();
  let mut group = c.benchmark_group("classify");

  for window in [100, 250, 500, 1000] {
    let bars = generate_bars(window);
    group.bench_with_input(BenchmarkId::from_parameter(window), &bars, |b, bars| {
      b.iter(|| engine.classify(black_box(bars)).unwrap());
    });
  }

  group.finish();
}

fn bench_series_bundle(c: &mut Criterion) {
  let engine = EngineBuilder::new().with_defaults().build().unwrap();
  let bars = generate_bars(500);

  c.bench_function("series_bundle_500", |b| {
    b.iter(|| engine.series(black_box(&bars)));
  });
}

fn bench_parallel_batch(c: &mut Criterion) {
  let engine = EngineBuilder::new().with_defaults().build().unwrap();
  let histories: Vec<Vec<TestBar>> = (0..32).map(|i| generate_bars(250 + i)).collect();
  let symbols: Vec<String> = (0..32).map(|i| format!("SYM{i}")).collect();

  c.bench_function("parallel_batch_32x250", |b| {
    b.iter(|| {
      let instruments: Vec<(&str, &[TestBar])> = symbols
        .iter()
        .map(String::as_str)
        .zip(histories.iter().map(Vec::as_slice))
        .collect();
      classify_parallel(&engine, black_box(instruments))
    });
  });
}

fn bench_replay(c: &mut Criterion) {
  let engine = EngineBuilder::new().with_defaults().build().unwrap();
  let bars = generate_bars(150);

  c.bench_function("replay_150", |b| {
    b.iter(|| engine.replay(black_box(&bars)).count());
  });
}

criterion_group!(
  benches,
  bench_classify,
  bench_series_bundle,
  bench_parallel_batch,
  bench_replay
);
criterion_main!(benches);
