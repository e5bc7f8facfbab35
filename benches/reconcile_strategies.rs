//! Benchmark suite for comparing reconciliation strategies
//!
//! This benchmark compares the synchronous and asynchronous strategies and
//! the bare matching engine using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//! ```
//!
//! # Generated Datasets
//!
//! Sources are generated in memory at three sizes (100, 10,000 and 100,000
//! rows per side). Each dataset includes a mix of:
//! - Exact matches
//! - Amount and status mismatches
//! - References present on only one side

use rust_payments_reconciler::cli::StrategyType;
use rust_payments_reconciler::config::ReconcilerConfig;
use rust_payments_reconciler::io::{RecordParser, SourceFile};
use rust_payments_reconciler::pipeline::no_progress;
use rust_payments_reconciler::strategy::create_strategy;
use rust_payments_reconciler::types::Source;
use rust_payments_reconciler::MatchingEngine;

fn main() {
    divan::main();
}

const SIZES: &[usize] = &[100, 10_000, 100_000];

fn generate_sources(rows: usize) -> (SourceFile, SourceFile) {
    let mut internal = String::from("reference,amount,status,customer_id\n");
    let mut provider = String::from("reference,amount,status\n");
    let statuses = ["completed", "pending", "failed"];

    for i in 0..rows {
        let status = statuses[i % 3];
        internal.push_str(&format!("TX{:08},{}.{:02},{},C{}\n", i, i % 1000, i % 100, status, i % 97));

        match i % 10 {
            // internal only
            0 => {}
            // amount mismatch
            1 => provider.push_str(&format!("TX{:08},{}.{:02},{}\n", i, i % 1000 + 1, i % 100, status)),
            // status mismatch
            2 => provider.push_str(&format!("TX{:08},{}.{:02},failed\n", i, i % 1000, i % 100)),
            _ => provider.push_str(&format!("TX{:08},{}.{:02},{}\n", i, i % 1000, i % 100, status)),
        }
        if i % 20 == 0 {
            provider.push_str(&format!("PX{:08},1.00,completed\n", i));
        }
    }

    (
        SourceFile::new("internal.csv", internal),
        SourceFile::new("provider.csv", provider),
    )
}

fn config() -> ReconcilerConfig {
    ReconcilerConfig::default()
}

/// Full pipeline with the synchronous strategy
#[divan::bench(args = SIZES)]
fn sync_strategy(bencher: divan::Bencher, rows: usize) {
    let (internal, provider) = generate_sources(rows);
    let strategy = create_strategy(StrategyType::Sync, config());

    bencher.bench_local(|| {
        strategy
            .reconcile(internal.clone(), provider.clone(), &no_progress)
            .expect("Reconciliation failed")
    });
}

/// Full pipeline with the asynchronous strategy
#[divan::bench(args = SIZES)]
fn async_strategy(bencher: divan::Bencher, rows: usize) {
    let (internal, provider) = generate_sources(rows);
    let strategy = create_strategy(StrategyType::Async, config());

    bencher.bench_local(|| {
        strategy
            .reconcile(internal.clone(), provider.clone(), &no_progress)
            .expect("Reconciliation failed")
    });
}

/// Matching only, on pre-parsed records
#[divan::bench(args = SIZES)]
fn matching_engine(bencher: divan::Bencher, rows: usize) {
    let (internal, provider) = generate_sources(rows);
    let parser = RecordParser::new(&config());
    let internal = parser.parse(&internal, Source::Internal).records;
    let provider = parser.parse(&provider, Source::Provider).records;
    let engine = MatchingEngine::default();

    bencher.bench_local(|| engine.reconcile(&internal, &provider));
}
