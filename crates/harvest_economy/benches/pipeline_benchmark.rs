//! Benchmark for effect pipeline throughput.
//!
//! Run with: cargo bench --package harvest_economy --bench pipeline_benchmark

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use harvest_core::{
    Interaction, PipelineEngine, PipelineOptions, RuleCategory, SkillCategory,
    Subject, ToolSnapshot,
};
use harvest_economy::{InventoryLedger, PipelineConfig, ProgressionBook, Services};

const ACTOR: u64 = 1;

fn configured_engine(debug: bool) -> PipelineEngine {
    let mut config = PipelineConfig::from_toml_str(include_str!("../data/pipeline.toml")).unwrap();
    config.flags.debug = debug;
    let progression = Arc::new(ProgressionBook::new());
    progression.set_tier(ACTOR, SkillCategory::Mining, 25);
    let services = Services::new(progression, Arc::new(InventoryLedger::new()));
    config.build_engine(&services, &config.shared_flags()).unwrap()
}

fn busy_tool() -> ToolSnapshot {
    ToolSnapshot::new(278)
        .with_trait("yield_boost", 3)
        .with_trait("lucky", 2)
        .with_trait("auto_smelt", 16)
}

fn benchmark_single_interaction(c: &mut Criterion) {
    let engine = configured_engine(false);
    let interaction = Interaction::new(ACTOR, Subject::new(15, SkillCategory::Mining), busy_tool());
    let options = PipelineOptions::all();

    c.bench_function("process_iron_ore_full_pipeline", |b| {
        b.iter(|| black_box(engine.process(black_box(&interaction), &options)));
    });

    let debug_engine = configured_engine(true);
    c.bench_function("process_iron_ore_debug_traces", |b| {
        b.iter(|| black_box(debug_engine.process(black_box(&interaction), &options)));
    });
}

fn benchmark_category_filter(c: &mut Criterion) {
    let engine = configured_engine(false);
    let interaction = Interaction::new(ACTOR, Subject::new(56, SkillCategory::Mining), busy_tool());
    let options = PipelineOptions::all()
        .without(RuleCategory::Conversion.bit().with(RuleCategory::BonusDrop.bit()));

    c.bench_function("process_diamond_ore_filtered", |b| {
        b.iter(|| black_box(engine.process(black_box(&interaction), &options)));
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let engine = configured_engine(false);
    let options = PipelineOptions::all();
    let blocks = [1u32, 14, 15, 16, 56];

    let mut group = c.benchmark_group("process_many");
    for size in [100usize, 1_000, 10_000] {
        let interactions: Vec<Interaction> = (0..size)
            .map(|i| {
                let block = blocks[i % blocks.len()];
                Interaction::new(ACTOR, Subject::new(block, SkillCategory::Mining), busy_tool())
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &interactions, |b, batch| {
            b.iter(|| black_box(engine.process_many(black_box(batch), &options)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_interaction,
    benchmark_category_filter,
    benchmark_batch,
);
criterion_main!(benches);
