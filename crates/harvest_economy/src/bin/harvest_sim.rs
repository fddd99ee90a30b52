//! # Harvest Simulator
//!
//! Runs a batch of interactions through a configured pipeline and prints
//! what came out: reward totals, routing, experience, payouts and rule hit
//! rates. Used to sanity-check balance tables before shipping them.
//!
//! ```text
//! harvest_sim --config crates/harvest_economy/data/pipeline.toml \
//!     --block 56 --count 10000 --trait lucky=3 --trait direct_pickup=1 --tier 20
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use harvest_core::{
    Amount, BlockId, Interaction, PipelineOptions, PipelineResult, SkillCategory, Subject,
    ToolSnapshot,
};
use harvest_economy::{Inventory, InventoryLedger, PipelineConfig, ProgressionBook, Services};

const ACTOR: u64 = 1;

#[derive(Parser, Debug)]
#[command(name = "harvest_sim", version, about = "Simulate harvest pipeline runs against a balance table")]
struct Args {
    /// Balance table to load.
    #[arg(short, long, default_value = "crates/harvest_economy/data/pipeline.toml")]
    config: PathBuf,

    /// Overrides the configured seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Block broken in every run.
    #[arg(short, long, default_value_t = 56)]
    block: BlockId,

    /// Skill category of the block.
    #[arg(long, default_value = "mining", value_parser = parse_category)]
    category: SkillCategory,

    /// Number of interactions.
    #[arg(short = 'n', long, default_value_t = 1000)]
    count: u32,

    /// Tool item id.
    #[arg(long, default_value_t = 278)]
    tool: u32,

    /// Tool trait as `id=level`; repeatable.
    #[arg(short = 't', long = "trait", value_parser = parse_trait)]
    traits: Vec<(String, u8)>,

    /// Actor tier in the category (0 = not joined).
    #[arg(long, default_value_t = 0)]
    tier: u32,

    /// Record per-rule traces.
    #[arg(long)]
    debug: bool,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_category(value: &str) -> Result<SkillCategory, String> {
    SkillCategory::ALL
        .into_iter()
        .find(|category| category.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown category `{value}`"))
}

fn parse_trait(value: &str) -> Result<(String, u8), String> {
    let (id, level) = value.split_once('=').unwrap_or((value, "1"));
    let level = level
        .parse::<u8>()
        .map_err(|e| format!("bad level in `{value}`: {e}"))?;
    if id.is_empty() {
        return Err(format!("missing trait id in `{value}`"));
    }
    Ok((id.to_string(), level))
}

/// Aggregated outcome of all runs.
#[derive(Default)]
struct Totals {
    runs: u64,
    rewards: BTreeMap<u32, u64>,
    given: u64,
    world: u64,
    experience: u64,
    currency: Amount,
    replants: u64,
    charges: u64,
    hits: BTreeMap<String, u64>,
    failures: u64,
}

impl Totals {
    fn record(&mut self, result: &PipelineResult) {
        self.runs += 1;
        for reward in &result.rewards {
            *self.rewards.entry(reward.item_id).or_insert(0) += u64::from(reward.quantity);
        }
        self.given += result.routing.given_units();
        self.world += result.routing.world_units();
        self.experience += result.experience.values().sum::<u64>();
        if let Some(currency) = result.routing.currency {
            self.currency += currency;
        }
        self.replants += u64::from(result.routing.replant);
        self.charges += u64::from(result.routing.charges_spent);
        for rule in &result.applied {
            *self.hits.entry(rule.clone()).or_insert(0) += 1;
        }
        self.failures += result.failures().count() as u64;
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), harvest_core::PipelineError> {
    let mut config = PipelineConfig::from_file(&args.config)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.flags.debug |= args.debug;

    let progression = Arc::new(ProgressionBook::new());
    if args.tier > 0 {
        progression.set_tier(ACTOR, args.category, args.tier);
    }
    let ledger = Arc::new(InventoryLedger::new());
    let services = Services::new(progression, ledger.clone());
    let engine = config.build_engine(&services, &config.shared_flags())?;

    let tool = args
        .traits
        .iter()
        .fold(ToolSnapshot::new(args.tool), |tool, (id, level)| tool.with_trait(id.clone(), *level));
    let interaction = Interaction::new(ACTOR, Subject::new(args.block, args.category), tool);
    let options = PipelineOptions::all();

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         HARVEST - PIPELINE SIMULATION                            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Rules:        {}", engine.rule_names().collect::<Vec<_>>().join(" -> "));
    println!("  Block:        {} ({})", args.block, args.category.as_str());
    println!("  Runs:         {}", args.count);
    println!();

    let start = Instant::now();
    let mut totals = Totals::default();
    let mut disabled = 0u64;
    for _ in 0..args.count {
        // Fresh inventory each run so direct pickup never overflows.
        ledger.open(ACTOR, Inventory::default());
        match engine.process(&interaction, &options) {
            Some(result) => totals.record(&result),
            None => disabled += 1,
        }
    }
    let elapsed = start.elapsed();

    println!("┌─ REWARDS ───────────────────────────────────────────────────────┐");
    for (item, quantity) in &totals.rewards {
        let per_run = *quantity as f64 / totals.runs.max(1) as f64;
        println!("│ item {item:>5}: {quantity:>10} total, {per_run:>8.3} per run");
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!("┌─ DELIVERY ──────────────────────────────────────────────────────┐");
    println!("│ Given to actor:   {}", totals.given);
    println!("│ Placed in world:  {}", totals.world);
    println!("│ Replants:         {}", totals.replants);
    println!("│ Charges spent:    {}", totals.charges);
    println!("│ Experience:       {}", totals.experience);
    println!("│ Currency:         {}", totals.currency);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!("┌─ RULE HIT RATES ────────────────────────────────────────────────┐");
    for (rule, hits) in &totals.hits {
        let rate = *hits as f64 * 100.0 / totals.runs.max(1) as f64;
        println!("│ {rule:<24} {hits:>8} ({rate:>6.2}%)");
    }
    println!("│ failures: {}  disabled runs: {disabled}", totals.failures);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();
    println!(
        "  {} runs in {:.2?} ({:.0} runs/sec)",
        totals.runs,
        elapsed,
        f64::from(args.count) / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    Ok(())
}
