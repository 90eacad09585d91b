mod common;
mod logic;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use gacha_engine::{
    DrawEngine, EngineConfig, GachaSession, PityConfig, PresetCatalog, PresetId, best_outcome,
    clear_snapshot, estimate_for_tier,
};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::{FileStorage, split_csv};
use logic::{
    CalcReport, PresetsReport, PullReport, Report, ReportFormat, ResetReport, SimulationPlan,
    SimulationReport, StatsReport, aggregate_sessions, run_simulation, write_report,
};

#[derive(Debug, Parser)]
#[command(name = "gacha-sim", version)]
#[command(about = "Loot-box draw simulator with pity guarantees and probability reports")]
struct Args {
    /// Directory holding the persisted session
    #[arg(long, default_value = ".gacha")]
    state_dir: PathBuf,

    /// JSON file overriding preset tier tables
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Suppress the banner
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw on the persisted session
    Pull(PullArgs),
    /// Breakdown of the persisted history
    Stats {
        /// Preset whose table the history is compared against
        #[arg(long, default_value = "standard")]
        preset: PresetId,
    },
    /// Pulls needed to reach a tier with the given probability
    Calc {
        /// Tier id, e.g. legendary
        #[arg(long)]
        tier: String,
        /// Target probability in percent
        #[arg(long)]
        prob: f64,
        #[arg(long, default_value = "standard")]
        preset: PresetId,
    },
    /// Clear the persisted session
    Reset,
    /// List presets and their tiers
    Presets,
    /// Run independent in-memory sessions and compare against configured rates
    Simulate(SimulateArgs),
}

#[derive(Debug, ClapArgs)]
struct PityArgs {
    /// Disable pity guarantees
    #[arg(long)]
    no_pity: bool,

    #[arg(long)]
    epic_threshold: Option<u32>,

    #[arg(long)]
    legendary_threshold: Option<u32>,
}

impl PityArgs {
    fn config(&self) -> PityConfig {
        let standard = PityConfig::standard();
        PityConfig {
            enabled: !self.no_pity,
            epic_threshold: self.epic_threshold.unwrap_or(standard.epic_threshold),
            legendary_threshold: self
                .legendary_threshold
                .unwrap_or(standard.legendary_threshold),
        }
    }
}

#[derive(Debug, ClapArgs)]
struct PullArgs {
    /// Number of draws
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    count: i64,

    #[arg(long, default_value = "standard")]
    preset: PresetId,

    /// Seed for this batch; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    pity: PityArgs,
}

#[derive(Debug, ClapArgs)]
struct SimulateArgs {
    /// Draws per session
    #[arg(long, default_value_t = 1_000, allow_negative_numbers = true)]
    pulls: i64,

    /// Independent sessions per preset
    #[arg(long, default_value_t = 100)]
    sessions: u32,

    /// Seed of the first session; later sessions count up from it
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Presets to simulate (comma-separated, or `all`)
    #[arg(long, default_value = "standard")]
    preset: String,

    #[command(flatten)]
    pity: PityArgs,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let console = args.report == ReportFormat::Console;
    if console && !args.quiet {
        announce_banner();
    }

    let start_time = Instant::now();
    let report = execute(&args)?;
    emit_report(&args, &report)?;

    if console && !args.quiet {
        println!("🏁 Done in {:?}", start_time.elapsed());
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🎰 Gacha Simulator".bright_cyan().bold());
    println!("{}", "==================".cyan());
}

fn load_catalog(args: &Args) -> Result<PresetCatalog> {
    let Some(path) = &args.catalog else {
        return Ok(PresetCatalog::builtin());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    PresetCatalog::from_json(&raw)
        .with_context(|| format!("invalid catalog {}", path.display()))
}

fn execute(args: &Args) -> Result<Report> {
    let catalog = load_catalog(args)?;
    match &args.command {
        Command::Pull(pull) => run_pull(args, pull, catalog),
        Command::Stats { preset } => run_stats(args, *preset, catalog),
        Command::Calc { tier, prob, preset } => run_calc(&catalog, tier, *prob, *preset),
        Command::Reset => run_reset(args),
        Command::Presets => Ok(Report::Presets(PresetsReport::from_catalog(&catalog))),
        Command::Simulate(sim) => run_simulate(sim, &catalog),
    }
}

fn open_session(
    args: &Args,
    config: EngineConfig,
    catalog: PresetCatalog,
    seed: u64,
) -> Result<GachaSession<FileStorage>> {
    let engine =
        DrawEngine::seeded_with(config, catalog, seed).context("invalid engine configuration")?;
    GachaSession::open(engine, FileStorage::new(&args.state_dir)).with_context(|| {
        format!(
            "failed to load session from {}",
            args.state_dir.display()
        )
    })
}

fn run_pull(args: &Args, pull: &PullArgs, catalog: PresetCatalog) -> Result<Report> {
    let config = EngineConfig {
        preset: pull.preset,
        pity: pull.pity.config(),
        ..EngineConfig::default()
    };
    let seed = pull.seed.unwrap_or_else(rand::random::<u64>);
    let mut session = open_session(args, config, catalog, seed)?;
    let outcomes = session
        .pull(pull.count)
        .with_context(|| format!("cannot pull {} times", pull.count))?;

    let persistence_warning = session.last_persistence_error().map(ToString::to_string);
    if let Some(warning) = &persistence_warning {
        eprintln!("⚠️  Session not fully saved: {}", warning.yellow());
    }

    let engine = session.engine();
    Ok(Report::Pull(PullReport {
        preset: engine.active_preset(),
        seed,
        best: best_outcome(&outcomes).cloned(),
        outcomes,
        total_pulls: engine.pull_count(),
        pity: engine.pity_counter(),
        pity_config: engine.pity_config(),
        spend: session.stats().total_spend,
        persistence_warning,
    }))
}

fn run_stats(args: &Args, preset: PresetId, catalog: PresetCatalog) -> Result<Report> {
    let config = EngineConfig {
        preset,
        ..EngineConfig::default()
    };
    let session = open_session(args, config, catalog, 0)?;
    Ok(Report::Stats(StatsReport {
        preset,
        summary: session.stats(),
    }))
}

fn run_calc(catalog: &PresetCatalog, tier: &str, prob: f64, preset: PresetId) -> Result<Report> {
    let table = catalog.table(preset)?;
    let tier_id = tier.trim().to_ascii_lowercase();
    let estimate = estimate_for_tier(table, &tier_id, prob)
        .with_context(|| format!("cannot estimate pulls for {tier_id} on {preset}"))?;
    let tier = table
        .find(&tier_id)
        .with_context(|| format!("unknown tier {tier_id}"))?;
    Ok(Report::Calc(CalcReport {
        preset,
        tier_id: tier.id.clone(),
        tier_name: tier.name.clone(),
        weight: tier.weight,
        target_percent: prob,
        estimate,
        cost: estimate.cost(EngineConfig::default().cost_per_pull),
    }))
}

fn run_reset(args: &Args) -> Result<Report> {
    clear_snapshot(&FileStorage::new(&args.state_dir))
        .with_context(|| format!("failed to clear {}", args.state_dir.display()))?;
    Ok(Report::Reset(ResetReport {
        state_dir: args.state_dir.display().to_string(),
    }))
}

fn expand_presets(preset_arg: &str) -> Result<Vec<PresetId>> {
    let mut presets = Vec::new();
    for token in split_csv(preset_arg) {
        if token.eq_ignore_ascii_case("all") {
            presets.extend(PresetId::ALL);
            continue;
        }
        presets.push(token.parse::<PresetId>()?);
    }
    presets.dedup();
    Ok(presets)
}

fn run_simulate(sim: &SimulateArgs, catalog: &PresetCatalog) -> Result<Report> {
    let mut aggregates = Vec::new();
    let mut sessions = Vec::new();
    for preset in expand_presets(&sim.preset)? {
        let plan = SimulationPlan::new(preset, sim.pulls, sim.sessions, sim.seed)
            .with_pity(sim.pity.config());
        let records = run_simulation(catalog, &plan)?;
        let table = catalog.table(preset)?;
        aggregates.push(aggregate_sessions(preset, plan.pity, table, &records));
        sessions.extend(records);
    }
    Ok(Report::Simulation(SimulationReport {
        aggregates,
        sessions,
    }))
}

fn emit_report(args: &Args, report: &Report) -> Result<()> {
    let mut sink = ReportSink::open(args.output.as_deref())?;
    write_report(&mut sink, args.report, report)?;
    sink.flush()
        .with_context(|| format!("failed to write report to {}", sink.destination))
}

/// Buffered report destination: stdout, or a file created up front.
struct ReportSink {
    out: BufWriter<Box<dyn Write>>,
    destination: String,
}

impl ReportSink {
    fn open(path: Option<&Path>) -> Result<Self> {
        let (inner, destination): (Box<dyn Write>, String) = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                (Box::new(file), path.display().to_string())
            }
            None => (Box::new(stdout()), "stdout".to_string()),
        };
        Ok(Self {
            out: BufWriter::new(inner),
            destination,
        })
    }
}

impl Write for ReportSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}
