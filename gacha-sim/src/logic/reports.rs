use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use gacha_engine::{
    DrawOutcome, PityConfig, PityCounter, PityTrigger, PresetCatalog, PresetId, PullEstimate,
    StatsSummary, Tier, TierStats,
};
use serde::Serialize;
use std::io::Write;

use crate::common::{csv_field, hex_rgb};
use crate::logic::simulation::{SessionRecord, SimulationAggregate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored human-readable output
    Console,
    Json,
    Markdown,
    Csv,
}

#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub preset: PresetId,
    pub seed: u64,
    pub outcomes: Vec<DrawOutcome>,
    pub best: Option<DrawOutcome>,
    pub total_pulls: u64,
    pub pity: PityCounter,
    pub pity_config: PityConfig,
    pub spend: f64,
    pub persistence_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub preset: PresetId,
    #[serde(flatten)]
    pub summary: StatsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcReport {
    pub preset: PresetId,
    pub tier_id: String,
    pub tier_name: String,
    pub weight: f64,
    pub target_percent: f64,
    pub estimate: PullEstimate,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetEntry {
    pub preset: PresetId,
    pub legendary_anchor: String,
    pub epic_anchor: String,
    /// Rarest first.
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetsReport {
    pub presets: Vec<PresetEntry>,
}

impl PresetsReport {
    pub fn from_catalog(catalog: &PresetCatalog) -> Self {
        let presets = catalog
            .iter()
            .map(|(preset, table)| PresetEntry {
                preset,
                legendary_anchor: table.legendary_anchor().id.clone(),
                epic_anchor: table.epic_anchor().id.clone(),
                tiers: table.ranked().cloned().collect(),
            })
            .collect();
        Self { presets }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetReport {
    pub state_dir: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub aggregates: Vec<SimulationAggregate>,
    pub sessions: Vec<SessionRecord>,
}

/// Everything a command can report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    Pull(PullReport),
    Stats(StatsReport),
    Calc(CalcReport),
    Presets(PresetsReport),
    Reset(ResetReport),
    Simulation(SimulationReport),
}

pub fn write_report(out: &mut dyn Write, format: ReportFormat, report: &Report) -> Result<()> {
    match format {
        ReportFormat::Console => generate_console_report(out, report),
        ReportFormat::Json => generate_json_report(out, report),
        ReportFormat::Markdown => generate_markdown_report(out, report),
        ReportFormat::Csv => generate_csv_report(out, report),
    }
}

fn percent(rate: f64) -> String {
    format!("{:.3}%", rate * 100.0)
}

fn paint(label: &str, color: &str) -> ColoredString {
    match hex_rgb(color) {
        Some((r, g, b)) => label.truecolor(r, g, b).bold(),
        None => label.normal(),
    }
}

const fn trigger_label(trigger: PityTrigger) -> &'static str {
    match trigger {
        PityTrigger::None => "",
        PityTrigger::Soft => "soft pity",
        PityTrigger::Hard => "hard pity",
    }
}

const fn trigger_code(trigger: PityTrigger) -> &'static str {
    match trigger {
        PityTrigger::None => "none",
        PityTrigger::Soft => "soft",
        PityTrigger::Hard => "hard",
    }
}

fn estimate_label(estimate: PullEstimate) -> String {
    estimate
        .pulls()
        .map_or_else(|| "N/A (unbounded)".to_string(), |n| n.to_string())
}

pub fn generate_json_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_console_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    match report {
        Report::Pull(pull) => console_pull(out, pull),
        Report::Stats(stats) => console_stats(out, stats),
        Report::Calc(calc) => console_calc(out, calc),
        Report::Presets(presets) => console_presets(out, presets),
        Report::Reset(reset) => {
            writeln!(out, "🧹 Session cleared in {}", reset.state_dir.bold())?;
            Ok(())
        }
        Report::Simulation(sim) => console_simulation(out, sim),
    }
}

fn console_pull(out: &mut dyn Write, pull: &PullReport) -> Result<()> {
    writeln!(
        out,
        "{}",
        format!(
            "🎲 {} pulls on {} (seed {})",
            pull.outcomes.len(),
            pull.preset,
            pull.seed
        )
        .bright_cyan()
        .bold()
    )?;
    for outcome in &pull.outcomes {
        let trigger = trigger_label(outcome.pity);
        writeln!(
            out,
            "  #{:>6}  {:<20} {:>9}  {}",
            outcome.index,
            paint(&outcome.item_label, &outcome.color),
            percent(outcome.weight),
            trigger.yellow()
        )?;
    }
    if let Some(best) = &pull.best {
        writeln!(
            out,
            "✨ Best of batch: {} (#{})",
            paint(&best.item_label, &best.color),
            best.index
        )?;
    }
    if pull.pity_config.enabled {
        writeln!(
            out,
            "Pity: epic {}/{} · legendary {}/{}",
            pull.pity.epic,
            pull.pity_config.epic_threshold,
            pull.pity.legendary,
            pull.pity_config.legendary_threshold
        )?;
    } else {
        writeln!(out, "Pity: {}", "disabled".dimmed())?;
    }
    writeln!(
        out,
        "Total pulls: {} · spend {:.2}",
        pull.total_pulls, pull.spend
    )?;
    if let Some(warning) = &pull.persistence_warning {
        writeln!(out, "⚠️  {}", warning.yellow())?;
    }
    Ok(())
}

fn console_tier_rows(out: &mut dyn Write, tiers: &[TierStats], observed: &str) -> Result<()> {
    writeln!(
        out,
        "  {:<14} {:>10} {:>10} {:>10} {:>7}",
        "Tier", "Count", observed, "Expected", "Luck"
    )?;
    for tier in tiers {
        writeln!(
            out,
            "  {:<14} {:>10} {:>10} {:>10} {:>7.2}",
            paint(&tier.name, &tier.color),
            tier.count,
            percent(tier.actual_rate),
            percent(tier.expected_rate),
            tier.luck_ratio()
        )?;
    }
    Ok(())
}

fn console_stats(out: &mut dyn Write, stats: &StatsReport) -> Result<()> {
    let summary = &stats.summary;
    writeln!(
        out,
        "{}",
        format!("📊 Session statistics ({})", stats.preset)
            .bright_cyan()
            .bold()
    )?;
    writeln!(out, "{}", "==========================".cyan())?;
    writeln!(out, "Total pulls: {}", summary.total_pulls)?;
    writeln!(out, "Total spend: {:.2}", summary.total_spend)?;
    writeln!(
        out,
        "Streaks: epic {} · legendary {}",
        summary.pity.epic, summary.pity.legendary
    )?;
    writeln!(out)?;
    console_tier_rows(out, &summary.breakdown.tiers, "Actual")?;
    if summary.breakdown.unmatched > 0 {
        writeln!(
            out,
            "{}",
            format!(
                "  {} draws belong to tiers outside {}",
                summary.breakdown.unmatched, stats.preset
            )
            .dimmed()
        )?;
    }
    Ok(())
}

fn console_calc(out: &mut dyn Write, calc: &CalcReport) -> Result<()> {
    writeln!(
        out,
        "🎯 Pulls for a {:.1}% chance of {} ({}) on {}: {}",
        calc.target_percent,
        calc.tier_name.bold(),
        percent(calc.weight),
        calc.preset,
        estimate_label(calc.estimate).bright_green().bold()
    )?;
    if let Some(cost) = calc.cost {
        writeln!(out, "   Estimated cost: {cost:.2}")?;
    }
    writeln!(
        out,
        "{}",
        "   Ignores pity guarantees; an upper bound when pity is on.".dimmed()
    )?;
    Ok(())
}

fn console_presets(out: &mut dyn Write, presets: &PresetsReport) -> Result<()> {
    for entry in &presets.presets {
        writeln!(out, "{}", entry.preset.to_string().bright_cyan().bold())?;
        for tier in &entry.tiers {
            let anchor = if tier.id == entry.legendary_anchor {
                "legendary anchor"
            } else if tier.id == entry.epic_anchor {
                "epic anchor"
            } else {
                ""
            };
            writeln!(
                out,
                "  {:<12} {:<10} {:>9}  {}",
                tier.id,
                paint(&tier.name, &tier.color),
                percent(tier.weight),
                anchor.dimmed()
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn console_simulation(out: &mut dyn Write, sim: &SimulationReport) -> Result<()> {
    writeln!(out, "{}", "🧪 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    for aggregate in &sim.aggregates {
        let pity = if aggregate.pity_enabled {
            "pity on".green()
        } else {
            "pity off".yellow()
        };
        writeln!(
            out,
            "{} · {} sessions · {} pulls · {}",
            aggregate.preset.to_string().bold(),
            aggregate.sessions,
            aggregate.total_pulls,
            pity
        )?;
        console_tier_rows(out, &aggregate.tiers, "Observed")?;
        writeln!(out, "  Chi-square: {:.3}", aggregate.chi_square)?;
        writeln!(
            out,
            "  Legendary per session: {:.2} ± {:.2}",
            aggregate.mean_legendary_per_session, aggregate.std_legendary_per_session
        )?;
        match aggregate.mean_pulls_to_first_legendary {
            Some(mean) => writeln!(out, "  Mean pulls to first legendary: {mean:.1}")?,
            None => writeln!(out, "  Mean pulls to first legendary: {}", "n/a".dimmed())?,
        }
        if aggregate.sessions_without_legendary > 0 {
            writeln!(
                out,
                "  Sessions without legendary: {}",
                aggregate.sessions_without_legendary.to_string().red()
            )?;
        }
        writeln!(
            out,
            "  Max legendary drought: {}",
            aggregate.max_legendary_drought
        )?;
        writeln!(
            out,
            "  Pity triggers: hard {} · soft {}",
            percent(aggregate.hard_pity_rate),
            percent(aggregate.soft_pity_rate)
        )?;
        writeln!(out, "  Total spend: {:.2}", aggregate.total_spend)?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    writeln!(out, "# Gacha Simulator Report\n")?;
    writeln!(out, "_Generated {}_\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
    match report {
        Report::Pull(pull) => {
            writeln!(out, "## Pulls on {}\n", pull.preset)?;
            writeln!(out, "| # | Item | Tier | Weight | Pity |")?;
            writeln!(out, "|---|------|------|--------|------|")?;
            for outcome in &pull.outcomes {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} |",
                    outcome.index,
                    outcome.item_label,
                    outcome.tier_id,
                    percent(outcome.weight),
                    trigger_label(outcome.pity)
                )?;
            }
            if let Some(best) = &pull.best {
                writeln!(out, "\n**Best of batch**: {} (#{})", best.item_label, best.index)?;
            }
            writeln!(out, "\n- **Total pulls**: {}", pull.total_pulls)?;
            writeln!(out, "- **Spend**: {:.2}", pull.spend)?;
            writeln!(
                out,
                "- **Streaks**: epic {}, legendary {}",
                pull.pity.epic, pull.pity.legendary
            )?;
        }
        Report::Stats(stats) => {
            writeln!(out, "## Statistics ({})\n", stats.preset)?;
            writeln!(out, "- **Total pulls**: {}", stats.summary.total_pulls)?;
            writeln!(out, "- **Total spend**: {:.2}", stats.summary.total_spend)?;
            writeln!(out, "- **Unmatched draws**: {}\n", stats.summary.breakdown.unmatched)?;
            markdown_tier_table(out, &stats.summary.breakdown.tiers)?;
        }
        Report::Calc(calc) => {
            writeln!(out, "## Pull calculator\n")?;
            writeln!(out, "- **Preset**: {}", calc.preset)?;
            writeln!(out, "- **Tier**: {} ({})", calc.tier_name, percent(calc.weight))?;
            writeln!(out, "- **Target**: {:.1}%", calc.target_percent)?;
            writeln!(out, "- **Pulls**: {}", estimate_label(calc.estimate))?;
            if let Some(cost) = calc.cost {
                writeln!(out, "- **Cost**: {cost:.2}")?;
            }
        }
        Report::Presets(presets) => {
            for entry in &presets.presets {
                writeln!(out, "## {}\n", entry.preset)?;
                writeln!(out, "| Tier | Name | Weight |")?;
                writeln!(out, "|------|------|--------|")?;
                for tier in &entry.tiers {
                    writeln!(out, "| {} | {} | {} |", tier.id, tier.name, percent(tier.weight))?;
                }
                writeln!(out)?;
            }
        }
        Report::Reset(reset) => {
            writeln!(out, "Session cleared in `{}`.", reset.state_dir)?;
        }
        Report::Simulation(sim) => {
            for aggregate in &sim.aggregates {
                writeln!(out, "## {} simulation\n", aggregate.preset)?;
                writeln!(out, "- **Sessions**: {}", aggregate.sessions)?;
                writeln!(out, "- **Pulls**: {}", aggregate.total_pulls)?;
                writeln!(out, "- **Pity**: {}", if aggregate.pity_enabled { "on" } else { "off" })?;
                writeln!(out, "- **Chi-square**: {:.3}", aggregate.chi_square)?;
                if let Some(mean) = aggregate.mean_pulls_to_first_legendary {
                    writeln!(out, "- **Mean pulls to first legendary**: {mean:.1}")?;
                }
                writeln!(
                    out,
                    "- **Max legendary drought**: {}\n",
                    aggregate.max_legendary_drought
                )?;
                markdown_tier_table(out, &aggregate.tiers)?;
            }
        }
    }
    Ok(())
}

fn markdown_tier_table(out: &mut dyn Write, tiers: &[TierStats]) -> Result<()> {
    writeln!(out, "| Tier | Count | Actual | Expected | Luck |")?;
    writeln!(out, "|------|-------|--------|----------|------|")?;
    for tier in tiers {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.2} |",
            tier.name,
            tier.count,
            percent(tier.actual_rate),
            percent(tier.expected_rate),
            tier.luck_ratio()
        )?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    match report {
        Report::Pull(pull) => {
            writeln!(out, "index,tier_id,tier_name,item_label,weight,preset,pity,timestamp")?;
            for o in &pull.outcomes {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{},{}",
                    o.index,
                    csv_field(&o.tier_id),
                    csv_field(&o.tier_name),
                    csv_field(&o.item_label),
                    o.weight,
                    o.preset,
                    trigger_code(o.pity),
                    o.timestamp
                )?;
            }
        }
        Report::Stats(stats) => {
            writeln!(out, "tier_id,name,count,actual_rate,expected_rate,luck_ratio")?;
            for tier in &stats.summary.breakdown.tiers {
                writeln!(
                    out,
                    "{},{},{},{:.6},{:.6},{:.4}",
                    csv_field(&tier.tier_id),
                    csv_field(&tier.name),
                    tier.count,
                    tier.actual_rate,
                    tier.expected_rate,
                    tier.luck_ratio()
                )?;
            }
        }
        Report::Calc(calc) => {
            writeln!(out, "preset,tier_id,weight,target_percent,pulls,cost")?;
            writeln!(
                out,
                "{},{},{},{},{},{}",
                calc.preset,
                csv_field(&calc.tier_id),
                calc.weight,
                calc.target_percent,
                calc.estimate.pulls().map_or_else(String::new, |n| n.to_string()),
                calc.cost.map_or_else(String::new, |c| format!("{c:.2}"))
            )?;
        }
        Report::Presets(presets) => {
            writeln!(out, "preset,rank,tier_id,name,weight,color")?;
            for entry in &presets.presets {
                for (rank, tier) in entry.tiers.iter().enumerate() {
                    writeln!(
                        out,
                        "{},{},{},{},{},{}",
                        entry.preset,
                        rank,
                        csv_field(&tier.id),
                        csv_field(&tier.name),
                        tier.weight,
                        csv_field(&tier.color)
                    )?;
                }
            }
        }
        Report::Reset(reset) => {
            writeln!(out, "state_dir")?;
            writeln!(out, "{}", csv_field(&reset.state_dir))?;
        }
        Report::Simulation(sim) => {
            writeln!(
                out,
                "preset,seed,pulls,legendary_hits,first_legendary,longest_drought,hard_pity_hits,soft_pity_hits,spend"
            )?;
            for record in &sim.sessions {
                writeln!(
                    out,
                    "{},{},{},{},{},{},{},{},{:.2}",
                    record.preset,
                    record.seed,
                    record.pulls,
                    record.legendary_hits,
                    record
                        .first_legendary
                        .map_or_else(String::new, |i| i.to_string()),
                    record.longest_drought,
                    record.hard_pity_hits,
                    record.soft_pity_hits,
                    record.spend
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gacha_engine::{
        EngineConfig, GachaSession, MemoryStorage, PresetCatalog, best_outcome, estimate_for_tier,
    };

    fn render(format: ReportFormat, report: &Report) -> String {
        let mut buffer = Vec::new();
        write_report(&mut buffer, format, report).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn pull_report() -> Report {
        let mut session =
            GachaSession::open_seeded(EngineConfig::default(), 5, MemoryStorage::new()).unwrap();
        let outcomes = session.pull(12).unwrap();
        let engine = session.engine();
        Report::Pull(PullReport {
            preset: engine.active_preset(),
            seed: 5,
            best: best_outcome(&outcomes).cloned(),
            outcomes,
            total_pulls: engine.pull_count(),
            pity: engine.pity_counter(),
            pity_config: engine.pity_config(),
            spend: 24.0,
            persistence_warning: None,
        })
    }

    #[test]
    fn json_report_is_tagged_by_kind() {
        let text = render(ReportFormat::Json, &pull_report());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["report"], "pull");
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 12);
        assert_eq!(value["total_pulls"], 12);
        assert_eq!(value["preset"], "STANDARD");
    }

    #[test]
    fn csv_pull_report_has_row_per_draw() {
        let text = render(ReportFormat::Csv, &pull_report());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("index,tier_id"));
        assert!(lines[1].starts_with("1,"));
    }

    #[test]
    fn calc_reports_unbounded_as_na() {
        let catalog = PresetCatalog::builtin();
        let table = catalog.table(PresetId::Standard).unwrap();
        let estimate = estimate_for_tier(table, "legendary", 100.0).unwrap();
        let report = Report::Calc(CalcReport {
            preset: PresetId::Standard,
            tier_id: "legendary".into(),
            tier_name: "Legendary".into(),
            weight: 0.013,
            target_percent: 100.0,
            estimate,
            cost: estimate.cost(2.0),
        });
        assert!(render(ReportFormat::Markdown, &report).contains("N/A"));
        let csv = render(ReportFormat::Csv, &report);
        assert_eq!(csv.lines().nth(1), Some("STANDARD,legendary,0.013,100,,"));
        let json: serde_json::Value =
            serde_json::from_str(&render(ReportFormat::Json, &report)).unwrap();
        assert_eq!(json["estimate"]["kind"], "unbounded");
    }

    #[test]
    fn presets_report_lists_rarest_first_with_anchors() {
        let report = PresetsReport::from_catalog(&PresetCatalog::builtin());
        assert_eq!(report.presets.len(), 3);
        let standard = &report.presets[0];
        assert_eq!(standard.preset, PresetId::Standard);
        assert_eq!(standard.tiers[0].id, "mythic");
        assert_eq!(standard.legendary_anchor, "legendary");
        let text = render(ReportFormat::Console, &Report::Presets(report));
        assert!(text.contains("legendary anchor"));
        assert!(text.contains("PREDATORY"));
    }

    #[test]
    fn stats_json_flattens_summary() {
        let session =
            GachaSession::open_seeded(EngineConfig::default(), 1, MemoryStorage::new()).unwrap();
        let report = Report::Stats(StatsReport {
            preset: PresetId::Standard,
            summary: session.stats(),
        });
        let json: serde_json::Value =
            serde_json::from_str(&render(ReportFormat::Json, &report)).unwrap();
        assert_eq!(json["report"], "stats");
        assert_eq!(json["total_pulls"], 0);
        assert_eq!(json["breakdown"]["tiers"].as_array().unwrap().len(), 6);
    }
}
