//! Single-run and parameter-sweep drivers with CSV output.

use std::io::Write;

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::heuristic::Heuristic;
use crate::monitor::Outcome;
use crate::simulation::Simulation;
use crate::types::ColorCounts;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Result of one simulation run to completion.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub heuristic: Heuristic,
    pub outcome: Outcome,
    pub steps: u64,
    pub total_distance: f64,
    pub delivered: u64,
    pub conversions: u64,
    pub remaining: ColorCounts,
}

pub fn run_single(config: SimConfig) -> SimResult<RunSummary> {
    let mut sim = Simulation::new(config)?;
    let outcome = sim.run_to_end();
    let metrics = sim.metrics();
    Ok(RunSummary {
        heuristic: sim.heuristic(),
        outcome,
        steps: metrics.steps,
        total_distance: metrics.total_distance,
        delivered: metrics.delivered,
        conversions: metrics.conversions,
        remaining: metrics.remaining,
    })
}

/// Print a single run as `key=value` lines.
pub fn write_summary<W: Write>(
    out: &mut W,
    config: &SimConfig,
    summary: &RunSummary,
) -> SimResult<()> {
    writeln!(out, "RUN SUMMARY")?;
    writeln!(out, "heuristic={}", summary.heuristic)?;
    writeln!(out, "grid={}x{}", config.width, config.height)?;
    writeln!(
        out,
        "robots={},{},{}",
        config.robots.green, config.robots.yellow, config.robots.red
    )?;
    writeln!(out, "outcome={}", summary.outcome)?;
    writeln!(out, "steps={}", summary.steps)?;
    writeln!(out, "total_distance={:.2}", summary.total_distance)?;
    writeln!(out, "delivered={}", summary.delivered)?;
    writeln!(out, "conversions={}", summary.conversions)?;
    writeln!(
        out,
        "remaining={},{},{}",
        summary.remaining.green, summary.remaining.yellow, summary.remaining.red
    )?;
    Ok(())
}

/// Grid of configurations: heuristic x robots-per-color x waste-per-color.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepPlan {
    pub heuristics: Vec<String>,
    pub robot_sets: Vec<usize>,
    pub waste_sets: Vec<usize>,
    pub runs: usize,
    /// Everything else (grid size, step cap, seed, scope) comes from here.
    pub base: SimConfig,
}

impl Default for SweepPlan {
    fn default() -> Self {
        Self {
            heuristics: vec![
                "closest".to_string(),
                "random".to_string(),
                "min_total_distance".to_string(),
            ],
            robot_sets: vec![1, 2, 4],
            waste_sets: vec![4, 8, 16],
            runs: 10,
            base: SimConfig::default(),
        }
    }
}

/// Averages over the repetitions of one sweep cell.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepRow {
    pub heuristic: String,
    pub robots: usize,
    pub waste: usize,
    pub mean_steps: f64,
    pub mean_distance: f64,
    pub mean_delivered: f64,
    pub win_rate: f64,
    pub game_over_rate: f64,
    pub timeout_rate: f64,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
}

pub const SWEEP_HEADER: &str = "heuristic,num_green,num_yellow,num_red,green_waste,yellow_waste,red_waste,steps_to_finish,total_distance_traveled,delivered_waste,win_rate,game_over_rate,timeout_rate,cpu_user_s,cpu_sys_s";

impl SweepRow {
    pub fn to_csv(&self) -> String {
        let cpu_user = self
            .cpu_user_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let cpu_sys = self
            .cpu_sys_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        format!(
            "{},{r},{r},{r},{w},{w},{w},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{},{}",
            self.heuristic,
            self.mean_steps,
            self.mean_distance,
            self.mean_delivered,
            self.win_rate,
            self.game_over_rate,
            self.timeout_rate,
            cpu_user,
            cpu_sys,
            r = self.robots,
            w = self.waste,
        )
    }
}

/// Run `plan.runs` seeded repetitions of one configuration.
pub fn sweep_once(
    plan: &SweepPlan,
    heuristic: &str,
    robots: usize,
    waste: usize,
) -> SimResult<SweepRow> {
    let runs = plan.runs.max(1);
    let mut steps = 0.0;
    let mut distance = 0.0;
    let mut delivered = 0.0;
    let (mut wins, mut game_overs, mut timeouts) = (0usize, 0usize, 0usize);

    let cpu_start = cpu_times_seconds();
    for rep in 0..runs {
        let config = SimConfig {
            heuristic: heuristic.to_string(),
            robots: ColorCounts::uniform(robots),
            waste: ColorCounts::uniform(waste),
            seed: plan.base.seed.wrapping_add(rep as u64),
            ..plan.base.clone()
        };
        let summary = run_single(config)?;
        steps += summary.steps as f64;
        distance += summary.total_distance;
        delivered += summary.delivered as f64;
        match summary.outcome {
            Outcome::Win => wins += 1,
            Outcome::GameOver => game_overs += 1,
            Outcome::Timeout => timeouts += 1,
        }
    }
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    let n = runs as f64;
    Ok(SweepRow {
        heuristic: heuristic.to_string(),
        robots,
        waste,
        mean_steps: steps / n,
        mean_distance: distance / n,
        mean_delivered: delivered / n,
        win_rate: wins as f64 / n,
        game_over_rate: game_overs as f64 / n,
        timeout_rate: timeouts as f64 / n,
        cpu_user_s,
        cpu_sys_s,
    })
}

/// Sweep every combination in `plan`, writing one CSV row per combination.
pub fn run_sweep<W: Write>(plan: &SweepPlan, out: &mut W) -> SimResult<Vec<SweepRow>> {
    // Reject bad names before any run starts.
    for name in &plan.heuristics {
        name.parse::<Heuristic>()?;
    }
    writeln!(out, "{SWEEP_HEADER}")?;
    let mut rows = Vec::new();
    for heuristic in &plan.heuristics {
        for &robots in &plan.robot_sets {
            for &waste in &plan.waste_sets {
                tracing::info!(heuristic = %heuristic, robots, waste, "sweep cell");
                let row = sweep_once(plan, heuristic, robots, waste)?;
                writeln!(out, "{}", row.to_csv())?;
                rows.push(row);
            }
        }
    }
    Ok(rows)
}
