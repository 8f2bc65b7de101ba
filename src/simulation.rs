//! The stepper: owns the world and advances every robot one tick at a time.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::SimConfig;
use crate::error::{ConfigError, SimResult};
use crate::grid::{Grid, gate_rows};
use crate::heuristic::Heuristic;
use crate::message_board::MessageBoard;
use crate::monitor::{Outcome, TerminationMonitor};
use crate::pathfinder::PathMode;
use crate::robot::{RobotAgent, RobotState, TickContext};
use crate::task_pool::TaskPools;
use crate::types::{Color, ColorCounts, Position, RobotId, WasteId};
use crate::waste::{WasteLocation, WasteRegistry};

/// Explicit placement used instead of random setup.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioLayout {
    pub disposal: Position,
    pub robots: Vec<(Color, Position)>,
    pub waste: Vec<(Color, Position)>,
}

/// Observable state returned by every `step()` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    pub step: u64,
    pub running: bool,
    pub finished: Option<Outcome>,
    pub remaining: ColorCounts,
    pub total_distance: f64,
    pub delivered: u64,
}

/// Cumulative run metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    pub steps: u64,
    pub total_distance: f64,
    pub delivered: u64,
    pub conversions: u64,
    pub remaining: ColorCounts,
    pub robot_distance: Vec<(RobotId, f64)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WasteView {
    pub id: WasteId,
    pub color: Color,
    pub position: Option<Position>,
    pub carried_by: Option<RobotId>,
    pub claimed_by: Option<RobotId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RobotView {
    pub id: RobotId,
    pub color: Color,
    pub position: Position,
    pub state: RobotState,
    pub carrying: Vec<WasteId>,
    pub distance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupant {
    Wall,
    Disposal,
    Waste { id: WasteId, color: Color },
    Robot { id: RobotId, color: Color },
}

/// Read-only picture of the world at a tick boundary, for renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub step: u64,
    pub width: usize,
    pub height: usize,
    pub disposal: Position,
    pub walls: Vec<Position>,
    pub gates: Vec<usize>,
    /// Row-major, `y * width + x`.
    pub radioactivity: Vec<f64>,
    pub waste: Vec<WasteView>,
    pub robots: Vec<RobotView>,
    pub remaining: ColorCounts,
    pub running: bool,
    pub finished: Option<Outcome>,
}

impl SimulationSnapshot {
    /// Everything on one cell: wall or disposal first, then waste, then robots.
    pub fn occupants_at(&self, pos: Position) -> Vec<Occupant> {
        let mut out = Vec::new();
        if self.walls.contains(&pos) {
            out.push(Occupant::Wall);
        }
        if self.disposal == pos {
            out.push(Occupant::Disposal);
        }
        out.extend(
            self.waste
                .iter()
                .filter(|w| w.position == Some(pos))
                .map(|w| Occupant::Waste {
                    id: w.id,
                    color: w.color,
                }),
        );
        out.extend(
            self.robots
                .iter()
                .filter(|r| r.position == pos)
                .map(|r| Occupant::Robot {
                    id: r.id,
                    color: r.color,
                }),
        );
        out
    }

    pub fn radioactivity_at(&self, pos: Position) -> Option<f64> {
        if pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        self.radioactivity.get(pos.y * self.width + pos.x).copied()
    }
}

pub struct Simulation {
    config: SimConfig,
    heuristic: Heuristic,
    grid: Grid,
    registry: WasteRegistry,
    pools: Arc<TaskPools>,
    board: MessageBoard,
    robots: Vec<RobotAgent>,
    monitor: TerminationMonitor,
    rng: ChaCha8Rng,
    step: u64,
    finished: Option<Outcome>,
    history: Vec<ColorCounts>,
}

fn build_grid(config: &SimConfig, heuristic: Heuristic, disposal: Position) -> Grid {
    match heuristic.path_mode() {
        PathMode::AStar => Grid::walled(
            config.width,
            config.height,
            &gate_rows(config.height, config.gates_per_wall),
            disposal,
        ),
        PathMode::Greedy => Grid::open(config.width, config.height, disposal),
    }
}

/// Highest zone a robot of this color starts in.
fn home_zone_limit(color: Color) -> u8 {
    match color {
        Color::Green => 1,
        Color::Yellow => 2,
        Color::Red => 3,
    }
}

impl Simulation {
    /// Build a randomly placed world from `config`.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        let heuristic = config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let disposal = Position::new(config.width - 1, rng.gen_range(0..config.height));
        let mut grid = build_grid(&config, heuristic, disposal);
        grid.assign_radioactivity(&mut rng);

        let pools = Arc::new(TaskPools::new());
        let mut registry = WasteRegistry::new();
        registry.spawn_initial(config.waste, &grid, &pools, &mut rng)?;

        let mut robots = Vec::with_capacity(config.robots.total());
        for color in Color::ALL {
            let limit = home_zone_limit(color);
            let home: Vec<Position> = grid
                .cells()
                .filter(|&pos| !grid.is_blocked(pos) && grid.zone_of(pos).id <= limit)
                .collect();
            for _ in 0..config.robots.get(color) {
                let Some(&pos) = home.choose(&mut rng) else {
                    break;
                };
                robots.push(RobotAgent::new(robots.len() as RobotId, color, pos));
            }
        }

        tracing::info!(
            width = config.width,
            height = config.height,
            robots = robots.len(),
            waste = config.waste.total(),
            heuristic = %heuristic,
            seed = config.seed,
            "simulation initialized"
        );
        Ok(Self::assemble(config, heuristic, grid, registry, pools, robots, rng))
    }

    /// Build a world with explicit disposal, robot, and waste placement.
    pub fn with_layout(config: SimConfig, layout: ScenarioLayout) -> SimResult<Self> {
        let heuristic = config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut grid = build_grid(&config, heuristic, layout.disposal);
        let check = |pos: Position, what: &str| -> SimResult<()> {
            if !grid.in_bounds(pos) {
                return Err(ConfigError::InvalidLayout {
                    position: pos,
                    reason: format!("{what} out of bounds"),
                });
            }
            if grid.is_blocked(pos) {
                return Err(ConfigError::InvalidLayout {
                    position: pos,
                    reason: format!("{what} on a wall"),
                });
            }
            Ok(())
        };
        check(layout.disposal, "disposal point")?;
        for &(_, pos) in &layout.robots {
            check(pos, "robot")?;
        }
        for &(_, pos) in &layout.waste {
            check(pos, "waste")?;
            if pos == layout.disposal {
                return Err(ConfigError::InvalidLayout {
                    position: pos,
                    reason: "waste on the disposal point".to_string(),
                });
            }
        }
        grid.assign_radioactivity(&mut rng);

        let pools = Arc::new(TaskPools::new());
        let mut registry = WasteRegistry::new();
        for &(color, pos) in &layout.waste {
            registry.spawn_at(color, pos, &pools);
        }
        let robots = layout
            .robots
            .iter()
            .enumerate()
            .map(|(id, &(color, pos))| RobotAgent::new(id as RobotId, color, pos))
            .collect();
        Ok(Self::assemble(config, heuristic, grid, registry, pools, robots, rng))
    }

    fn assemble(
        config: SimConfig,
        heuristic: Heuristic,
        grid: Grid,
        registry: WasteRegistry,
        pools: Arc<TaskPools>,
        robots: Vec<RobotAgent>,
        rng: ChaCha8Rng,
    ) -> Self {
        let history = vec![registry.counts()];
        Self {
            board: MessageBoard::new(config.message_board_capacity),
            monitor: TerminationMonitor::new(config.max_steps),
            config,
            heuristic,
            grid,
            registry,
            pools,
            robots,
            rng,
            step: 0,
            finished: None,
            history,
        }
    }

    /// Check termination, then let every robot act once in seeded-shuffle order.
    pub fn step(&mut self) -> StepReport {
        if self.finished.is_some() {
            return self.report();
        }
        if let Some(outcome) = self.monitor.check(self.registry.counts(), self.step) {
            self.finish(outcome);
            return self.report();
        }

        self.step += 1;
        self.board.begin_step(self.step);
        let positions: Vec<(RobotId, Position)> =
            self.robots.iter().map(|r| (r.id, r.position)).collect();
        let mut order: Vec<usize> = (0..self.robots.len()).collect();
        order.shuffle(&mut self.rng);

        let mut ctx = TickContext {
            grid: &self.grid,
            registry: &mut self.registry,
            pools: self.pools.as_ref(),
            board: &mut self.board,
            rng: &mut self.rng,
            positions: &positions,
            selection: self.heuristic.selection(),
            path_mode: self.heuristic.path_mode(),
            scope: self.config.candidate_scope,
        };
        for index in order {
            self.robots[index].act(&mut ctx);
        }
        debug_assert!(self.pools.is_consistent(), "waste both pooled and claimed");

        self.history.push(self.registry.counts());
        self.report()
    }

    /// Step until the monitor ends the run.
    pub fn run_to_end(&mut self) -> Outcome {
        loop {
            if let Some(outcome) = self.step().finished {
                return outcome;
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.finished = Some(outcome);
        tracing::info!(
            outcome = %outcome,
            steps = self.step,
            delivered = self.registry.delivered(),
            total_distance = self.total_distance(),
            "simulation finished"
        );
    }

    fn report(&self) -> StepReport {
        StepReport {
            step: self.step,
            running: self.is_running(),
            finished: self.finished,
            remaining: self.registry.counts(),
            total_distance: self.total_distance(),
            delivered: self.registry.delivered(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.finished.is_none()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.finished
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    pub fn total_distance(&self) -> f64 {
        self.robots.iter().map(|r| r.distance).sum()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            steps: self.step,
            total_distance: self.total_distance(),
            delivered: self.registry.delivered(),
            conversions: self.registry.conversions(),
            remaining: self.registry.counts(),
            robot_distance: self.robots.iter().map(|r| (r.id, r.distance)).collect(),
        }
    }

    /// Remaining waste per color: index 0 is setup, index `t` is after tick `t`.
    pub fn history(&self) -> &[ColorCounts] {
        &self.history
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn robots(&self) -> &[RobotAgent] {
        &self.robots
    }

    pub fn registry(&self) -> &WasteRegistry {
        &self.registry
    }

    pub fn board(&self) -> &MessageBoard {
        &self.board
    }

    /// Shared handle to the claim table, for observers on other threads.
    pub fn task_pools(&self) -> Arc<TaskPools> {
        Arc::clone(&self.pools)
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let waste = self
            .registry
            .units()
            .map(|unit| {
                let (position, carried_by) = match unit.location {
                    WasteLocation::Ground(pos) => (Some(pos), None),
                    WasteLocation::Carried(robot) => (None, Some(robot)),
                };
                WasteView {
                    id: unit.id,
                    color: unit.color,
                    position,
                    carried_by,
                    claimed_by: self.pools.claimant(unit.id),
                }
            })
            .collect();
        let robots = self
            .robots
            .iter()
            .map(|r| RobotView {
                id: r.id,
                color: r.color,
                position: r.position,
                state: r.state,
                carrying: r.carrying.clone(),
                distance: r.distance,
            })
            .collect();
        SimulationSnapshot {
            step: self.step,
            width: self.grid.width(),
            height: self.grid.height(),
            disposal: self.grid.disposal(),
            walls: self.grid.walls(),
            gates: self.grid.gates().to_vec(),
            radioactivity: self.grid.radioactivity_map().to_vec(),
            waste,
            robots,
            remaining: self.registry.counts(),
            running: self.is_running(),
            finished: self.finished,
        }
    }
}
