//! Robot agent state machine: perceive, select, claim, move, act.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::CandidateScope;
use crate::grid::Grid;
use crate::heuristic::{Candidate, Selection, select_target};
use crate::log_dev;
use crate::message_board::{MessageBoard, MessageKind};
use crate::pathfinder::{PathMode, StepOutcome, next_step};
use crate::perception::{Perception, perceive};
use crate::task_pool::TaskPools;
use crate::types::{Capability, Color, Position, RobotId, WasteId};
use crate::waste::{WasteRegistry, WasteUnit};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Waste(WasteId),
    Disposal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Collect(WasteId),
    Deliver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotState {
    Idle,
    Seeking,
    EnRoute(Goal),
    Acting(Action),
}

/// Everything a robot may touch while acting; rebuilt by the stepper each tick.
pub struct TickContext<'a, R: Rng> {
    pub grid: &'a Grid,
    pub registry: &'a mut WasteRegistry,
    pub pools: &'a TaskPools,
    pub board: &'a mut MessageBoard,
    pub rng: &'a mut R,
    /// Robot positions as of the start of the tick.
    pub positions: &'a [(RobotId, Position)],
    pub selection: Selection,
    pub path_mode: PathMode,
    pub scope: CandidateScope,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RobotAgent {
    pub id: RobotId,
    pub color: Color,
    pub position: Position,
    pub carrying: Vec<WasteId>,
    pub state: RobotState,
    pub distance: f64,
    /// Last unit this robot put down unmerged; skipped until it collects another.
    abandoned: Option<WasteId>,
    /// Consecutive seeks that found no candidate.
    idle_ticks: u32,
}

/// Fruitless seeks tolerated before a partial load is put back on the ground.
fn abandon_after(scope: CandidateScope) -> u32 {
    match scope {
        CandidateScope::Pool => 1,
        CandidateScope::Perceived => 12,
    }
}

impl RobotAgent {
    pub fn new(id: RobotId, color: Color, position: Position) -> Self {
        Self {
            id,
            color,
            position,
            carrying: Vec::new(),
            state: RobotState::Idle,
            distance: 0.0,
            abandoned: None,
            idle_ticks: 0,
        }
    }

    pub fn capability(&self) -> Capability {
        Capability::of(self.color)
    }

    /// The waste unit this robot has claimed but not yet picked up.
    pub fn assigned(&self) -> Option<WasteId> {
        match self.state {
            RobotState::EnRoute(Goal::Waste(id)) | RobotState::Acting(Action::Collect(id)) => {
                Some(id)
            }
            _ => None,
        }
    }

    /// Advance this robot by one tick.
    pub fn act<R: Rng>(&mut self, ctx: &mut TickContext<'_, R>) {
        match self.state {
            RobotState::Acting(action) => {
                self.perform(action, ctx);
                self.state = RobotState::Idle;
            }
            RobotState::EnRoute(goal) => self.advance(goal, ctx),
            RobotState::Idle | RobotState::Seeking => self.seek(ctx),
        }
    }

    fn seek<R: Rng>(&mut self, ctx: &mut TickContext<'_, R>) {
        let cap = self.capability();
        if cap.delivers && !self.carrying.is_empty() {
            self.state = RobotState::EnRoute(Goal::Disposal);
            self.advance(Goal::Disposal, ctx);
            return;
        }
        if cap.produces.is_some() && self.carrying.len() >= cap.capacity {
            self.convert(ctx);
            return;
        }

        let perception = perceive(ctx.grid, ctx.registry, ctx.positions, self.id, self.position);
        let candidates = self.candidates(&perception, ctx);
        if candidates.is_empty() {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
            if self.holds_partial_load() && self.idle_ticks >= abandon_after(ctx.scope) {
                self.abandon_load(ctx);
            }
            if ctx.scope == CandidateScope::Perceived {
                self.wander(&perception, ctx);
            }
            return;
        }

        self.idle_ticks = 0;
        self.state = RobotState::Seeking;
        let goal = ctx.grid.disposal();
        let Some(target) = select_target(ctx.selection, &candidates, self.position, goal, ctx.rng)
        else {
            self.state = RobotState::Idle;
            return;
        };
        if ctx.pools.claim_target(cap.collects, target, self.id) {
            ctx.board.post(self.id, MessageKind::Claimed(target));
            log_dev!(
                "[{}] robot {} at {} claimed waste {target}",
                self.color,
                self.id,
                self.position
            );
            self.state = RobotState::EnRoute(Goal::Waste(target));
            self.advance(Goal::Waste(target), ctx);
        } else {
            tracing::debug!(robot = self.id, waste = target, "lost claim race");
            self.state = RobotState::Idle;
        }
    }

    fn candidates<R: Rng>(
        &self,
        perception: &Perception,
        ctx: &TickContext<'_, R>,
    ) -> Vec<Candidate> {
        let color = self.capability().collects;
        let found: Vec<Candidate> = match ctx.scope {
            CandidateScope::Perceived => perception
                .waste_of(color)
                .filter(|w| ctx.pools.is_unclaimed(color, w.id))
                .map(|w| Candidate {
                    id: w.id,
                    position: w.position,
                })
                .collect(),
            CandidateScope::Pool => ctx
                .pools
                .unclaimed(color)
                .into_iter()
                .filter_map(|id| {
                    let position = ctx.registry.get(id).and_then(WasteUnit::ground_position)?;
                    Some(Candidate { id, position })
                })
                .collect(),
        };
        found
            .into_iter()
            .filter(|c| Some(c.id) != self.abandoned)
            .filter(|c| !ctx.board.claimed_by_other(c.id, self.id))
            .collect()
    }

    fn holds_partial_load(&self) -> bool {
        let cap = self.capability();
        cap.produces.is_some() && !self.carrying.is_empty() && self.carrying.len() < cap.capacity
    }

    /// Put the carried units back on this cell and return them to the pool.
    fn abandon_load<R: Rng>(&mut self, ctx: &mut TickContext<'_, R>) {
        if self.position == ctx.grid.disposal() {
            return;
        }
        for id in std::mem::take(&mut self.carrying) {
            if ctx.registry.put_down(self.id, self.position, id, ctx.pools) {
                log_dev!(
                    "[{}] robot {} put down waste {id} at {}",
                    self.color,
                    self.id,
                    self.position
                );
                ctx.board.post(self.id, MessageKind::Released(id));
                self.abandoned = Some(id);
            } else {
                self.carrying.push(id);
            }
        }
        self.idle_ticks = 0;
    }

    fn advance<R: Rng>(&mut self, goal: Goal, ctx: &mut TickContext<'_, R>) {
        let target = match goal {
            Goal::Waste(id) => match ctx.registry.get(id).and_then(WasteUnit::ground_position) {
                Some(pos) => pos,
                None => {
                    // Unit left the ground; its claim went with it.
                    self.state = RobotState::Idle;
                    return;
                }
            },
            Goal::Disposal => ctx.grid.disposal(),
        };
        let arrival = match goal {
            Goal::Waste(id) => RobotState::Acting(Action::Collect(id)),
            Goal::Disposal => RobotState::Acting(Action::Deliver),
        };

        match next_step(ctx.path_mode, ctx.grid, self.position, target) {
            StepOutcome::Arrived => self.state = arrival,
            StepOutcome::Moved(next) => {
                self.distance += self.position.step_length(next);
                self.position = next;
                if next == target {
                    self.state = arrival;
                }
            }
            StepOutcome::Blocked => {}
            StepOutcome::Unreachable => {
                if let Goal::Waste(id) = goal {
                    tracing::debug!(robot = self.id, waste = id, "target unreachable, releasing");
                    if ctx.pools.release(id, self.id) {
                        ctx.board.post(self.id, MessageKind::Released(id));
                    }
                    self.state = RobotState::Idle;
                }
            }
        }
    }

    fn perform<R: Rng>(&mut self, action: Action, ctx: &mut TickContext<'_, R>) {
        match action {
            Action::Collect(id) => {
                if ctx.registry.pick_up(self.id, self.position, id, ctx.pools) {
                    log_dev!(
                        "[{}] robot {} picked up waste {id} at {}",
                        self.color,
                        self.id,
                        self.position
                    );
                    self.carrying.push(id);
                    self.abandoned = None;
                } else if ctx.pools.release(id, self.id) {
                    ctx.board.post(self.id, MessageKind::Released(id));
                }
            }
            Action::Deliver => {
                let Some(&id) = self.carrying.first() else {
                    return;
                };
                if ctx
                    .registry
                    .deliver(self.id, self.position, id, ctx.grid, ctx.pools)
                {
                    log_dev!("[{}] robot {} delivered waste {id}", self.color, self.id);
                    self.carrying.retain(|&carried| carried != id);
                    ctx.board.post(self.id, MessageKind::Delivered(id));
                }
            }
        }
    }

    fn convert<R: Rng>(&mut self, ctx: &mut TickContext<'_, R>) {
        let (a, b) = (self.carrying[0], self.carrying[1]);
        if let Some(produced) = ctx.registry.convert(self.id, self.position, a, b, ctx.pools) {
            log_dev!(
                "[{}] robot {} merged {a}+{b} into {produced} at {}",
                self.color,
                self.id,
                self.position
            );
            self.carrying.drain(..2);
            ctx.board.post(
                self.id,
                MessageKind::Converted {
                    produced,
                    at: self.position,
                },
            );
        }
        self.state = RobotState::Idle;
    }

    /// Random unblocked Moore step, avoiding cells with a visible robot when possible.
    fn wander<R: Rng>(&mut self, perception: &Perception, ctx: &mut TickContext<'_, R>) {
        let open: Vec<Position> = ctx
            .grid
            .neighbors_moore(self.position)
            .into_iter()
            .filter(|&pos| !ctx.grid.is_blocked(pos))
            .collect();
        let free: Vec<Position> = open
            .iter()
            .copied()
            .filter(|&pos| !perception.robot_at(pos))
            .collect();
        let pool = if free.is_empty() { &open } else { &free };
        if let Some(&next) = pool.choose(ctx.rng) {
            self.distance += self.position.step_length(next);
            self.position = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorCounts;
    use crate::waste::WasteLocation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct World {
        grid: Grid,
        registry: WasteRegistry,
        pools: TaskPools,
        board: MessageBoard,
        rng: ChaCha8Rng,
    }

    impl World {
        fn new(grid: Grid) -> Self {
            Self {
                grid,
                registry: WasteRegistry::new(),
                pools: TaskPools::new(),
                board: MessageBoard::new(64),
                rng: ChaCha8Rng::seed_from_u64(3),
            }
        }

        fn tick(&mut self, robot: &mut RobotAgent, scope: CandidateScope, mode: PathMode) {
            let positions = [(robot.id, robot.position)];
            let mut ctx = TickContext {
                grid: &self.grid,
                registry: &mut self.registry,
                pools: &self.pools,
                board: &mut self.board,
                rng: &mut self.rng,
                positions: &positions,
                selection: Selection::Closest,
                path_mode: mode,
                scope,
            };
            robot.act(&mut ctx);
        }

        fn tick_all(&mut self, robots: &mut [RobotAgent], scope: CandidateScope) {
            let positions: Vec<(RobotId, Position)> =
                robots.iter().map(|r| (r.id, r.position)).collect();
            let mut ctx = TickContext {
                grid: &self.grid,
                registry: &mut self.registry,
                pools: &self.pools,
                board: &mut self.board,
                rng: &mut self.rng,
                positions: &positions,
                selection: Selection::Closest,
                path_mode: PathMode::Greedy,
                scope,
            };
            for robot in robots.iter_mut() {
                robot.act(&mut ctx);
            }
        }

        /// Claim and pick up `id` for `robot`, as if it had already collected it.
        fn load(&mut self, robot: &mut RobotAgent, id: WasteId) {
            let color = self.registry.get(id).expect("live").color;
            assert!(self.pools.claim_target(color, id, robot.id));
            assert!(self.registry.pick_up(robot.id, robot.position, id, &self.pools));
            robot.carrying.push(id);
        }
    }

    #[test]
    fn green_robot_collects_two_and_converts() {
        let mut world = World::new(Grid::open(4, 4, Position::new(3, 0)));
        let far = world.registry.spawn_at(Color::Green, Position::new(0, 0), &world.pools);
        let near = world.registry.spawn_at(Color::Green, Position::new(0, 1), &world.pools);
        let mut robot = RobotAgent::new(0, Color::Green, Position::new(3, 3));

        world.tick(&mut robot, CandidateScope::Pool, PathMode::Greedy);
        assert_eq!(robot.state, RobotState::EnRoute(Goal::Waste(near)));
        assert_eq!(robot.assigned(), Some(near));
        assert_eq!(robot.position, Position::new(2, 2));

        for _ in 0..12 {
            world.tick(&mut robot, CandidateScope::Pool, PathMode::Greedy);
            if world.registry.conversions() == 1 {
                break;
            }
        }
        assert_eq!(world.registry.conversions(), 1);
        assert!(robot.carrying.is_empty());
        assert_eq!(robot.position, Position::new(0, 0));
        assert_eq!(world.registry.get(far), None);
        let expected = 2.0 * std::f64::consts::SQRT_2 + 2.0;
        assert!((robot.distance - expected).abs() < 1e-9);
    }

    #[test]
    fn red_robot_delivers_to_disposal() {
        let mut world = World::new(Grid::open(5, 5, Position::new(4, 2)));
        world.registry.spawn_at(Color::Red, Position::new(1, 2), &world.pools);
        let mut robot = RobotAgent::new(1, Color::Red, Position::new(0, 2));
        for _ in 0..20 {
            world.tick(&mut robot, CandidateScope::Pool, PathMode::Greedy);
        }
        assert_eq!(world.registry.delivered(), 1);
        assert!(world.registry.is_empty());
        assert_eq!(robot.position, Position::new(4, 2));
        assert_eq!(robot.state, RobotState::Idle);
    }

    #[test]
    fn idle_without_candidates_in_pool_scope() {
        let mut world = World::new(Grid::open(5, 5, Position::new(4, 2)));
        world.registry.spawn_at(Color::Green, Position::new(1, 1), &world.pools);
        let mut robot = RobotAgent::new(2, Color::Yellow, Position::new(3, 3));
        world.tick(&mut robot, CandidateScope::Pool, PathMode::Greedy);
        assert_eq!(robot.state, RobotState::Idle);
        assert_eq!(robot.position, Position::new(3, 3));
        assert_eq!(robot.distance, 0.0);
    }

    #[test]
    fn perceived_scope_ignores_distant_waste_and_wanders() {
        let mut world = World::new(Grid::open(10, 10, Position::new(9, 0)));
        let far = world.registry.spawn_at(Color::Green, Position::new(9, 9), &world.pools);
        let mut robot = RobotAgent::new(0, Color::Green, Position::new(1, 1));
        world.tick(&mut robot, CandidateScope::Perceived, PathMode::Greedy);
        assert_eq!(robot.assigned(), None);
        assert!(world.pools.is_unclaimed(Color::Green, far));
        assert_ne!(robot.position, Position::new(1, 1));
        assert!(robot.distance > 0.0);
    }

    #[test]
    fn perceived_scope_claims_adjacent_waste() {
        let mut world = World::new(Grid::open(10, 10, Position::new(9, 0)));
        let near = world.registry.spawn_at(Color::Green, Position::new(2, 2), &world.pools);
        let mut robot = RobotAgent::new(0, Color::Green, Position::new(1, 1));
        world.tick(&mut robot, CandidateScope::Perceived, PathMode::Greedy);
        assert_eq!(robot.state, RobotState::Acting(Action::Collect(near)));
        assert_eq!(world.pools.claimant(near), Some(0));
    }

    #[test]
    fn claims_announced_on_board_are_skipped() {
        let mut world = World::new(Grid::open(5, 5, Position::new(4, 2)));
        let id = world.registry.spawn_at(Color::Green, Position::new(1, 1), &world.pools);
        // Another robot announced the claim this step but the pool still lists it.
        world.board.post(9, MessageKind::Claimed(id));
        let mut robot = RobotAgent::new(0, Color::Green, Position::new(3, 3));
        world.tick(&mut robot, CandidateScope::Pool, PathMode::Greedy);
        assert_eq!(robot.state, RobotState::Idle);
        assert_eq!(robot.distance, 0.0);
    }

    #[test]
    fn split_partial_loads_are_pooled_and_merged() {
        let mut world = World::new(Grid::open(6, 6, Position::new(5, 0)));
        let a = world.registry.spawn_at(Color::Green, Position::new(0, 0), &world.pools);
        let b = world.registry.spawn_at(Color::Green, Position::new(4, 4), &world.pools);
        let mut robots = [
            RobotAgent::new(0, Color::Green, Position::new(0, 0)),
            RobotAgent::new(1, Color::Green, Position::new(4, 4)),
        ];
        world.load(&mut robots[0], a);
        world.load(&mut robots[1], b);
        assert_eq!(world.pools.len(Color::Green), 0);

        // Nothing left to claim: the first robot to seek puts its unit down.
        world.tick_all(&mut robots, CandidateScope::Pool);
        assert!(robots[0].carrying.is_empty());
        assert_eq!(
            world.registry.get(a).map(|u| u.location),
            Some(WasteLocation::Ground(Position::new(0, 0)))
        );
        assert!(
            world
                .board
                .entries()
                .any(|m| m.sender == 0 && m.kind == MessageKind::Released(a))
        );
        // The other robot picks it up instead of dropping its own.
        assert_eq!(world.pools.claimant(a), Some(1));
        assert_eq!(robots[1].carrying, vec![b]);

        for _ in 0..20 {
            world.tick_all(&mut robots, CandidateScope::Pool);
            if world.registry.conversions() == 1 {
                break;
            }
        }
        assert_eq!(world.registry.conversions(), 1);
        assert_eq!(world.registry.counts(), ColorCounts::new(0, 1, 0));
        assert!(robots.iter().all(|r| r.carrying.is_empty()));
        assert_eq!(robots[0].distance, 0.0);
        assert!(world.pools.is_consistent());
    }

    #[test]
    fn lone_partial_load_is_kept_until_patience_runs_out() {
        // Disposal out of wandering range, so the drop cannot be deferred.
        let mut world = World::new(Grid::open(40, 40, Position::new(39, 0)));
        let a = world.registry.spawn_at(Color::Yellow, Position::new(5, 5), &world.pools);
        let mut robot = RobotAgent::new(0, Color::Yellow, Position::new(5, 5));
        world.load(&mut robot, a);

        let patience = abandon_after(CandidateScope::Perceived);
        for _ in 1..patience {
            world.tick(&mut robot, CandidateScope::Perceived, PathMode::Greedy);
            assert_eq!(robot.carrying, vec![a]);
        }
        world.tick(&mut robot, CandidateScope::Perceived, PathMode::Greedy);
        assert!(robot.carrying.is_empty());
        assert!(world.pools.is_unclaimed(Color::Yellow, a));
        // Its own abandoned unit is not reclaimed.
        let dropped_at = world.registry.get(a).and_then(WasteUnit::ground_position);
        assert!(dropped_at.is_some());
        world.tick(&mut robot, CandidateScope::Perceived, PathMode::Greedy);
        assert_eq!(robot.assigned(), None);
        assert!(world.pools.is_unclaimed(Color::Yellow, a));
    }

    #[test]
    fn unreachable_target_is_released() {
        let mut world = World::new(Grid::walled(9, 6, &[], Position::new(8, 0)));
        let id = world.registry.spawn_at(Color::Green, Position::new(7, 4), &world.pools);
        let mut robot = RobotAgent::new(0, Color::Green, Position::new(0, 0));
        world.tick(&mut robot, CandidateScope::Pool, PathMode::AStar);
        assert_eq!(robot.state, RobotState::Idle);
        assert!(world.pools.is_unclaimed(Color::Green, id));
        assert!(
            world
                .board
                .entries()
                .any(|m| m.kind == MessageKind::Released(id))
        );
    }
}
