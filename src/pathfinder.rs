//! One-cell-per-tick movement: greedy stepping or A* routing around walls.

use pathfinding::prelude::astar;
use serde::Serialize;

use crate::grid::Grid;
use crate::types::Position;

// Integer edge costs keep A* exact: 10 per orthogonal move, 14 per diagonal.
const ORTHOGONAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    Greedy,
    AStar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Arrived,
    Moved(Position),
    /// Next cell is a wall; stay and retry next tick.
    Blocked,
    /// No route exists under the current walls.
    Unreachable,
}

pub fn next_step(mode: PathMode, grid: &Grid, from: Position, to: Position) -> StepOutcome {
    match mode {
        PathMode::Greedy => greedy_step(grid, from, to),
        PathMode::AStar => astar_step(grid, from, to),
    }
}

fn toward(a: usize, b: usize) -> usize {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => a + 1,
        std::cmp::Ordering::Greater => a - 1,
        std::cmp::Ordering::Equal => a,
    }
}

/// The 8-directional step that shrinks both axis gaps; no detours.
pub fn greedy_step(grid: &Grid, from: Position, to: Position) -> StepOutcome {
    if from == to {
        return StepOutcome::Arrived;
    }
    let next = Position::new(toward(from.x, to.x), toward(from.y, to.y));
    if grid.is_blocked(next) {
        StepOutcome::Blocked
    } else {
        StepOutcome::Moved(next)
    }
}

fn astar_step(grid: &Grid, from: Position, to: Position) -> StepOutcome {
    if from == to {
        return StepOutcome::Arrived;
    }
    match astar_path(grid, from, to) {
        Some(path) if path.len() >= 2 => StepOutcome::Moved(path[1]),
        _ => StepOutcome::Unreachable,
    }
}

/// Octile distance; exact on an empty grid, so admissible with walls.
fn octile(a: Position, b: Position) -> u32 {
    let dx = a.x.abs_diff(b.x) as u32;
    let dy = a.y.abs_diff(b.y) as u32;
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * lo + ORTHOGONAL_COST * (hi - lo)
}

/// Shortest 8-connected path from `from` to `to` avoiding wall cells,
/// both endpoints included.
pub fn astar_path(grid: &Grid, from: Position, to: Position) -> Option<Vec<Position>> {
    if grid.is_blocked(to) || !grid.in_bounds(to) {
        return None;
    }
    astar(
        &from,
        |&pos| {
            grid.neighbors_moore(pos)
                .into_iter()
                .filter(move |&next| !grid.is_blocked(next))
                .map(move |next| {
                    let cost = if next.x != pos.x && next.y != pos.y {
                        DIAGONAL_COST
                    } else {
                        ORTHOGONAL_COST
                    };
                    (next, cost)
                })
        },
        |&pos| octile(pos, to),
        |&pos| pos == to,
    )
    .map(|(path, _cost)| path)
}
