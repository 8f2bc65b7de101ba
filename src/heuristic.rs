//! Target-selection policies.
//!
//! Distances here are Manhattan; ties always go to the lowest waste id so a
//! given candidate set yields the same pick on every run.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::pathfinder::PathMode;
use crate::types::{Position, WasteId};

/// How a robot ranks candidate waste.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Closest,
    Farthest,
    Random,
    /// Robot to candidate plus candidate to the downstream goal.
    MinTotalDistance,
}

/// Configured strategy: a selection policy plus the routing it implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heuristic {
    Closest,
    Farthest,
    Random,
    MinTotalDistance,
    /// Walls are raised and robots route with A*; targets still come from `selection`.
    AStar { selection: Selection },
}

impl Heuristic {
    pub fn selection(self) -> Selection {
        match self {
            Heuristic::Closest => Selection::Closest,
            Heuristic::Farthest => Selection::Farthest,
            Heuristic::Random => Selection::Random,
            Heuristic::MinTotalDistance => Selection::MinTotalDistance,
            Heuristic::AStar { selection } => selection,
        }
    }

    pub fn path_mode(self) -> PathMode {
        match self {
            Heuristic::AStar { .. } => PathMode::AStar,
            Heuristic::Closest
            | Heuristic::Farthest
            | Heuristic::Random
            | Heuristic::MinTotalDistance => PathMode::Greedy,
        }
    }
}

impl Selection {
    fn name(self) -> &'static str {
        match self {
            Selection::Closest => "closest",
            Selection::Farthest => "farthest",
            Selection::Random => "random",
            Selection::MinTotalDistance => "min_total_distance",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "closest" => Some(Selection::Closest),
            "farthest" => Some(Selection::Farthest),
            "random" => Some(Selection::Random),
            "min_total_distance" => Some(Selection::MinTotalDistance),
            _ => None,
        }
    }
}

impl FromStr for Heuristic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "astar" {
            return Ok(Heuristic::AStar {
                selection: Selection::Closest,
            });
        }
        if let Some(rest) = name.strip_prefix("astar_") {
            return Selection::parse(rest)
                .map(|selection| Heuristic::AStar { selection })
                .ok_or_else(|| ConfigError::UnknownHeuristic(s.to_string()));
        }
        match Selection::parse(&name) {
            Some(Selection::Closest) => Ok(Heuristic::Closest),
            Some(Selection::Farthest) => Ok(Heuristic::Farthest),
            Some(Selection::Random) => Ok(Heuristic::Random),
            Some(Selection::MinTotalDistance) => Ok(Heuristic::MinTotalDistance),
            None => Err(ConfigError::UnknownHeuristic(s.to_string())),
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::AStar {
                selection: Selection::Closest,
            } => f.write_str("astar"),
            Heuristic::AStar { selection } => write!(f, "astar_{}", selection.name()),
            other => f.write_str(other.selection().name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: WasteId,
    pub position: Position,
}

/// Pick one candidate for a robot standing at `from`; `goal` is where the
/// load ends up afterwards.
pub fn select_target<R: Rng>(
    selection: Selection,
    candidates: &[Candidate],
    from: Position,
    goal: Position,
    rng: &mut R,
) -> Option<WasteId> {
    match selection {
        Selection::Closest => candidates
            .iter()
            .min_by_key(|c| (from.manhattan(c.position), c.id))
            .map(|c| c.id),
        Selection::Farthest => candidates
            .iter()
            .min_by_key(|c| (std::cmp::Reverse(from.manhattan(c.position)), c.id))
            .map(|c| c.id),
        Selection::MinTotalDistance => candidates
            .iter()
            .min_by_key(|c| (from.manhattan(c.position) + c.position.manhattan(goal), c.id))
            .map(|c| c.id),
        Selection::Random => {
            let mut ordered = candidates.to_vec();
            ordered.sort_by_key(|c| c.id);
            ordered.choose(rng).map(|c| c.id)
        }
    }
}
