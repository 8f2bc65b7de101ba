//! Simulation configuration, validation, and TOML loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimResult};
use crate::heuristic::Heuristic;
use crate::pathfinder::PathMode;
use crate::types::ColorCounts;

/// Which waste a robot may consider when picking a target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateScope {
    /// Any unclaimed unit of the robot's color, seen or not.
    #[default]
    Pool,
    /// Only units inside the robot's Moore window.
    Perceived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    pub robots: ColorCounts,
    pub waste: ColorCounts,
    pub heuristic: String,
    pub max_steps: u64,
    pub seed: u64,
    pub candidate_scope: CandidateScope,
    pub gates_per_wall: usize,
    pub message_board_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            robots: ColorCounts::new(5, 3, 2),
            waste: ColorCounts::new(10, 0, 0),
            heuristic: "closest".to_string(),
            max_steps: 2000,
            seed: 42,
            candidate_scope: CandidateScope::Pool,
            gates_per_wall: 3,
            message_board_capacity: 256,
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every bound and resolve the heuristic name.
    ///
    /// Waste capacity is checked later, once walls and the disposal point
    /// are known.
    pub fn validate(&self) -> SimResult<Heuristic> {
        let heuristic: Heuristic = self.heuristic.parse()?;
        if self.width < 3 || self.height < 3 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if heuristic.path_mode() == PathMode::AStar {
            if self.width < 6 {
                return Err(ConfigError::GridTooNarrowForWalls { width: self.width });
            }
            if self.gates_per_wall == 0 || self.gates_per_wall >= self.height {
                return Err(ConfigError::InvalidGateCount {
                    gates: self.gates_per_wall,
                    height: self.height,
                });
            }
        }
        if self.message_board_capacity == 0 {
            return Err(ConfigError::ZeroBoardCapacity);
        }
        Ok(heuristic)
    }
}
