use thiserror::Error;

use crate::types::Position;

/// Errors raised while building a simulation; stepping never fails.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown heuristic: {0}")]
    UnknownHeuristic(String),

    #[error("grid must be at least 3x3, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("walled grids need width >= 6, got {width}")]
    GridTooNarrowForWalls { width: usize },

    #[error("gates per wall must be in 1..{height}, got {gates}")]
    InvalidGateCount { gates: usize, height: usize },

    #[error("cannot place {requested} waste units on {available} free cells")]
    TooMuchWaste { requested: usize, available: usize },

    #[error("invalid layout at {position}: {reason}")]
    InvalidLayout { position: Position, reason: String },

    #[error("message board capacity must be > 0")]
    ZeroBoardCapacity,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type SimResult<T> = Result<T, ConfigError>;
