//! Grid simulation of robots that collect, convert and dispose of radioactive waste.

pub mod config;
pub mod error;
pub mod grid;
pub mod heuristic;
pub mod logging;
pub mod message_board;
pub mod monitor;
pub mod pathfinder;
pub mod perception;
pub mod robot;
pub mod runner;
pub mod simulation;
pub mod task_pool;
pub mod types;
pub mod waste;

pub use config::{CandidateScope, SimConfig};
pub use error::{ConfigError, SimResult};
pub use heuristic::Heuristic;
pub use monitor::Outcome;
pub use simulation::{ScenarioLayout, Simulation, SimulationSnapshot, StepReport};
pub use types::{Color, ColorCounts, Position};
