//! Win, game-over, and step-cap detection.

use std::fmt;

use serde::Serialize;

use crate::types::ColorCounts;

/// How a finished run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No waste of any color remains.
    Win,
    /// Waste remains but no conversion or delivery can ever happen again.
    GameOver,
    /// Step cap reached first.
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Win => "win",
            Outcome::GameOver => "game_over",
            Outcome::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Classify remaining waste; `None` while progress is still possible.
pub fn classify(remaining: ColorCounts) -> Option<Outcome> {
    if remaining.total() == 0 {
        return Some(Outcome::Win);
    }
    if remaining.green < 2 && remaining.yellow < 2 && remaining.red == 0 {
        return Some(Outcome::GameOver);
    }
    None
}

/// Runs once per tick before any robot acts.
pub struct TerminationMonitor {
    max_steps: u64,
}

impl TerminationMonitor {
    pub fn new(max_steps: u64) -> Self {
        Self { max_steps }
    }

    /// Win and game-over take precedence over the step cap.
    pub fn check(&self, remaining: ColorCounts, steps_taken: u64) -> Option<Outcome> {
        classify(remaining).or_else(|| (steps_taken >= self.max_steps).then_some(Outcome::Timeout))
    }
}
