//! Shared identifiers, colors, and positions used across the simulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a waste unit in the registry.
pub type WasteId = u64;
/// Unique identifier for a robot agent.
pub type RobotId = u64;
/// Zone band id (1..=3), counted from the west edge.
pub type ZoneId = u8;

/// Waste color, which doubles as the robot color that handles it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Yellow,
    Red,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Green, Color::Yellow, Color::Red];

    /// The color produced by merging two units of this color, if any.
    pub fn next(self) -> Option<Color> {
        match self {
            Color::Green => Some(Color::Yellow),
            Color::Yellow => Some(Color::Red),
            Color::Red => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Color::Green => 0,
            Color::Yellow => 1,
            Color::Red => 2,
        }
    }

    /// Mass of one unit expressed in green-equivalents.
    pub fn mass(self) -> u64 {
        match self {
            Color::Green => 1,
            Color::Yellow => 2,
            Color::Red => 4,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
        };
        f.write_str(name)
    }
}

/// What a robot of a given color is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capability {
    /// Waste color the robot picks up.
    pub collects: Color,
    /// Waste color produced when the robot converts a full load.
    pub produces: Option<Color>,
    /// Whether the robot carries its load to the disposal point.
    pub delivers: bool,
    /// Maximum number of units carried at once.
    pub capacity: usize,
}

impl Capability {
    pub fn of(color: Color) -> Self {
        match color {
            Color::Green | Color::Yellow => Self {
                collects: color,
                produces: color.next(),
                delivers: false,
                capacity: 2,
            },
            Color::Red => Self {
                collects: Color::Red,
                produces: None,
                delivers: true,
                capacity: 1,
            },
        }
    }
}

/// Grid cell coordinate; `x` grows eastward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(self, other: Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Euclidean length of a single move to an adjacent cell.
    pub fn step_length(self, other: Position) -> f64 {
        let dx = self.x.abs_diff(other.x) as f64;
        let dy = self.y.abs_diff(other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One count per waste or robot color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl ColorCounts {
    pub const fn new(green: usize, yellow: usize, red: usize) -> Self {
        Self { green, yellow, red }
    }

    pub const fn uniform(count: usize) -> Self {
        Self::new(count, count, count)
    }

    pub fn get(&self, color: Color) -> usize {
        match color {
            Color::Green => self.green,
            Color::Yellow => self.yellow,
            Color::Red => self.red,
        }
    }

    pub fn get_mut(&mut self, color: Color) -> &mut usize {
        match color {
            Color::Green => &mut self.green,
            Color::Yellow => &mut self.yellow,
            Color::Red => &mut self.red,
        }
    }

    pub fn total(&self) -> usize {
        self.green + self.yellow + self.red
    }

    /// Total waste mass in green-equivalents.
    pub fn mass(&self) -> u64 {
        Color::ALL
            .iter()
            .map(|&color| self.get(color) as u64 * color.mass())
            .sum()
    }
}
