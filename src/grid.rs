//! Static spatial structure: zones, walls with gates, and the disposal point.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::types::{Position, ZoneId};

/// One of the three vertical bands of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub id: ZoneId,
}

impl Zone {
    /// Range cell radioactivity is drawn from inside this zone.
    pub fn radioactivity_band(self) -> (f64, f64) {
        match self.id {
            1 => (0.0, 0.33),
            2 => (0.33, 0.66),
            _ => (0.66, 1.0),
        }
    }
}

/// Evenly spaced gate rows for a wall line of the given height.
pub fn gate_rows(height: usize, gates: usize) -> Vec<usize> {
    (0..gates)
        .map(|i| (i + 1) * height / (gates + 1))
        .collect()
}

pub struct Grid {
    width: usize,
    height: usize,
    disposal: Position,
    wall_columns: Vec<usize>,
    gates: Vec<usize>,
    walls: HashSet<Position>,
    radioactivity: Vec<f64>,
}

impl Grid {
    /// Grid without walls.
    pub fn open(width: usize, height: usize, disposal: Position) -> Self {
        Self {
            width,
            height,
            disposal,
            wall_columns: Vec::new(),
            gates: Vec::new(),
            walls: HashSet::new(),
            radioactivity: vec![0.0; width * height],
        }
    }

    /// Grid with wall lines at `width/3` and `2*width/3`, open only at `gate_rows`.
    pub fn walled(width: usize, height: usize, gate_rows: &[usize], disposal: Position) -> Self {
        let mut grid = Self::open(width, height, disposal);
        grid.wall_columns = vec![width / 3, 2 * width / 3];
        grid.gates = gate_rows.to_vec();
        for &x in &grid.wall_columns {
            for y in 0..height {
                if !grid.gates.contains(&y) {
                    grid.walls.insert(Position::new(x, y));
                }
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn disposal(&self) -> Position {
        self.disposal
    }

    pub fn has_walls(&self) -> bool {
        !self.wall_columns.is_empty()
    }

    pub fn wall_columns(&self) -> &[usize] {
        &self.wall_columns
    }

    pub fn gates(&self) -> &[usize] {
        &self.gates
    }

    /// Wall cells in row-major order.
    pub fn walls(&self) -> Vec<Position> {
        let mut walls: Vec<Position> = self.walls.iter().copied().collect();
        walls.sort_by_key(|p| (p.y, p.x));
        walls
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn zone_of(&self, pos: Position) -> Zone {
        let id = if 3 * pos.x < self.width {
            1
        } else if 3 * pos.x < 2 * self.width {
            2
        } else {
            3
        };
        Zone { id }
    }

    pub fn is_blocked(&self, pos: Position) -> bool {
        self.walls.contains(&pos)
    }

    /// A cell that can hold waste or a robot at setup time.
    pub fn is_free(&self, pos: Position) -> bool {
        self.in_bounds(pos) && !self.is_blocked(pos) && pos != self.disposal
    }

    /// In-bounds cells of the Moore neighbourhood (up to 8, own cell excluded).
    pub fn neighbors_moore(&self, pos: Position) -> Vec<Position> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let x = pos.x as i64 + dx;
                let y = pos.y as i64 + dy;
                if x < 0 || y < 0 {
                    continue;
                }
                let next = Position::new(x as usize, y as usize);
                if self.in_bounds(next) {
                    out.push(next);
                }
            }
        }
        out
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    /// Draw per-cell radioactivity from each zone's band.
    pub fn assign_radioactivity<R: Rng>(&mut self, rng: &mut R) {
        for y in 0..self.height {
            for x in 0..self.width {
                let (lo, hi) = self.zone_of(Position::new(x, y)).radioactivity_band();
                self.radioactivity[y * self.width + x] = rng.gen_range(lo..hi);
            }
        }
    }

    pub fn radioactivity(&self, pos: Position) -> f64 {
        if !self.in_bounds(pos) {
            return 0.0;
        }
        self.radioactivity[pos.y * self.width + pos.x]
    }

    /// Per-cell radioactivity, row-major.
    pub fn radioactivity_map(&self) -> &[f64] {
        &self.radioactivity
    }
}
