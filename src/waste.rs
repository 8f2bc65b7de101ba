//! Waste lifecycle: spawning, pick-up, conversion, and delivery.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::{ConfigError, SimResult};
use crate::grid::Grid;
use crate::task_pool::TaskPools;
use crate::types::{Color, ColorCounts, Position, RobotId, WasteId};

/// Where a live unit currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteLocation {
    Ground(Position),
    Carried(RobotId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WasteUnit {
    pub id: WasteId,
    pub color: Color,
    pub location: WasteLocation,
}

impl WasteUnit {
    pub fn ground_position(&self) -> Option<Position> {
        match self.location {
            WasteLocation::Ground(pos) => Some(pos),
            WasteLocation::Carried(_) => None,
        }
    }
}

/// Owns every live waste unit and the conversion/delivery counters.
///
/// Claim state lives in [`TaskPools`]; each spawn registers the unit there
/// and each destruction retires it, so the two never drift apart.
#[derive(Default)]
pub struct WasteRegistry {
    units: BTreeMap<WasteId, WasteUnit>,
    next_id: WasteId,
    conversions: u64,
    delivered: u64,
}

impl WasteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one unit on the ground and add it to its pool.
    pub fn spawn_at(&mut self, color: Color, pos: Position, pools: &TaskPools) -> WasteId {
        let id = self.next_id;
        self.next_id += 1;
        self.units.insert(
            id,
            WasteUnit {
                id,
                color,
                location: WasteLocation::Ground(pos),
            },
        );
        pools.insert(color, id);
        id
    }

    /// Scatter initial waste uniformly over free cells, one unit per cell.
    pub fn spawn_initial<R: Rng>(
        &mut self,
        counts: ColorCounts,
        grid: &Grid,
        pools: &TaskPools,
        rng: &mut R,
    ) -> SimResult<()> {
        let mut free: Vec<Position> = grid
            .cells()
            .filter(|&pos| grid.is_free(pos) && self.units_at(pos).is_empty())
            .collect();
        if counts.total() > free.len() {
            return Err(ConfigError::TooMuchWaste {
                requested: counts.total(),
                available: free.len(),
            });
        }
        free.shuffle(rng);
        let mut cells = free.into_iter();
        for color in Color::ALL {
            for pos in cells.by_ref().take(counts.get(color)) {
                self.spawn_at(color, pos, pools);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: WasteId) -> Option<&WasteUnit> {
        self.units.get(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &WasteUnit> {
        self.units.values()
    }

    /// Units lying on the ground at `pos`, ascending id.
    pub fn units_at(&self, pos: Position) -> Vec<&WasteUnit> {
        self.units
            .values()
            .filter(|unit| unit.location == WasteLocation::Ground(pos))
            .collect()
    }

    /// Move a ground unit into the robot's load; the robot must own the claim.
    pub fn pick_up(
        &mut self,
        robot: RobotId,
        robot_pos: Position,
        id: WasteId,
        pools: &TaskPools,
    ) -> bool {
        if pools.claimant(id) != Some(robot) {
            return false;
        }
        match self.units.get_mut(&id) {
            Some(unit) if unit.location == WasteLocation::Ground(robot_pos) => {
                unit.location = WasteLocation::Carried(robot);
                true
            }
            _ => false,
        }
    }

    /// Return a carried unit to the ground at `robot_pos` and release its claim.
    pub fn put_down(
        &mut self,
        robot: RobotId,
        robot_pos: Position,
        id: WasteId,
        pools: &TaskPools,
    ) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) if unit.location == WasteLocation::Carried(robot) => {
                unit.location = WasteLocation::Ground(robot_pos);
            }
            _ => return false,
        }
        pools.release(id, robot)
    }

    /// Merge two carried units of the same convertible color into one unit
    /// of the next color at `robot_pos`. No-op when preconditions fail.
    pub fn convert(
        &mut self,
        robot: RobotId,
        robot_pos: Position,
        a: WasteId,
        b: WasteId,
        pools: &TaskPools,
    ) -> Option<WasteId> {
        if a == b {
            return None;
        }
        let (unit_a, unit_b) = (self.units.get(&a)?, self.units.get(&b)?);
        let color = unit_a.color;
        if unit_b.color != color
            || unit_a.location != WasteLocation::Carried(robot)
            || unit_b.location != WasteLocation::Carried(robot)
        {
            return None;
        }
        let next = color.next()?;
        self.destroy(a, pools);
        self.destroy(b, pools);
        self.conversions += 1;
        Some(self.spawn_at(next, robot_pos, pools))
    }

    /// Remove a carried red unit at the disposal point.
    pub fn deliver(
        &mut self,
        robot: RobotId,
        robot_pos: Position,
        id: WasteId,
        grid: &Grid,
        pools: &TaskPools,
    ) -> bool {
        let ready = matches!(
            self.units.get(&id),
            Some(unit) if unit.color == Color::Red
                && unit.location == WasteLocation::Carried(robot)
        );
        if !ready || robot_pos != grid.disposal() {
            return false;
        }
        self.destroy(id, pools);
        self.delivered += 1;
        true
    }

    fn destroy(&mut self, id: WasteId, pools: &TaskPools) {
        if let Some(unit) = self.units.remove(&id) {
            pools.retire(unit.color, id);
        }
    }

    /// Live units per color, carried ones included.
    pub fn counts(&self) -> ColorCounts {
        let mut counts = ColorCounts::default();
        for unit in self.units.values() {
            *counts.get_mut(unit.color) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Grid, TaskPools, WasteRegistry) {
        (
            Grid::open(5, 5, Position::new(4, 2)),
            TaskPools::new(),
            WasteRegistry::new(),
        )
    }

    fn carry(registry: &mut WasteRegistry, pools: &TaskPools, robot: RobotId, id: WasteId) {
        let pos = registry.get(id).and_then(WasteUnit::ground_position).expect("on ground");
        assert!(pools.claim_target(registry.get(id).expect("live").color, id, robot));
        assert!(registry.pick_up(robot, pos, id, pools));
    }

    #[test]
    fn initial_spawn_uses_distinct_free_cells() {
        let (grid, pools, mut registry) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        registry
            .spawn_initial(ColorCounts::new(10, 5, 3), &grid, &pools, &mut rng)
            .expect("fits");
        assert_eq!(registry.counts(), ColorCounts::new(10, 5, 3));
        assert_eq!(pools.len(Color::Green), 10);
        let mut cells: Vec<Position> = registry
            .units()
            .filter_map(WasteUnit::ground_position)
            .collect();
        assert!(cells.iter().all(|&pos| grid.is_free(pos)));
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), 18);
    }

    #[test]
    fn initial_spawn_rejects_overflow() {
        let (grid, pools, mut registry) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = registry
            .spawn_initial(ColorCounts::new(25, 0, 0), &grid, &pools, &mut rng)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TooMuchWaste { requested: 25, available: 24 }));
    }

    #[test]
    fn pick_up_requires_claim_and_position() {
        let (_grid, pools, mut registry) = setup();
        let id = registry.spawn_at(Color::Green, Position::new(1, 1), &pools);
        assert!(!registry.pick_up(3, Position::new(1, 1), id, &pools));
        assert!(pools.claim_target(Color::Green, id, 3));
        assert!(!registry.pick_up(3, Position::new(0, 0), id, &pools));
        assert!(registry.pick_up(3, Position::new(1, 1), id, &pools));
        assert_eq!(registry.get(id).map(|u| u.location), Some(WasteLocation::Carried(3)));
    }

    #[test]
    fn conversion_consumes_two_and_conserves_mass() {
        let (_grid, pools, mut registry) = setup();
        let a = registry.spawn_at(Color::Green, Position::new(1, 1), &pools);
        let b = registry.spawn_at(Color::Green, Position::new(1, 2), &pools);
        let before = registry.counts().mass();
        carry(&mut registry, &pools, 0, a);
        carry(&mut registry, &pools, 0, b);

        let yellow = registry
            .convert(0, Position::new(1, 2), a, b, &pools)
            .expect("converted");
        assert_eq!(registry.counts(), ColorCounts::new(0, 1, 0));
        assert_eq!(registry.counts().mass(), before);
        assert_eq!(registry.conversions(), 1);
        assert!(pools.is_unclaimed(Color::Yellow, yellow));
        assert_eq!(pools.claimant(a), None);
        assert_eq!(
            registry.get(yellow).and_then(WasteUnit::ground_position),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn conversion_with_unmet_preconditions_is_noop() {
        let (_grid, pools, mut registry) = setup();
        let g = registry.spawn_at(Color::Green, Position::new(1, 1), &pools);
        let y = registry.spawn_at(Color::Yellow, Position::new(1, 1), &pools);
        let r1 = registry.spawn_at(Color::Red, Position::new(1, 1), &pools);
        let r2 = registry.spawn_at(Color::Red, Position::new(1, 1), &pools);
        // Not carried yet.
        assert_eq!(registry.convert(0, Position::new(1, 1), g, y, &pools), None);
        carry(&mut registry, &pools, 0, g);
        carry(&mut registry, &pools, 0, y);
        carry(&mut registry, &pools, 0, r1);
        carry(&mut registry, &pools, 0, r2);
        // Mixed colors, same unit twice, and red cannot convert.
        assert_eq!(registry.convert(0, Position::new(1, 1), g, y, &pools), None);
        assert_eq!(registry.convert(0, Position::new(1, 1), g, g, &pools), None);
        assert_eq!(registry.convert(0, Position::new(1, 1), r1, r2, &pools), None);
        assert_eq!(registry.counts(), ColorCounts::new(1, 1, 2));
        assert_eq!(registry.conversions(), 0);
    }

    #[test]
    fn put_down_returns_unit_to_pool() {
        let (_grid, pools, mut registry) = setup();
        let id = registry.spawn_at(Color::Yellow, Position::new(0, 3), &pools);
        carry(&mut registry, &pools, 4, id);
        assert!(!registry.put_down(5, Position::new(2, 2), id, &pools));
        assert!(registry.put_down(4, Position::new(2, 2), id, &pools));
        assert_eq!(
            registry.get(id).map(|u| u.location),
            Some(WasteLocation::Ground(Position::new(2, 2)))
        );
        assert!(pools.is_unclaimed(Color::Yellow, id));
        assert_eq!(pools.claimant(id), None);
        // Already on the ground.
        assert!(!registry.put_down(4, Position::new(2, 2), id, &pools));
    }

    #[test]
    fn delivery_only_at_disposal() {
        let (grid, pools, mut registry) = setup();
        let red = registry.spawn_at(Color::Red, Position::new(3, 2), &pools);
        carry(&mut registry, &pools, 5, red);
        assert!(!registry.deliver(5, Position::new(3, 2), red, &grid, &pools));
        assert!(!registry.deliver(6, grid.disposal(), red, &grid, &pools));
        assert!(registry.deliver(5, grid.disposal(), red, &grid, &pools));
        assert!(registry.is_empty());
        assert_eq!(registry.delivered(), 1);
        assert_eq!(pools.claimed_len(), 0);
    }
}
