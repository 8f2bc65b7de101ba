use crate::grid::Grid;
use crate::types::{Color, Position, RobotId, WasteId};
use crate::waste::WasteRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleWaste {
    pub id: WasteId,
    pub color: Color,
    pub position: Position,
}

/// What a robot senses this step: its own cell plus the Moore ring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Perception {
    pub visible_waste: Vec<VisibleWaste>,
    pub visible_robots: Vec<(RobotId, Position)>,
}

impl Perception {
    pub fn waste_of(&self, color: Color) -> impl Iterator<Item = &VisibleWaste> {
        self.visible_waste.iter().filter(move |w| w.color == color)
    }

    pub fn robot_at(&self, pos: Position) -> bool {
        self.visible_robots.iter().any(|&(_, at)| at == pos)
    }
}

/// Scan the 3x3 window around `pos`. `robots` is the tick-start snapshot.
pub fn perceive(
    grid: &Grid,
    registry: &WasteRegistry,
    robots: &[(RobotId, Position)],
    me: RobotId,
    pos: Position,
) -> Perception {
    let mut cells = grid.neighbors_moore(pos);
    cells.push(pos);

    let mut perception = Perception::default();
    for cell in cells {
        for unit in registry.units_at(cell) {
            perception.visible_waste.push(VisibleWaste {
                id: unit.id,
                color: unit.color,
                position: cell,
            });
        }
        perception.visible_robots.extend(
            robots
                .iter()
                .filter(|&&(id, at)| id != me && at == cell)
                .copied(),
        );
    }
    perception.visible_waste.sort_by_key(|w| w.id);
    perception.visible_robots.sort_by_key(|&(id, _)| id);
    perception
}
