//! Placed structures: walls, doors, workbenches, stockpiles, plants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::TilePos;
use crate::ids::StructureId;

/// Tag carried by structures that hold stored inventory.
pub const STOCKPILE_TAG: &str = "Stockpile";

/// Door mechanism. A door only lets actors through once fully open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Door {
    /// 0.0 = closed, 1.0 = open.
    pub openness: f32,
    /// Openness change per AUT.
    pub speed: f32,
    /// Set when someone waits at the door; cleared every fast update.
    #[serde(skip)]
    pub wants_open: bool,
}

impl Door {
    pub fn new(speed: f32) -> Self {
        Self {
            openness: 0.0,
            speed,
            wants_open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.openness >= 1.0
    }

    fn update(&mut self, delta: f32) {
        if self.wants_open {
            self.openness = (self.openness + self.speed * delta).min(1.0);
        } else {
            self.openness = (self.openness - self.speed * delta).max(0.0);
        }
        self.wants_open = false;
    }
}

/// Slow-growing structure (crops) that yields items when ripe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Growth {
    /// 0.0..=1.0
    pub progress: f32,
    /// Progress per AUT.
    pub rate: f32,
    pub yield_item: String,
    pub yield_amount: u32,
    pub ripe: bool,
}

impl Growth {
    pub fn new(rate: f32, yield_item: impl Into<String>, yield_amount: u32) -> Self {
        Self {
            progress: 0.0,
            rate,
            yield_item: yield_item.into(),
            yield_amount,
            ripe: false,
        }
    }

    /// Advance growth; returns true exactly once, when the plant ripens.
    fn update(&mut self, delta: f32) -> bool {
        if self.ripe {
            return false;
        }
        self.progress = (self.progress + self.rate * delta).min(1.0);
        if self.progress >= 1.0 {
            self.ripe = true;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.ripe = false;
    }
}

/// A placed object occupying one tile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Structure {
    pub id: StructureId,
    pub kind: String,
    pub tile: TilePos,
    /// Multiplier on the tile's movement cost; 0 blocks movement.
    pub movement_cost: f32,
    /// Whether this structure bounds rooms (walls, doors).
    pub room_enclosure: bool,
    pub tags: BTreeSet<String>,
    pub door: Option<Door>,
    pub growth: Option<Growth>,
}

impl Structure {
    /// A free-standing structure that neither blocks nor encloses.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: StructureId(0),
            kind: kind.into(),
            tile: TilePos::default(),
            movement_cost: 1.0,
            room_enclosure: false,
            tags: BTreeSet::new(),
            door: None,
            growth: None,
        }
    }

    pub fn wall() -> Self {
        Self::new("Wall").with_movement_cost(0.0).enclosing()
    }

    pub fn door() -> Self {
        Self::new("Door")
            .with_movement_cost(1.0)
            .enclosing()
            .with_door(Door::new(4.0))
    }

    pub fn stockpile() -> Self {
        Self::new("Stockpile").with_tag(STOCKPILE_TAG)
    }

    /// The structure a construction order for `kind` produces.
    pub fn prototype(kind: &str) -> Self {
        match kind {
            "Wall" => Self::wall(),
            "Door" => Self::door(),
            "Stockpile" => Self::stockpile(),
            other => Self::new(other),
        }
    }

    pub fn with_movement_cost(mut self, cost: f32) -> Self {
        self.movement_cost = cost;
        self
    }

    pub fn enclosing(mut self) -> Self {
        self.room_enclosure = true;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_door(mut self, door: Door) -> Self {
        self.door = Some(door);
        self
    }

    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = Some(growth);
        self
    }

    /// Encloses rooms but can be walked through (doors, airlocks).
    pub fn is_exit(&self) -> bool {
        self.room_enclosure && self.movement_cost > 0.0
    }

    pub fn has_type_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Advance per-frame mechanisms.
    pub(crate) fn fast_update(&mut self, delta: f32) {
        if let Some(door) = &mut self.door {
            door.update(delta);
        }
    }

    /// Advance slow mechanisms; returns true when the structure just ripened.
    pub(crate) fn slow_update(&mut self, delta: f32) -> bool {
        match &mut self.growth {
            Some(growth) => growth.update(delta),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_classification() {
        assert!(Structure::door().is_exit());
        assert!(!Structure::wall().is_exit());
        assert!(!Structure::new("Workbench").is_exit());
        assert!(Structure::stockpile().has_type_tag(STOCKPILE_TAG));
        assert!(Structure::prototype("Door").is_exit());
        assert_eq!(Structure::prototype("Workbench").movement_cost, 1.0);
    }

    #[test]
    fn test_door_opens_only_while_requested() {
        let mut door = Structure::door();
        door.door.as_mut().unwrap().wants_open = true;
        door.fast_update(0.5);
        assert!(door.door.as_ref().unwrap().is_open());

        // Nobody waiting: it swings shut again.
        door.fast_update(0.1);
        assert!(!door.door.as_ref().unwrap().is_open());
    }

    #[test]
    fn test_growth_ripens_once() {
        let mut plant = Structure::new("Potato").with_growth(Growth::new(0.5, "Potato", 3));
        assert!(!plant.slow_update(1.0));
        assert!(plant.slow_update(1.0));
        assert!(!plant.slow_update(1.0));
        plant.growth.as_mut().unwrap().reset();
        assert!(!plant.growth.as_ref().unwrap().ripe);
    }
}
