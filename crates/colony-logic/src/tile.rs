//! Tile types and per-tile data.

use serde::{Deserialize, Serialize};

use crate::geometry::TilePos;
use crate::ids::{RoomId, StructureId};
use crate::inventory::Inventory;

/// Ground type of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Open space with no floor. Walkable, connects vertically, and never
    /// part of an enclosed room.
    Empty,
    Floor,
    /// Walkable but slow (dirt, rubble).
    Rough,
    /// Solid rock. Impassable.
    Solid,
}

impl TileType {
    /// Base movement cost; 0 means impassable.
    pub fn movement_cost(self) -> f32 {
        match self {
            TileType::Empty => 1.0,
            TileType::Floor => 1.0,
            TileType::Rough => 2.0,
            TileType::Solid => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Empty => "Empty",
            TileType::Floor => "Floor",
            TileType::Rough => "Rough",
            TileType::Solid => "Solid",
        }
    }

    /// Whether structures may be built on this tile type.
    pub fn is_buildable(self) -> bool {
        matches!(self, TileType::Floor | TileType::Rough)
    }
}

/// Whether an actor may step onto a tile right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enterability {
    Yes,
    /// Blocked for now but will open up (a closing or closed door).
    Soon,
    Never,
}

/// One grid cell. Tiles are allocated once with the world and only their
/// attributes change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub pos: TilePos,
    pub tile_type: TileType,
    pub structure: Option<StructureId>,
    pub inventory: Option<Inventory>,
    /// Owning room. `None` only for tiles holding a room-enclosing structure.
    pub room: Option<RoomId>,
}

impl Tile {
    pub fn new(pos: TilePos, tile_type: TileType) -> Self {
        Self {
            pos,
            tile_type,
            structure: None,
            inventory: None,
            room: Some(RoomId::OUTSIDE),
        }
    }

    pub fn has_structure(&self) -> bool {
        self.structure.is_some()
    }
}
