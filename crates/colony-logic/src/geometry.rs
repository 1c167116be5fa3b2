//! Integer tile coordinates and neighbour offsets.
//!
//! `z` grows upwards: `above()` is `z + 1`, `below()` is `z - 1`.

use serde::{Deserialize, Serialize};

/// Orthogonal offsets in N, E, S, W order. Graph construction and flood fill
/// iterate in this order so results are deterministic.
pub const ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Diagonal offsets in NE, SE, SW, NW order.
pub const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Position of a tile in the grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn above(self) -> Self {
        self.offset(0, 0, 1)
    }

    pub fn below(self) -> Self {
        self.offset(0, 0, -1)
    }

    /// |dx| + |dy| + |dz|
    pub fn manhattan(self, other: TilePos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }

    /// The four same-level orthogonal neighbours (unchecked against bounds).
    pub fn orthogonal(self) -> [TilePos; 4] {
        ORTHOGONAL.map(|(dx, dy)| self.offset(dx, dy, 0))
    }

    /// The four same-level diagonal neighbours (unchecked against bounds).
    pub fn diagonal(self) -> [TilePos; 4] {
        DIAGONAL.map(|(dx, dy)| self.offset(dx, dy, 0))
    }

    /// True when `other` is one step away on both x and y at the same level.
    pub fn is_diagonal_to(self, other: TilePos) -> bool {
        self.z == other.z && (self.x - other.x).abs() == 1 && (self.y - other.y).abs() == 1
    }

    /// True when `other` shares an edge with this tile at the same level.
    pub fn is_orthogonal_to(self, other: TilePos) -> bool {
        self.z == other.z && (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_counts_all_axes() {
        let a = TilePos::new(0, 0, 0);
        let b = TilePos::new(3, -4, 2);
        assert_eq!(a.manhattan(b), 9);
        assert_eq!(b.manhattan(a), 9);
    }

    #[test]
    fn test_neighbour_relations() {
        let c = TilePos::new(5, 5, 1);
        assert!(c.orthogonal().iter().all(|n| c.is_orthogonal_to(*n)));
        assert!(c.diagonal().iter().all(|n| c.is_diagonal_to(*n)));
        assert!(!c.is_orthogonal_to(c.above()));
        assert!(!c.is_diagonal_to(TilePos::new(6, 6, 0)));
    }
}
