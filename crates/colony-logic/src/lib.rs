//! Pure world model and navigation for the colony simulation.
//!
//! This crate holds everything that can be computed from plain data: the
//! tile grid, structures, inventory stacks and claims, rooms, and the
//! pathfinding built on top of them. It has no engine, no clock of its own
//! and no randomness, so every function here is deterministic and
//! unit-testable.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`geometry`] | Tile positions, neighbour offsets, Manhattan distance |
//! | [`goals`] | Goal-evaluator and heuristic factories for tile searches |
//! | [`ids`] | `RoomId`, `StructureId`, `ActorId` |
//! | [`inventory`] | Item stacks and time-limited claims |
//! | [`pathfinder`] | Cached graphs and the public path queries |
//! | [`room`] | Rooms, flood fill, gas bookkeeping, invariant checks |
//! | [`room_graph`] | Room-level graph connected through exits |
//! | [`search`] | Generic A* / Dijkstra over any [`search::SearchGraph`] |
//! | [`structure`] | Walls, doors, stockpiles, growing plants |
//! | [`tile`] | Tile types, enterability, per-tile data |
//! | [`tile_graph`] | Tile-level graph over walkable tiles |
//! | [`world`] | The grid: lookup, mutation, inventory index, change log |

pub mod geometry;
pub mod goals;
pub mod ids;
pub mod inventory;
pub mod pathfinder;
pub mod room;
pub mod room_graph;
pub mod search;
pub mod structure;
pub mod tile;
pub mod tile_graph;
pub mod world;

pub use geometry::TilePos;
pub use ids::{ActorId, RoomId, StructureId};
pub use inventory::Inventory;
pub use pathfinder::{Pathfinder, TilePath};
pub use structure::{Door, Growth, Structure};
pub use tile::{Enterability, TileType};
pub use world::{World, WorldEvent};
