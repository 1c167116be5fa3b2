//! Goal-evaluator and heuristic factories for tile searches.
//!
//! Each factory closes over a shared `&World` and immutable arguments and
//! returns a plain predicate or cost estimate; none of them mutate anything.

use crate::geometry::TilePos;
use crate::ids::RoomId;
use crate::tile::TileType;
use crate::world::World;

/// Accepts `target` itself, or with `adjacent` the tiles an actor can work
/// on `target` from: the four orthogonal neighbours on the same level, the
/// tile above when it is `Empty`, and the tile below when `target` is
/// `Empty`. Diagonals never qualify.
pub fn goal_tile_evaluator(
    world: &World,
    target: TilePos,
    adjacent: bool,
) -> impl Fn(TilePos) -> bool + '_ {
    move |pos| {
        if !adjacent {
            return pos == target;
        }
        if pos.is_orthogonal_to(target) {
            return true;
        }
        let is_empty = |p: TilePos| world.tile_at(p).map(|t| t.tile_type) == Some(TileType::Empty);
        (pos == target.above() && is_empty(pos)) || (pos == target.below() && is_empty(target))
    }
}

/// Accepts a tile holding a pickable, partly unclaimed stack of one of
/// `item_types`.
pub fn goal_inventory_evaluator<'a>(
    world: &'a World,
    item_types: &'a [&'a str],
    can_take_from_stockpile: bool,
) -> impl Fn(TilePos) -> bool + 'a {
    move |pos| match world.inventory_at(pos) {
        Some(inv) => {
            item_types.contains(&inv.item_type.as_str())
                && world.can_pick_up_from(pos, can_take_from_stockpile)
        }
        None => false,
    }
}

/// Accepts the first tile that belongs to any room.
pub fn goal_has_room_evaluator(world: &World) -> impl Fn(TilePos) -> bool + '_ {
    move |pos| world.room_of(pos).is_some()
}

pub fn goal_room_evaluator(world: &World, room: RoomId) -> impl Fn(TilePos) -> bool + '_ {
    move |pos| world.room_of(pos) == Some(room)
}

/// Accepts a tile holding a structure of `kind`.
pub fn goal_structure_evaluator<'a>(world: &'a World, kind: &'a str) -> impl Fn(TilePos) -> bool + 'a {
    move |pos| world.structure_at(pos).map(|s| s.kind == kind).unwrap_or(false)
}

/// Accepts a tile that can take at least part of a stack of `item_type`
/// and is not a stockpile reserved for sorted storage.
pub fn goal_dump_evaluator<'a>(world: &'a World, item_type: &'a str) -> impl Fn(TilePos) -> bool + 'a {
    move |pos| world.can_accept_inventory(pos, item_type) && !world.is_on_stockpile(pos)
}

/// Manhattan distance to `target`.
pub fn manhattan_heuristic(target: TilePos) -> impl Fn(TilePos) -> f32 {
    move |pos| pos.manhattan(target) as f32
}

pub fn zero_heuristic<N>(_: N) -> f32 {
    0.0
}
