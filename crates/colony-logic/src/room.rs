//! Rooms and the flood fill that maintains them.
//!
//! A room is a maximal same-level region of tiles bounded by enclosing
//! tiles (room-enclosing structures or solid ground). A region that reaches
//! the map edge or an `Empty` tile is part of the outside room, which always
//! exists and is never deleted.
//!
//! After any change at a tile, [`reflood_around`] floods from the tile and
//! its orthogonal neighbours. Regions that exactly match one previous room
//! keep its id; others become new rooms. Gas amounts follow tiles: each new
//! region receives a share of every old room proportional to the old room's
//! tiles it inherited, which splits on division and sums on merge. Gas of a
//! region that opens to the outside vents away.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::geometry::TilePos;
use crate::ids::RoomId;
use crate::tile::TileType;
use crate::world::World;

/// An enclosed region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    tiles: BTreeSet<TilePos>,
    /// Member tiles sharing an edge with an enclosing tile.
    boundary: BTreeSet<TilePos>,
    gases: BTreeMap<String, f32>,
}

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn is_outside(&self) -> bool {
        self.id.is_outside()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.tiles.iter().copied()
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.tiles.contains(&pos)
    }

    pub fn boundary_tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.boundary.iter().copied()
    }

    pub fn gas(&self, name: &str) -> f32 {
        self.gases.get(name).copied().unwrap_or(0.0)
    }

    pub fn gases(&self) -> impl Iterator<Item = (&str, f32)> {
        self.gases.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Add (or remove, when negative) gas. Outside has no meaningful
    /// atmosphere, so changes to it are ignored.
    pub fn change_gas(&mut self, name: &str, amount: f32) {
        if self.is_outside() {
            return;
        }
        let entry = self.gases.entry(name.to_string()).or_insert(0.0);
        *entry = (*entry + amount).max(0.0);
    }
}

/// All rooms of the world, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomManager {
    rooms: BTreeMap<RoomId, Room>,
    next_id: u32,
}

impl RoomManager {
    pub fn new() -> Self {
        let mut rooms = BTreeMap::new();
        rooms.insert(RoomId::OUTSIDE, Room::new(RoomId::OUTSIDE));
        Self { rooms, next_id: 1 }
    }

    pub(crate) fn seed_outside(&mut self, tiles: impl Iterator<Item = TilePos>) {
        if let Some(outside) = self.rooms.get_mut(&RoomId::OUTSIDE) {
            outside.tiles.extend(tiles);
        }
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn outside(&self) -> &Room {
        // Present from construction and never removed.
        &self.rooms[&RoomId::OUTSIDE]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.rooms.keys().copied()
    }

    /// Number of rooms including outside.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn create(&mut self) -> RoomId {
        let id = RoomId(self.next_id);
        self.next_id += 1;
        self.rooms.insert(id, Room::new(id));
        id
    }

    fn delete(&mut self, id: RoomId) {
        if !id.is_outside() {
            self.rooms.remove(&id);
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Tiles that bound rooms and hold no room themselves.
pub fn is_enclosing_tile(world: &World, pos: TilePos) -> bool {
    match world.tile_at(pos) {
        Some(tile) => {
            tile.tile_type == TileType::Solid
                || world
                    .structure_at(pos)
                    .map(|s| s.room_enclosure)
                    .unwrap_or(false)
        }
        None => false,
    }
}

fn assign(world: &mut World, pos: TilePos, room: RoomId) {
    if let Some(old) = world.room_of(pos) {
        if old != room {
            if let Some(r) = world.rooms_mut().get_mut(old) {
                r.tiles.remove(&pos);
                r.boundary.remove(&pos);
            }
        }
    }
    if let Some(r) = world.rooms_mut().get_mut(room) {
        r.tiles.insert(pos);
    }
    world.set_tile_room(pos, Some(room));
}

fn unassign(world: &mut World, pos: TilePos) {
    if let Some(old) = world.room_of(pos) {
        if let Some(r) = world.rooms_mut().get_mut(old) {
            r.tiles.remove(&pos);
            r.boundary.remove(&pos);
        }
    }
    world.set_tile_room(pos, None);
}

/// Same-level flood from `seed` through non-enclosing tiles. Returns the
/// region and whether it is open to the outside.
fn flood(world: &World, seed: TilePos, visited: &mut HashSet<TilePos>) -> (Vec<TilePos>, bool) {
    let mut region = Vec::new();
    let mut open = false;
    let mut queue = VecDeque::new();
    visited.insert(seed);
    queue.push_back(seed);

    while let Some(current) = queue.pop_front() {
        region.push(current);
        if world.tile_at(current).map(|t| t.tile_type) == Some(TileType::Empty) {
            open = true;
        }
        for next in current.orthogonal() {
            if !world.in_bounds(next) {
                open = true;
                continue;
            }
            if is_enclosing_tile(world, next) {
                continue;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    (region, open)
}

/// Re-derive rooms around a tile whose enclosure or openness changed.
pub(crate) fn reflood_around(world: &mut World, pos: TilePos) {
    if !world.in_bounds(pos) {
        return;
    }
    let mut seeds = vec![pos];
    seeds.extend(pos.orthogonal().into_iter().filter(|p| world.in_bounds(*p)));

    // Snapshot sizes and gases of the enclosed rooms about to be reshaped.
    let touched: BTreeSet<RoomId> = seeds.iter().filter_map(|p| world.room_of(*p)).collect();
    let snapshot: BTreeMap<RoomId, (usize, BTreeMap<String, f32>)> = touched
        .iter()
        .filter(|id| !id.is_outside())
        .filter_map(|id| {
            world
                .room(*id)
                .map(|r| (*id, (r.tile_count(), r.gases.clone())))
        })
        .collect();

    if is_enclosing_tile(world, pos) {
        unassign(world, pos);
    }

    let mut visited = HashSet::new();
    let mut regions = Vec::new();
    for seed in seeds {
        if visited.contains(&seed) || is_enclosing_tile(world, seed) {
            continue;
        }
        regions.push(flood(world, seed, &mut visited));
    }

    // How many tiles of each previous room every region inherits.
    let mut inheritance = Vec::with_capacity(regions.len());
    let mut inherited_total: BTreeMap<RoomId, usize> = BTreeMap::new();
    for (tiles, _) in &regions {
        let mut inherited: BTreeMap<RoomId, usize> = BTreeMap::new();
        let mut from_outside = false;
        for t in tiles {
            match world.room_of(*t) {
                Some(id) if id.is_outside() => from_outside = true,
                Some(id) => *inherited.entry(id).or_insert(0) += 1,
                None => {}
            }
        }
        for (id, count) in &inherited {
            *inherited_total.entry(*id).or_insert(0) += count;
        }
        inheritance.push((inherited, from_outside));
    }

    let mut reused: BTreeSet<RoomId> = BTreeSet::new();
    for ((tiles, open), (inherited, from_outside)) in regions.into_iter().zip(inheritance) {
        let target = if open {
            RoomId::OUTSIDE
        } else {
            let keep = match inherited.iter().next() {
                Some((id, count))
                    if inherited.len() == 1
                        && !from_outside
                        && !reused.contains(id)
                        && snapshot.get(id).map(|(size, _)| size) == Some(count) =>
                {
                    Some(*id)
                }
                _ => None,
            };
            keep.unwrap_or_else(|| world.rooms_mut().create())
        };
        reused.insert(target);

        for t in &tiles {
            assign(world, *t, target);
        }

        if target.is_outside() {
            continue;
        }

        // Gas is conserved across the regions that inherit a room's tiles.
        let mut gases: BTreeMap<String, f32> = BTreeMap::new();
        for (old, count) in &inherited {
            let Some((_, old_gases)) = snapshot.get(old) else {
                continue;
            };
            let total = inherited_total.get(old).copied().unwrap_or(1).max(1);
            let share = *count as f32 / total as f32;
            for (name, amount) in old_gases {
                *gases.entry(name.clone()).or_insert(0.0) += amount * share;
            }
        }
        let boundary: BTreeSet<TilePos> = tiles
            .iter()
            .copied()
            .filter(|t| t.orthogonal().iter().any(|n| is_enclosing_tile(world, *n)))
            .collect();
        if let Some(room) = world.rooms_mut().get_mut(target) {
            room.gases = gases;
            room.boundary = boundary;
        }
        log::debug!(target: "rooms", "{} now holds {} tiles", target, tiles.len());
    }

    for id in touched {
        let empty = world.room(id).map(|r| r.tiles.is_empty()).unwrap_or(false);
        if empty && !id.is_outside() {
            log::debug!(target: "rooms", "deleting empty {}", id);
            world.rooms_mut().delete(id);
        }
    }
}

/// A room invariant violation found by [`validate_rooms`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoomViolation {
    pub tile: Option<TilePos>,
    pub message: String,
}

/// Check that every non-enclosing tile belongs to exactly one room, that
/// room tile sets agree with tile membership, and that outside exists.
pub fn validate_rooms(world: &World) -> Vec<RoomViolation> {
    let mut errors = Vec::new();
    if world.rooms().get(RoomId::OUTSIDE).is_none() {
        errors.push(RoomViolation {
            tile: None,
            message: "outside room missing".into(),
        });
    }

    let mut seen: HashSet<TilePos> = HashSet::new();
    for room in world.rooms().iter() {
        for t in room.tiles() {
            if !seen.insert(t) {
                errors.push(RoomViolation {
                    tile: Some(t),
                    message: format!("tile listed by more than one room (again in {})", room.id),
                });
            }
            if world.room_of(t) != Some(room.id) {
                errors.push(RoomViolation {
                    tile: Some(t),
                    message: format!("{} lists tile but tile says {:?}", room.id, world.room_of(t)),
                });
            }
        }
        if !room.is_outside() && room.tile_count() == 0 {
            errors.push(RoomViolation {
                tile: None,
                message: format!("{} is empty but not deleted", room.id),
            });
        }
    }

    for tile in world.tiles() {
        let enclosing = is_enclosing_tile(world, tile.pos);
        match (enclosing, tile.room) {
            (true, Some(id)) => errors.push(RoomViolation {
                tile: Some(tile.pos),
                message: format!("enclosing tile belongs to {}", id),
            }),
            (false, None) => errors.push(RoomViolation {
                tile: Some(tile.pos),
                message: "tile has no room".into(),
            }),
            (false, Some(_)) if !seen.contains(&tile.pos) => errors.push(RoomViolation {
                tile: Some(tile.pos),
                message: "tile room not listed by any room".into(),
            }),
            _ => {}
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;

    /// Wall ring enclosing the 3×3 interior (2..=4, 2..=4) of a 7×7 world.
    fn walled_box(world: &mut World) {
        for i in 1..=5 {
            for (x, y) in [(i, 1), (i, 5), (1, i), (5, i)] {
                world.place_structure(TilePos::new(x, y, 0), Structure::wall());
            }
        }
    }

    #[test]
    fn test_fresh_world_is_all_outside() {
        let world = World::new(5, 5, 1);
        assert_eq!(world.rooms().len(), 1);
        assert_eq!(world.rooms().outside().tile_count(), 25);
        assert!(validate_rooms(&world).is_empty());
    }

    #[test]
    fn test_default_room_is_outside() {
        let room = Room::default();
        assert_eq!(room.id, RoomId::OUTSIDE);
        assert!(room.is_outside());
        assert_eq!(room.tile_count(), 0);
    }

    #[test]
    fn test_enclosure_creates_room() {
        let mut world = World::new(7, 7, 1);
        walled_box(&mut world);
        assert_eq!(world.rooms().len(), 2);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        assert!(!inside.is_outside());
        assert_eq!(world.room(inside).unwrap().tile_count(), 9);
        // Every interior tile except the centre touches the wall.
        assert_eq!(world.room(inside).unwrap().boundary_tiles().count(), 8);
        assert_eq!(world.room_of(TilePos::new(1, 1, 0)), None);
        assert!(validate_rooms(&world).is_empty());
    }

    #[test]
    fn test_split_divides_gas_and_merge_sums_it() {
        let mut world = World::new(7, 7, 1);
        walled_box(&mut world);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        world.room_mut(inside).unwrap().change_gas("O2", 9.0);

        // Split the 3×3 interior into 3 + 3 with a wall column at x=3.
        let mut divider = Vec::new();
        for y in 2..=4 {
            divider.push(world.place_structure(TilePos::new(3, y, 0), Structure::wall()).unwrap());
        }
        let left = world.room_of(TilePos::new(2, 3, 0)).unwrap();
        let right = world.room_of(TilePos::new(4, 3, 0)).unwrap();
        assert_ne!(left, right);
        let total = world.room(left).unwrap().gas("O2") + world.room(right).unwrap().gas("O2");
        assert!((total - 9.0).abs() < 1e-3, "gas total was {}", total);
        assert!(validate_rooms(&world).is_empty());

        // Knock the divider back out: one room again, gas preserved.
        for id in divider {
            world.remove_structure(id);
        }
        let merged = world.room_of(TilePos::new(2, 3, 0)).unwrap();
        assert_eq!(world.room_of(TilePos::new(4, 3, 0)), Some(merged));
        assert_eq!(world.room(merged).unwrap().tile_count(), 9);
        assert!((world.room(merged).unwrap().gas("O2") - 9.0).abs() < 1e-3);
        assert_eq!(world.rooms().len(), 2);
        assert!(validate_rooms(&world).is_empty());
    }

    #[test]
    fn test_breach_to_outside_keeps_outside() {
        let mut world = World::new(7, 7, 1);
        walled_box(&mut world);
        let wall = world.structure_at(TilePos::new(3, 1, 0)).unwrap().id;
        world.remove_structure(wall);
        assert_eq!(world.rooms().len(), 1);
        assert_eq!(world.room_of(TilePos::new(3, 3, 0)), Some(RoomId::OUTSIDE));
        assert!(validate_rooms(&world).is_empty());
    }

    #[test]
    fn test_empty_tile_opens_room_to_outside() {
        let mut world = World::new(7, 7, 1);
        walled_box(&mut world);
        world.set_tile_type(TilePos::new(3, 3, 0), TileType::Empty);
        assert_eq!(world.room_of(TilePos::new(2, 2, 0)), Some(RoomId::OUTSIDE));
        assert!(validate_rooms(&world).is_empty());
    }

    #[test]
    fn test_unaffected_room_keeps_id() {
        let mut world = World::new(9, 7, 1);
        walled_box(&mut world);
        let inside = world.room_of(TilePos::new(3, 3, 0)).unwrap();
        // A wall outside the box touching its outer face.
        world.place_structure(TilePos::new(6, 3, 0), Structure::wall());
        assert_eq!(world.room_of(TilePos::new(3, 3, 0)), Some(inside));
    }

    #[test]
    fn test_outside_survives_when_world_fully_walled() {
        let mut world = World::new(2, 1, 1);
        world.place_structure(TilePos::new(0, 0, 0), Structure::wall());
        world.place_structure(TilePos::new(1, 0, 0), Structure::wall());
        assert!(world.rooms().get(RoomId::OUTSIDE).is_some());
        assert_eq!(world.rooms().outside().tile_count(), 0);
        assert!(validate_rooms(&world).is_empty());
    }
}
