//! The tile grid and everything placed on it.
//!
//! `World` owns tiles, structures, rooms and the inventory index. Every
//! mutation that can change movement costs bumps the navigation version and
//! appends to a bounded change log; every mutation that can change room
//! topology bumps the room version. Graph caches compare against these
//! versions before searching, so a search never runs on a stale graph.
//!
//! Mutations also queue [`WorldEvent`]s, drained once per tick by the job
//! manager to resume suspended jobs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::geometry::TilePos;
use crate::ids::{ActorId, RoomId, StructureId};
use crate::inventory::{Inventory, DEFAULT_CLAIM_DURATION};
use crate::room::{self, Room, RoomManager};
use crate::structure::{Structure, STOCKPILE_TAG};
use crate::tile::{Enterability, Tile, TileType};

/// Number of tile changes remembered for incremental graph regeneration.
const CHANGE_LOG_CAPACITY: usize = 64;

/// Something happened that may unblock suspended work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Movement cost or occupancy of a tile changed.
    TileChanged(TilePos),
    /// Rooms were split, merged, created or deleted.
    RoomsChanged,
    /// Items of this type appeared somewhere.
    InventoryCreated(String),
    /// A growing structure is ready to harvest.
    GrowthComplete { structure: StructureId, tile: TilePos },
}

/// The grid collaborator: tiles, structures, rooms and inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    width: i32,
    height: i32,
    depth: i32,
    tiles: Vec<Tile>,
    structures: BTreeMap<StructureId, Structure>,
    next_structure_id: u32,
    rooms: RoomManager,
    inventory_index: BTreeMap<String, BTreeSet<TilePos>>,
    time: f64,
    claim_duration: f64,
    nav_version: u64,
    room_version: u64,
    change_log: VecDeque<(u64, TilePos)>,
    #[serde(skip)]
    events: Vec<WorldEvent>,
}

impl World {
    /// A world of `Floor` tiles, all outside.
    pub fn new(width: i32, height: i32, depth: i32) -> Self {
        Self::filled(width, height, depth, TileType::Floor)
    }

    pub fn filled(width: i32, height: i32, depth: i32, tile_type: TileType) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let depth = depth.max(0);
        let mut tiles = Vec::with_capacity((width * height * depth) as usize);
        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    let mut tile = Tile::new(TilePos::new(x, y, z), tile_type);
                    if tile_type == TileType::Solid {
                        tile.room = None;
                    }
                    tiles.push(tile);
                }
            }
        }
        let mut rooms = RoomManager::new();
        rooms.seed_outside(tiles.iter().filter(|t| t.room.is_some()).map(|t| t.pos));
        Self {
            width,
            height,
            depth,
            tiles,
            structures: BTreeMap::new(),
            next_structure_id: 1,
            rooms,
            inventory_index: BTreeMap::new(),
            time: 0.0,
            claim_duration: DEFAULT_CLAIM_DURATION,
            nav_version: 0,
            room_version: 0,
            change_log: VecDeque::new(),
            events: Vec::new(),
        }
    }

    // ── Dimensions & lookup ────────────────────────────────────────────

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Total tile count.
    pub fn volume(&self) -> usize {
        self.tiles.len()
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.width
            && pos.y < self.height
            && pos.z < self.depth
    }

    fn index_of(&self, pos: TilePos) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some((pos.x + pos.y * self.width + pos.z * self.width * self.height) as usize)
    }

    /// Bounds-checked tile lookup.
    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        self.index_of(pos).map(|i| &self.tiles[i])
    }

    fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index_of(pos).map(move |i| &mut self.tiles[i])
    }

    /// All tiles in z, y, x order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn room_of(&self, pos: TilePos) -> Option<RoomId> {
        self.tile_at(pos).and_then(|t| t.room)
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub(crate) fn rooms_mut(&mut self) -> &mut RoomManager {
        &mut self.rooms
    }

    // ── Movement ───────────────────────────────────────────────────────

    /// Tile cost × structure cost multiplier; 0 when either is 0 or the
    /// position is out of bounds.
    pub fn calculated_move_cost(&self, pos: TilePos) -> f32 {
        let Some(tile) = self.tile_at(pos) else {
            return 0.0;
        };
        let base = tile.tile_type.movement_cost();
        if base <= 0.0 {
            return 0.0;
        }
        match tile.structure.and_then(|id| self.structures.get(&id)) {
            Some(s) if s.movement_cost <= 0.0 => 0.0,
            Some(s) => base * s.movement_cost,
            None => base,
        }
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.calculated_move_cost(pos) > 0.0
    }

    /// Whether an actor may step onto `pos` now. Pure; see
    /// [`World::request_passage`] to ask a door to open.
    pub fn is_enterable(&self, pos: TilePos) -> Enterability {
        if !self.is_walkable(pos) {
            return Enterability::Never;
        }
        match self.structure_at(pos).and_then(|s| s.door.as_ref()) {
            Some(door) if !door.is_open() => Enterability::Soon,
            _ => Enterability::Yes,
        }
    }

    /// Ask whatever blocks `pos` temporarily to get out of the way.
    pub fn request_passage(&mut self, pos: TilePos) {
        let Some(id) = self.tile_at(pos).and_then(|t| t.structure) else {
            return;
        };
        if let Some(door) = self.structures.get_mut(&id).and_then(|s| s.door.as_mut()) {
            door.wants_open = true;
        }
    }

    /// In-bounds neighbours of `pos`. Vertical neighbours are included when
    /// the shared opening is `Empty`: up when the tile above is `Empty`,
    /// down when `pos` itself is `Empty`.
    pub fn neighbors(&self, pos: TilePos, diagonal: bool, vertical: bool) -> Vec<TilePos> {
        let mut out = Vec::with_capacity(10);
        out.extend(pos.orthogonal().into_iter().filter(|p| self.in_bounds(*p)));
        if diagonal {
            out.extend(pos.diagonal().into_iter().filter(|p| self.in_bounds(*p)));
        }
        if vertical {
            let up = pos.above();
            if self.tile_at(up).map(|t| t.tile_type) == Some(TileType::Empty) {
                out.push(up);
            }
            let down = pos.below();
            if self.in_bounds(down)
                && self.tile_at(pos).map(|t| t.tile_type) == Some(TileType::Empty)
            {
                out.push(down);
            }
        }
        out
    }

    /// Moving diagonally from `from` to `to` would cut the corner of an
    /// impassable tile.
    pub fn is_clipping_corner(&self, from: TilePos, to: TilePos) -> bool {
        if !from.is_diagonal_to(to) {
            return false;
        }
        let side_a = TilePos::new(to.x, from.y, from.z);
        let side_b = TilePos::new(from.x, to.y, from.z);
        !self.is_walkable(side_a) || !self.is_walkable(side_b)
    }

    /// True when the tile is outside or shares an edge with an outside tile.
    pub fn can_see_outside(&self, pos: TilePos) -> bool {
        if self.room_of(pos) == Some(RoomId::OUTSIDE) {
            return true;
        }
        pos.orthogonal()
            .iter()
            .any(|n| self.room_of(*n) == Some(RoomId::OUTSIDE))
    }

    // ── Structures ─────────────────────────────────────────────────────

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(&id)
    }

    pub fn structure_at(&self, pos: TilePos) -> Option<&Structure> {
        self.tile_at(pos)
            .and_then(|t| t.structure)
            .and_then(|id| self.structures.get(&id))
    }

    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values()
    }

    /// Place `structure` on `pos`. Fails (returns `None`) when out of bounds,
    /// occupied, or the ground is not buildable.
    pub fn place_structure(&mut self, pos: TilePos, mut structure: Structure) -> Option<StructureId> {
        let tile = self.tile_at(pos)?;
        if tile.structure.is_some() || !tile.tile_type.is_buildable() {
            log::warn!(target: "rooms", "cannot place {} at {}", structure.kind, pos);
            return None;
        }
        let id = StructureId(self.next_structure_id);
        self.next_structure_id += 1;
        structure.id = id;
        structure.tile = pos;
        let encloses = structure.room_enclosure;
        self.structures.insert(id, structure);
        if let Some(tile) = self.tile_mut(pos) {
            tile.structure = Some(id);
        }
        self.mark_nav_changed(pos);
        if encloses {
            self.retopologize(pos);
        }
        Some(id)
    }

    /// Remove a structure, returning it.
    pub fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        let structure = self.structures.remove(&id)?;
        let pos = structure.tile;
        if let Some(tile) = self.tile_mut(pos) {
            tile.structure = None;
        }
        self.mark_nav_changed(pos);
        if structure.room_enclosure {
            self.retopologize(pos);
        }
        Some(structure)
    }

    /// Change the ground type. Returns false when out of bounds or unchanged.
    pub fn set_tile_type(&mut self, pos: TilePos, tile_type: TileType) -> bool {
        let Some(tile) = self.tile_mut(pos) else {
            return false;
        };
        if tile.tile_type == tile_type {
            return false;
        }
        let old_type = tile.tile_type;
        tile.tile_type = tile_type;
        self.mark_nav_changed(pos);
        // Vertical links above and below depend on emptiness.
        self.record_change(pos.above());
        self.record_change(pos.below());
        let shapes_rooms = |t: TileType| matches!(t, TileType::Empty | TileType::Solid);
        if shapes_rooms(old_type) || shapes_rooms(tile_type) {
            self.retopologize(pos);
        }
        true
    }

    fn retopologize(&mut self, pos: TilePos) {
        room::reflood_around(self, pos);
        self.room_version += 1;
        self.events.push(WorldEvent::RoomsChanged);
    }

    pub(crate) fn set_tile_room(&mut self, pos: TilePos, room: Option<RoomId>) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.room = room;
        }
    }

    // ── Inventory ──────────────────────────────────────────────────────

    pub fn inventory_at(&self, pos: TilePos) -> Option<&Inventory> {
        self.tile_at(pos).and_then(|t| t.inventory.as_ref())
    }

    /// Tiles currently holding items of `item_type`, in position order.
    pub fn tiles_with_inventory<'a>(&'a self, item_type: &str) -> impl Iterator<Item = TilePos> + 'a {
        self.inventory_index
            .get(item_type)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn is_on_stockpile(&self, pos: TilePos) -> bool {
        self.structure_at(pos)
            .map(|s| s.has_type_tag(STOCKPILE_TAG))
            .unwrap_or(false)
    }

    /// Stack on `pos` exists, is not empty, may be picked up under the
    /// stockpile rule, and has unclaimed items.
    pub fn can_pick_up_from(&self, pos: TilePos, can_take_from_stockpile: bool) -> bool {
        match self.inventory_at(pos) {
            Some(inv) => {
                !inv.is_empty()
                    && inv.can_be_picked_up(can_take_from_stockpile, self.is_on_stockpile(pos))
                    && inv.available(self.time, self.claim_duration) > 0
            }
            None => false,
        }
    }

    /// Whether `amount` items of `item_type` could be dropped on `pos`.
    /// Partial fits count: any free space in a same-type stack qualifies.
    pub fn can_accept_inventory(&self, pos: TilePos, item_type: &str) -> bool {
        let Some(tile) = self.tile_at(pos) else {
            return false;
        };
        if !self.is_walkable(pos) {
            return false;
        }
        if let Some(s) = self.structure_at(pos) {
            if s.room_enclosure {
                return false;
            }
        }
        match &tile.inventory {
            None => true,
            Some(inv) => inv.item_type == item_type && inv.space_left() > 0,
        }
    }

    /// Put items on a tile, merging with a same-type stack. Returns what did
    /// not fit (`None` when everything was placed).
    pub fn place_inventory(&mut self, pos: TilePos, mut inventory: Inventory) -> Option<Inventory> {
        if inventory.is_empty() {
            return None;
        }
        if !self.can_accept_inventory(pos, &inventory.item_type) {
            return Some(inventory);
        }
        let item_type = inventory.item_type.clone();
        let tile = self.tile_mut(pos)?;
        let placed = match &mut tile.inventory {
            Some(existing) => existing.merge(&mut inventory),
            None => {
                let cap = inventory.max_stack_size;
                let here = inventory.split(cap, None);
                let moved = here.stack_size;
                tile.inventory = Some(here);
                moved
            }
        };
        if placed > 0 {
            self.inventory_index
                .entry(item_type.clone())
                .or_default()
                .insert(pos);
            self.events.push(WorldEvent::InventoryCreated(item_type));
        }
        if inventory.is_empty() {
            None
        } else {
            Some(inventory)
        }
    }

    /// Take up to `amount` items from `pos`. `taker` consumes its own claim.
    pub fn take_inventory(
        &mut self,
        pos: TilePos,
        amount: u32,
        taker: Option<ActorId>,
    ) -> Option<Inventory> {
        let tile = self.tile_mut(pos)?;
        let inv = tile.inventory.as_mut()?;
        let part = inv.split(amount, taker);
        let item_type = inv.item_type.clone();
        if inv.is_empty() {
            tile.inventory = None;
            if let Some(set) = self.inventory_index.get_mut(&item_type) {
                set.remove(&pos);
                if set.is_empty() {
                    self.inventory_index.remove(&item_type);
                }
            }
        }
        if part.is_empty() {
            None
        } else {
            Some(part)
        }
    }

    /// Claim up to `amount` on the stack at `pos`; returns the granted amount.
    pub fn claim_inventory(&mut self, pos: TilePos, actor: ActorId, amount: u32) -> u32 {
        let now = self.time;
        let duration = self.claim_duration;
        match self.tile_mut(pos).and_then(|t| t.inventory.as_mut()) {
            Some(inv) => inv.claim(actor, amount, now, duration),
            None => 0,
        }
    }

    pub fn release_claim(&mut self, pos: TilePos, actor: ActorId) {
        if let Some(inv) = self.tile_mut(pos).and_then(|t| t.inventory.as_mut()) {
            inv.release_claim(actor);
        }
    }

    pub fn available_inventory(&self, pos: TilePos) -> u32 {
        self.inventory_at(pos)
            .map(|inv| inv.available(self.time, self.claim_duration))
            .unwrap_or(0)
    }

    pub fn claimed_by(&self, pos: TilePos, actor: ActorId) -> u32 {
        self.inventory_at(pos)
            .map(|inv| inv.claimed_by(actor, self.time, self.claim_duration))
            .unwrap_or(0)
    }

    /// Total available (unclaimed, pickable) items of a type in the world.
    pub fn total_available(&self, item_type: &str, can_take_from_stockpile: bool) -> u32 {
        self.tiles_with_inventory(item_type)
            .filter(|p| self.can_pick_up_from(*p, can_take_from_stockpile))
            .map(|p| self.available_inventory(p))
            .sum()
    }

    /// Items of a type lying anywhere they may be picked up from, claimed
    /// or not.
    pub fn total_stocked(&self, item_type: &str, can_take_from_stockpile: bool) -> u32 {
        self.tiles_with_inventory(item_type)
            .filter_map(|p| {
                let inv = self.inventory_at(p)?;
                inv.can_be_picked_up(can_take_from_stockpile, self.is_on_stockpile(p))
                    .then_some(inv.stack_size)
            })
            .sum()
    }

    // ── Time & ticking ─────────────────────────────────────────────────

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn claim_duration(&self) -> f64 {
        self.claim_duration
    }

    pub fn set_claim_duration(&mut self, duration: f64) {
        self.claim_duration = duration;
    }

    /// Per-frame update: advance the clock and doors.
    pub fn fast_update(&mut self, delta: f32) {
        self.time += delta as f64;
        for structure in self.structures.values_mut() {
            structure.fast_update(delta);
        }
    }

    /// Low-frequency update: growth and other slow mechanisms.
    pub fn slow_update(&mut self, delta: f32) {
        let mut ripe = Vec::new();
        for structure in self.structures.values_mut() {
            if structure.slow_update(delta) {
                ripe.push(WorldEvent::GrowthComplete {
                    structure: structure.id,
                    tile: structure.tile,
                });
            }
        }
        self.events.extend(ripe);
    }

    // ── Versions, change log & events ──────────────────────────────────

    pub fn nav_version(&self) -> u64 {
        self.nav_version
    }

    pub fn room_version(&self) -> u64 {
        self.room_version
    }

    fn mark_nav_changed(&mut self, pos: TilePos) {
        self.record_change(pos);
        self.events.push(WorldEvent::TileChanged(pos));
    }

    fn record_change(&mut self, pos: TilePos) {
        if !self.in_bounds(pos) {
            return;
        }
        self.nav_version += 1;
        self.change_log.push_back((self.nav_version, pos));
        while self.change_log.len() > CHANGE_LOG_CAPACITY {
            self.change_log.pop_front();
        }
    }

    /// Tiles changed after `version`, or `None` when the log no longer
    /// reaches back that far.
    pub fn changes_since(&self, version: u64) -> Option<Vec<TilePos>> {
        if version >= self.nav_version {
            return Some(Vec::new());
        }
        match self.change_log.front() {
            Some((oldest, _)) if *oldest <= version + 1 => Some(
                self.change_log
                    .iter()
                    .filter(|(v, _)| *v > version)
                    .map(|(_, p)| *p)
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn push_event(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Rebuild derived indexes after deserialization.
    pub fn rebuild_indexes(&mut self) {
        self.inventory_index.clear();
        for tile in &self.tiles {
            if let Some(inv) = &tile.inventory {
                self.inventory_index
                    .entry(inv.item_type.clone())
                    .or_default()
                    .insert(tile.pos);
            }
        }
        // Force graph caches to rebuild wholesale.
        self.nav_version += CHANGE_LOG_CAPACITY as u64 + 1;
        self.change_log.clear();
        self.room_version += 1;
    }
}
