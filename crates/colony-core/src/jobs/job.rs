//! A unit of schedulable work.

use std::collections::{BTreeMap, BTreeSet};

use colony_logic::{ActorId, Inventory, Structure, TilePos, TileType, World, WorldEvent};
use serde::{Deserialize, Serialize};

use crate::observers::Observers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Numerically ascending = less urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobPriority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl JobPriority {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// An item a job consumes: at least `min` must be delivered before work
/// counts, and haulers bring up to `max`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub item_type: String,
    pub min: u32,
    pub max: u32,
}

/// What completing a job does to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobAction {
    None,
    PlaceStructure(String),
    ChangeTile(TileType),
    Deconstruct,
    Harvest { item: String, amount: u32 },
}

impl JobAction {
    pub(crate) fn apply(&self, world: &mut World, tile: TilePos, max_stack: u32) {
        match self {
            JobAction::None => {}
            JobAction::PlaceStructure(kind) => {
                if world.place_structure(tile, Structure::prototype(kind)).is_none() {
                    log::warn!(target: "jobs", "could not place {} at {}", kind, tile);
                }
            }
            JobAction::ChangeTile(tile_type) => {
                world.set_tile_type(tile, *tile_type);
            }
            JobAction::Deconstruct => {
                if let Some(id) = world.structure_at(tile).map(|s| s.id) {
                    world.remove_structure(id);
                }
            }
            JobAction::Harvest { item, amount } => {
                if let Some(id) = world.structure_at(tile).map(|s| s.id) {
                    if let Some(growth) = world.structure_mut(id).and_then(|s| s.growth.as_mut()) {
                        growth.reset();
                    }
                }
                let crop = Inventory::new(item.clone(), *amount, max_stack);
                if let Some(rest) = world.place_inventory(tile, crop) {
                    log::debug!(target: "jobs", "{} {} did not fit at {}", rest.stack_size, item, tile);
                }
            }
        }
    }
}

/// Readiness of a job for a particular applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobRunState {
    Active,
    /// Site not enterable, or not reachable from the asking actor.
    CantReach,
    /// Some required item exists nowhere.
    MissingInventory,
    Suspended,
}

/// Event that lifts a suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeTrigger {
    RoomsChanged,
    /// The tile or one of its orthogonal or vertical neighbours changed.
    TileChanged(TilePos),
    InventoryCreated(String),
}

impl ResumeTrigger {
    pub fn matches(&self, event: &WorldEvent) -> bool {
        match (self, event) {
            (ResumeTrigger::RoomsChanged, WorldEvent::RoomsChanged) => true,
            (ResumeTrigger::TileChanged(tile), WorldEvent::TileChanged(changed)) => {
                tile.manhattan(*changed) <= 1
            }
            (ResumeTrigger::InventoryCreated(wanted), WorldEvent::InventoryCreated(created)) => {
                wanted == created
            }
            _ => false,
        }
    }
}

/// Outcome of one [`Job::do_work`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Materials missing; cost unchanged.
    Wasted,
    Progressed,
    Completed,
    /// A repeating job finished a cycle and reset its cost.
    Repeated,
}

pub type JobCallback = dyn FnMut(&Job);

pub struct Job {
    pub id: JobId,
    /// Short label for logs and UI, e.g. "Build Wall".
    pub name: String,
    pub tile: TilePos,
    pub category: String,
    pub priority: JobPriority,
    pub requested: Vec<RequestedItem>,
    pub delivered: BTreeMap<String, Inventory>,
    pub required_cost: f32,
    pub cost: f32,
    pub repeats: bool,
    /// Work happens next to `tile` rather than on it.
    pub adjacent: bool,
    /// Created by a need; discarded rather than requeued when interrupted.
    pub is_need: bool,
    pub can_take_from_stockpile: bool,
    pub action: JobAction,
    pub(crate) suspended: bool,
    pub(crate) resume_on: Vec<ResumeTrigger>,
    pub(crate) cant_reach: BTreeSet<ActorId>,
    pub(crate) worker: Option<ActorId>,
    pub on_completed: Observers<JobCallback>,
    pub on_stopped: Observers<JobCallback>,
    pub on_worked: Observers<JobCallback>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tile", &self.tile)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("cost", &self.cost)
            .field("worker", &self.worker)
            .field("suspended", &self.suspended)
            .finish()
    }
}

impl Job {
    pub fn is_being_worked(&self) -> bool {
        self.worker.is_some()
    }

    pub fn worker(&self) -> Option<ActorId> {
        self.worker
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn resume_triggers(&self) -> &[ResumeTrigger] {
        &self.resume_on
    }

    pub fn is_unreachable_for(&self, actor: ActorId) -> bool {
        self.cant_reach.contains(&actor)
    }

    pub fn delivered_amount(&self, item_type: &str) -> u32 {
        self.delivered
            .get(item_type)
            .map(|inv| inv.stack_size)
            .unwrap_or(0)
    }

    /// Every requested item has at least its minimum delivered.
    pub fn material_needs_met(&self) -> bool {
        self.requested
            .iter()
            .all(|r| self.delivered_amount(&r.item_type) >= r.min)
    }

    /// How many more of `item_type` haulers should bring.
    pub fn amount_desired(&self, item_type: &str) -> u32 {
        self.requested
            .iter()
            .find(|r| r.item_type == item_type)
            .map(|r| r.max.saturating_sub(self.delivered_amount(item_type)))
            .unwrap_or(0)
    }

    /// Requested types still below their minimum.
    pub fn missing_items(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .filter(|r| self.delivered_amount(&r.item_type) < r.min)
            .map(|r| r.item_type.as_str())
    }

    /// Requested types haulers should still fetch.
    pub fn wanted_items(&self) -> impl Iterator<Item = &str> {
        self.requested
            .iter()
            .filter(|r| self.amount_desired(&r.item_type) > 0)
            .map(|r| r.item_type.as_str())
    }

    /// Accept as much of `inventory` as the job wants; returns the rest.
    pub fn deliver(&mut self, mut inventory: Inventory) -> Option<Inventory> {
        let wanted = self.amount_desired(&inventory.item_type);
        if wanted == 0 {
            return Some(inventory);
        }
        let part = inventory.split(wanted, None);
        let max = self
            .requested
            .iter()
            .find(|r| r.item_type == part.item_type)
            .map(|r| r.max)
            .unwrap_or(part.stack_size);
        let slot = self
            .delivered
            .entry(part.item_type.clone())
            .or_insert_with(|| Inventory::new(part.item_type.clone(), 0, max));
        slot.stack_size += part.stack_size;
        if inventory.is_empty() {
            None
        } else {
            Some(inventory)
        }
    }

    /// Apply `amount` of work. Worked callbacks always fire first; without
    /// all materials the work is wasted. Completion fires the completed
    /// callbacks and, for one-shot jobs, the stopped callbacks. Repeating
    /// jobs reset to their required cost and consume their materials.
    pub fn do_work(&mut self, amount: f32) -> WorkOutcome {
        self.fire_worked();
        if !self.material_needs_met() {
            return WorkOutcome::Wasted;
        }
        self.cost -= amount;
        if self.cost > 0.0 {
            return WorkOutcome::Progressed;
        }
        self.fire_completed();
        if self.repeats {
            self.cost = self.required_cost;
            self.delivered.clear();
            WorkOutcome::Repeated
        } else {
            self.cost = 0.0;
            self.fire_stopped();
            WorkOutcome::Completed
        }
    }

    pub(crate) fn fire_worked(&mut self) {
        let mut observers = std::mem::take(&mut self.on_worked);
        observers.notify(self);
        self.on_worked = observers;
    }

    pub(crate) fn fire_completed(&mut self) {
        let mut observers = std::mem::take(&mut self.on_completed);
        observers.notify(self);
        self.on_completed = observers;
    }

    pub(crate) fn fire_stopped(&mut self) {
        let mut observers = std::mem::take(&mut self.on_stopped);
        observers.notify(self);
        self.on_stopped = observers;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            name: self.name.clone(),
            tile: self.tile,
            category: self.category.clone(),
            priority: self.priority,
            requested: self.requested.clone(),
            delivered: self.delivered.values().cloned().collect(),
            required_cost: self.required_cost,
            cost: self.cost,
            repeats: self.repeats,
            adjacent: self.adjacent,
            is_need: self.is_need,
            can_take_from_stockpile: self.can_take_from_stockpile,
            action: self.action.clone(),
            suspended: self.suspended,
            resume_on: self.resume_on.clone(),
        }
    }

    /// Rebuild from a snapshot. Workers, unreachability marks and
    /// callbacks are not persisted.
    pub fn from_snapshot(snapshot: JobSnapshot) -> Self {
        Job {
            id: snapshot.id,
            name: snapshot.name,
            tile: snapshot.tile,
            category: snapshot.category,
            priority: snapshot.priority,
            requested: snapshot.requested,
            delivered: snapshot
                .delivered
                .into_iter()
                .map(|inv| (inv.item_type.clone(), inv))
                .collect(),
            required_cost: snapshot.required_cost,
            cost: snapshot.cost,
            repeats: snapshot.repeats,
            adjacent: snapshot.adjacent,
            is_need: snapshot.is_need,
            can_take_from_stockpile: snapshot.can_take_from_stockpile,
            action: snapshot.action,
            suspended: snapshot.suspended,
            resume_on: snapshot.resume_on,
            cant_reach: BTreeSet::new(),
            worker: None,
            on_completed: Observers::new(),
            on_stopped: Observers::new(),
            on_worked: Observers::new(),
        }
    }
}

/// Persistent form of a [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub tile: TilePos,
    pub category: String,
    pub priority: JobPriority,
    pub requested: Vec<RequestedItem>,
    pub delivered: Vec<Inventory>,
    pub required_cost: f32,
    pub cost: f32,
    pub repeats: bool,
    pub adjacent: bool,
    pub is_need: bool,
    pub can_take_from_stockpile: bool,
    pub action: JobAction,
    pub suspended: bool,
    pub resume_on: Vec<ResumeTrigger>,
}
