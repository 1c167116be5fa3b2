//! Actor components.

use std::collections::{BTreeMap, VecDeque};

use colony_logic::{ActorId, Inventory, TilePos};
use serde::{Deserialize, Serialize};

use crate::jobs::JobId;
use crate::states::State;

/// Preference levels run from 1 (most preferred) to this value.
pub const MAX_PREFERENCE_LEVEL: u8 = 4;

/// Experience per skill tier.
const XP_PER_TIER: f32 = 100.0;
const MAX_SKILL_MULTIPLIER: f32 = 2.0;

/// Identity and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub tile: TilePos,
}

/// Entity bits double as the actor id.
pub fn actor_id(entity: hecs::Entity) -> ActorId {
    ActorId(entity.to_bits().get())
}

pub fn entity_of(id: ActorId) -> Option<hecs::Entity> {
    hecs::Entity::from_bits(id.0)
}

/// Per-tick budget for movement and work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionPoints {
    pub current: f32,
    /// Points gained per AUT.
    pub rate: f32,
    pub cap: f32,
}

impl ActionPoints {
    pub fn new(rate: f32, cap: f32) -> Self {
        Self {
            current: 0.0,
            rate,
            cap,
        }
    }

    pub fn accrue(&mut self, delta: f32) {
        self.current = (self.current + self.rate * delta).min(self.cap);
    }

    /// Spend `cost` if affordable. A cost above the cap is affordable with
    /// a full budget and leaves the actor in debt.
    pub fn try_spend(&mut self, cost: f32) -> bool {
        if self.current >= cost.min(self.cap) {
            self.current -= cost;
            true
        } else {
            false
        }
    }

    /// Spend everything; returns what was spent.
    pub fn spend_all(&mut self) -> f32 {
        let spent = self.current.max(0.0);
        self.current -= spent;
        spent
    }
}

/// The single stack an actor can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carried {
    pub inventory: Option<Inventory>,
    pub capacity: u32,
}

impl Carried {
    pub fn new(capacity: u32) -> Self {
        Self {
            inventory: None,
            capacity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.as_ref().map_or(true, Inventory::is_empty)
    }

    pub fn item_type(&self) -> Option<&str> {
        self.inventory
            .as_ref()
            .filter(|inv| !inv.is_empty())
            .map(|inv| inv.item_type.as_str())
    }

    pub fn amount(&self) -> u32 {
        self.inventory.as_ref().map_or(0, |inv| inv.stack_size)
    }

    /// How many of `item_type` still fit.
    pub fn space_for(&self, item_type: &str) -> u32 {
        match &self.inventory {
            Some(inv) if !inv.is_empty() && inv.item_type != item_type => 0,
            Some(inv) if !inv.is_empty() => self
                .capacity
                .saturating_sub(inv.stack_size)
                .min(inv.space_left()),
            Some(_) | None => self.capacity,
        }
    }

    /// Add items; returns what did not fit.
    pub fn add(&mut self, mut incoming: Inventory) -> Option<Inventory> {
        let space = match &self.inventory {
            Some(held) if !held.is_empty() => self.space_for(&incoming.item_type),
            _ => self.capacity.min(incoming.max_stack_size),
        };
        if space == 0 {
            return Some(incoming);
        }
        let part = incoming.split(space, None);
        match &mut self.inventory {
            Some(held) if !held.is_empty() => held.stack_size += part.stack_size,
            _ => self.inventory = Some(part),
        }
        if incoming.is_empty() {
            None
        } else {
            Some(incoming)
        }
    }

    pub fn take(&mut self) -> Option<Inventory> {
        self.inventory.take().filter(|inv| !inv.is_empty())
    }

    /// Put back what a recipient refused.
    pub fn restore(&mut self, leftover: Option<Inventory>) {
        self.inventory = leftover.filter(|inv| !inv.is_empty());
    }
}

/// Which job categories an actor accepts, and how eagerly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPreferences {
    levels: BTreeMap<String, u8>,
}

impl JobPreferences {
    /// Accept every category at one level.
    pub fn all<'a>(categories: impl IntoIterator<Item = &'a str>, level: u8) -> Self {
        let mut prefs = Self::default();
        for category in categories {
            prefs.set(category, level);
        }
        prefs
    }

    pub fn set(&mut self, category: &str, level: u8) {
        self.levels
            .insert(category.to_string(), level.clamp(1, MAX_PREFERENCE_LEVEL));
    }

    pub fn remove(&mut self, category: &str) {
        self.levels.remove(category);
    }

    pub fn level(&self, category: &str) -> Option<u8> {
        self.levels.get(category).copied()
    }

    pub fn accepts(&self, category: &str) -> bool {
        self.levels.contains_key(category)
    }
}

/// Experience per job category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    xp: BTreeMap<String, f32>,
}

impl Skills {
    pub fn xp(&self, category: &str) -> f32 {
        self.xp.get(category).copied().unwrap_or(0.0)
    }

    pub fn add_xp(&mut self, category: &str, amount: f32) {
        if amount > 0.0 {
            *self.xp.entry(category.to_string()).or_insert(0.0) += amount;
        }
    }

    /// Work multiplier: +10% per full tier, capped at double speed.
    pub fn multiplier(&self, category: &str) -> f32 {
        let tiers = (self.xp(category) / XP_PER_TIER).floor();
        (1.0 + 0.1 * tiers).min(MAX_SKILL_MULTIPLIER)
    }
}

/// Current state chain and pending redirections.
#[derive(Debug, Default)]
pub struct Behavior {
    pub state: Option<State>,
    pub queued: VecDeque<State>,
    pub prioritized_job: Option<JobId>,
    /// Set after a state aborts so the next pick goes straight to idling.
    pub(crate) cooling_down: bool,
}
