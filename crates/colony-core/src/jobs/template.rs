//! Builder for fresh [`Job`] instances.

use std::collections::{BTreeMap, BTreeSet};

use colony_logic::{TilePos, TileType};

use super::job::{Job, JobAction, JobId, JobPriority, RequestedItem};
use crate::observers::Observers;

/// Reusable description of a job. `build` stamps out a new job at a tile;
/// callbacks are never shared between jobs built from one template.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTemplate {
    pub name: String,
    pub category: String,
    pub priority: JobPriority,
    pub cost: f32,
    pub requested: Vec<RequestedItem>,
    pub repeats: bool,
    pub adjacent: bool,
    pub is_need: bool,
    pub can_take_from_stockpile: bool,
    pub action: JobAction,
}

impl JobTemplate {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority: JobPriority::Medium,
            cost: 1.0,
            requested: Vec::new(),
            repeats: false,
            adjacent: false,
            is_need: false,
            can_take_from_stockpile: true,
            action: JobAction::None,
        }
    }

    /// Build a structure of `kind`, worked from a neighbouring tile.
    pub fn construct(kind: &str) -> Self {
        Self::new(format!("Build {}", kind), "construction")
            .adjacent()
            .action(JobAction::PlaceStructure(kind.to_string()))
    }

    pub fn deconstruct() -> Self {
        Self::new("Deconstruct", "construction")
            .adjacent()
            .action(JobAction::Deconstruct)
    }

    pub fn change_tile(tile_type: TileType) -> Self {
        Self::new(format!("Make {}", tile_type.name()), "construction")
            .action(JobAction::ChangeTile(tile_type))
    }

    pub fn harvest(item: &str, amount: u32) -> Self {
        Self::new(format!("Harvest {}", item), "farming").action(JobAction::Harvest {
            item: item.to_string(),
            amount,
        })
    }

    pub fn priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn cost(mut self, cost: f32) -> Self {
        self.cost = cost;
        self
    }

    pub fn require(mut self, item_type: impl Into<String>, min: u32, max: u32) -> Self {
        self.requested.push(RequestedItem {
            item_type: item_type.into(),
            min,
            max: max.max(min),
        });
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeats = true;
        self
    }

    pub fn adjacent(mut self) -> Self {
        self.adjacent = true;
        self
    }

    pub fn need(mut self) -> Self {
        self.is_need = true;
        self
    }

    pub fn from_stockpile(mut self, allowed: bool) -> Self {
        self.can_take_from_stockpile = allowed;
        self
    }

    pub fn action(mut self, action: JobAction) -> Self {
        self.action = action;
        self
    }

    pub fn build(&self, id: JobId, tile: TilePos) -> Job {
        Job {
            id,
            name: self.name.clone(),
            tile,
            category: self.category.clone(),
            priority: self.priority,
            requested: self.requested.clone(),
            delivered: BTreeMap::new(),
            required_cost: self.cost,
            cost: self.cost,
            repeats: self.repeats,
            adjacent: self.adjacent,
            is_need: self.is_need,
            can_take_from_stockpile: self.can_take_from_stockpile,
            action: self.action.clone(),
            suspended: false,
            resume_on: Vec::new(),
            cant_reach: BTreeSet::new(),
            worker: None,
            on_completed: Observers::new(),
            on_stopped: Observers::new(),
            on_worked: Observers::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_template() {
        let template = JobTemplate::construct("Wall").require("Steel", 5, 5).cost(4.0);
        let job = template.build(JobId(3), TilePos::new(2, 2, 0));
        assert_eq!(job.name, "Build Wall");
        assert_eq!(job.category, "construction");
        assert!(job.adjacent);
        assert_eq!(job.cost, 4.0);
        assert_eq!(job.required_cost, 4.0);
        assert_eq!(job.action, JobAction::PlaceStructure("Wall".into()));
        assert!(!job.material_needs_met());
    }

    #[test]
    fn test_builds_are_independent() {
        let template = JobTemplate::harvest("Corn", 4);
        let mut a = template.build(JobId(1), TilePos::new(0, 0, 0));
        let b = template.build(JobId(2), TilePos::new(1, 0, 0));
        a.on_completed.subscribe(Box::new(|_| {}));
        assert_eq!(a.on_completed.len(), 1);
        assert!(b.on_completed.is_empty());
    }

    #[test]
    fn test_require_clamps_max_to_min() {
        let template = JobTemplate::new("x", "crafting").require("Ore", 6, 2);
        assert_eq!(template.requested[0].max, 6);
    }
}
