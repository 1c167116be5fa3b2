//! Inventory stacks and time-limited claims.
//!
//! A claim marks part of a stack as spoken for by one actor. Claims expire
//! after a fixed duration; expired claims are purged the next time the stack
//! is claimed, and ignored by every availability query before that.

use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Default claim lifetime in AUT.
pub const DEFAULT_CLAIM_DURATION: f64 = 120.0;

/// A reservation against a stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryClaim {
    pub actor: ActorId,
    pub amount: u32,
    /// World time the claim was made.
    pub time: f64,
}

impl InventoryClaim {
    fn is_live(&self, now: f64, duration: f64) -> bool {
        now - self.time < duration
    }
}

/// A stack of one item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub item_type: String,
    pub stack_size: u32,
    pub max_stack_size: u32,
    /// Locked stacks cannot be picked up at all.
    pub locked: bool,
    claims: Vec<InventoryClaim>,
}

impl Inventory {
    pub fn new(item_type: impl Into<String>, stack_size: u32, max_stack_size: u32) -> Self {
        Self {
            item_type: item_type.into(),
            stack_size,
            max_stack_size: max_stack_size.max(1),
            locked: false,
            claims: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack_size == 0
    }

    pub fn space_left(&self) -> u32 {
        self.max_stack_size.saturating_sub(self.stack_size)
    }

    /// Amount not covered by live claims.
    pub fn available(&self, now: f64, claim_duration: f64) -> u32 {
        let claimed: u32 = self
            .claims
            .iter()
            .filter(|c| c.is_live(now, claim_duration))
            .map(|c| c.amount)
            .sum();
        self.stack_size.saturating_sub(claimed)
    }

    /// Live amount claimed by `actor`.
    pub fn claimed_by(&self, actor: ActorId, now: f64, claim_duration: f64) -> u32 {
        self.claims
            .iter()
            .filter(|c| c.actor == actor && c.is_live(now, claim_duration))
            .map(|c| c.amount)
            .sum()
    }

    /// Reserve up to `amount` for `actor`, replacing any earlier claim by the
    /// same actor. Returns the amount actually reserved.
    pub fn claim(&mut self, actor: ActorId, amount: u32, now: f64, claim_duration: f64) -> u32 {
        self.claims
            .retain(|c| c.actor != actor && c.is_live(now, claim_duration));
        let granted = amount.min(self.available(now, claim_duration));
        if granted > 0 {
            self.claims.push(InventoryClaim {
                actor,
                amount: granted,
                time: now,
            });
        }
        granted
    }

    pub fn release_claim(&mut self, actor: ActorId) {
        self.claims.retain(|c| c.actor != actor);
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    /// `on_stockpile` tells whether the stack rests on a stockpile structure.
    pub fn can_be_picked_up(&self, can_take_from_stockpile: bool, on_stockpile: bool) -> bool {
        !self.locked && (can_take_from_stockpile || !on_stockpile)
    }

    /// Split off up to `amount` items into a new stack. The taker's own claim
    /// shrinks by what was taken.
    pub fn split(&mut self, amount: u32, taker: Option<ActorId>) -> Inventory {
        let taken = amount.min(self.stack_size);
        self.stack_size -= taken;
        if let Some(actor) = taker {
            let mut remaining = taken;
            for claim in self.claims.iter_mut().filter(|c| c.actor == actor) {
                let used = claim.amount.min(remaining);
                claim.amount -= used;
                remaining -= used;
            }
            self.claims.retain(|c| c.amount > 0);
        }
        let mut part = Inventory::new(self.item_type.clone(), taken, self.max_stack_size);
        part.locked = self.locked;
        part
    }

    /// Move as much of `other` into this stack as fits. Types must match.
    /// Returns the amount moved.
    pub fn merge(&mut self, other: &mut Inventory) -> u32 {
        if other.item_type != self.item_type {
            return 0;
        }
        let moved = other.stack_size.min(self.space_left());
        self.stack_size += moved;
        other.stack_size -= moved;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ActorId = ActorId(1);
    const B: ActorId = ActorId(2);

    #[test]
    fn test_claims_reduce_availability() {
        let mut wood = Inventory::new("Wood", 10, 50);
        assert_eq!(wood.claim(A, 4, 0.0, 100.0), 4);
        assert_eq!(wood.available(1.0, 100.0), 6);
        assert_eq!(wood.claim(B, 8, 1.0, 100.0), 6);
        assert_eq!(wood.available(1.0, 100.0), 0);
    }

    #[test]
    fn test_claims_expire() {
        let mut wood = Inventory::new("Wood", 10, 50);
        wood.claim(A, 10, 0.0, 5.0);
        assert_eq!(wood.available(4.0, 5.0), 0);
        assert_eq!(wood.available(5.0, 5.0), 10);

        // Stale claim is purged on the next claim check.
        assert_eq!(wood.claim(B, 3, 6.0, 5.0), 3);
        assert_eq!(wood.claim_count(), 1);
    }

    #[test]
    fn test_reclaim_replaces_previous_claim() {
        let mut stone = Inventory::new("Stone", 5, 50);
        stone.claim(A, 2, 0.0, 100.0);
        stone.claim(A, 3, 1.0, 100.0);
        assert_eq!(stone.claimed_by(A, 1.0, 100.0), 3);
        stone.release_claim(A);
        assert_eq!(stone.available(1.0, 100.0), 5);
    }

    #[test]
    fn test_split_consumes_takers_claim() {
        let mut wood = Inventory::new("Wood", 10, 50);
        wood.claim(A, 4, 0.0, 100.0);
        wood.claim(B, 2, 0.0, 100.0);
        let part = wood.split(4, Some(A));
        assert_eq!(part.stack_size, 4);
        assert_eq!(wood.stack_size, 6);
        assert_eq!(wood.claimed_by(A, 0.0, 100.0), 0);
        assert_eq!(wood.available(0.0, 100.0), 4);
    }

    #[test]
    fn test_merge_respects_max_stack() {
        let mut a = Inventory::new("Wood", 45, 50);
        let mut b = Inventory::new("Wood", 10, 50);
        assert_eq!(a.merge(&mut b), 5);
        assert_eq!(b.stack_size, 5);
        let mut c = Inventory::new("Stone", 1, 50);
        assert_eq!(a.merge(&mut c), 0);
    }

    #[test]
    fn test_stockpile_pickup_rules() {
        let mut inv = Inventory::new("Wood", 1, 50);
        assert!(inv.can_be_picked_up(false, false));
        assert!(!inv.can_be_picked_up(false, true));
        assert!(inv.can_be_picked_up(true, true));
        inv.locked = true;
        assert!(!inv.can_be_picked_up(true, false));
    }
}
