use colony_logic::TilePos;

use super::{at_site, Agent, State, Transition};
use crate::context::SimContext;
use crate::jobs::JobId;

/// Bring a job the materials it is missing.
///
/// Each update makes one of five decisions, in order: dump carried items
/// the job does not want, deliver when carrying enough (or all that can be
/// found), pick up from the current tile, go fetch from elsewhere, or
/// deliver what is already carried.
#[derive(Debug)]
pub struct HaulState {
    pub job: JobId,
    /// Stack we hold a claim on and are walking to.
    pickup: Option<TilePos>,
}

impl HaulState {
    pub fn new(job: JobId) -> Self {
        Self { job, pickup: None }
    }

    pub(super) fn update(&mut self, agent: &mut Agent, sim: &mut SimContext) -> Transition {
        let Some(job) = sim.jobs.job(self.job) else {
            return Transition::Finished;
        };
        if job.material_needs_met() {
            return Transition::Finished;
        }
        let (site, adjacent, from_stockpile) = (job.tile, job.adjacent, job.can_take_from_stockpile);

        // 1. Carrying something the job has no use for.
        let carried_type = agent.carried.item_type().map(str::to_string);
        let wanted_now = carried_type
            .as_deref()
            .map_or(0, |t| job.amount_desired(t));
        if carried_type.is_some() && wanted_now == 0 {
            return Transition::Push(State::dump());
        }

        // 2. Carrying enough, or a full load, or all there is.
        if let Some(item_type) = carried_type.as_deref() {
            let carrying = agent.carried.amount();
            let nothing_left = sim.world.total_available(item_type, from_stockpile) == 0
                && self.pickup.is_none();
            if carrying >= wanted_now || agent.carried.space_for(item_type) == 0 || nothing_left {
                return self.deliver(agent, sim, site, adjacent);
            }
        }

        // 3. Pick up what lies here.
        let here = agent.tile();
        let wanted: Vec<String> = match carried_type {
            Some(t) => vec![t],
            None => job.wanted_items().map(String::from).collect(),
        };
        if let Some(inv) = sim.world.inventory_at(here) {
            let item_type = inv.item_type.clone();
            let mine = sim.world.claimed_by(here, agent.id);
            let pickable = mine + sim.world.available_inventory(here);
            if wanted.contains(&item_type)
                && pickable > 0
                && inv.can_be_picked_up(from_stockpile, sim.world.is_on_stockpile(here))
            {
                let desired = job
                    .amount_desired(&item_type)
                    .saturating_sub(agent.carried.amount());
                let amount = desired.min(agent.carried.space_for(&item_type)).min(pickable);
                if amount > 0 {
                    if let Some(taken) = sim.world.take_inventory(here, amount, Some(agent.id)) {
                        log::debug!(target: "actors", "{}: picked up {} {} at {}", agent.id, taken.stack_size, item_type, here);
                        let rest = agent.carried.add(taken);
                        if let Some(rest) = rest {
                            sim.world.place_inventory(here, rest);
                        }
                    }
                    self.release(agent, sim);
                    return Transition::Continue;
                }
            }
        }

        // 4. Go and fetch some.
        self.release(agent, sim);
        let types: Vec<&str> = wanted.iter().map(String::as_str).collect();
        let path = sim
            .pathfinder
            .find_path_to_inventory(&sim.world, here, &types, from_stockpile);
        if let Some(dest) = path.destination() {
            let carrying = agent.carried.amount();
            let desired = sim.jobs.job(self.job).map_or(0, |job| {
                sim.world
                    .inventory_at(dest)
                    .map_or(0, |inv| job.amount_desired(&inv.item_type).saturating_sub(carrying))
            });
            let claimed = sim.world.claim_inventory(dest, agent.id, desired);
            if claimed > 0 {
                self.pickup = Some(dest);
            }
            return Transition::Push(State::move_along(path));
        }

        // 5. Nothing more to find; deliver what we have, if anything.
        if !agent.carried.is_empty() {
            return self.deliver(agent, sim, site, adjacent);
        }
        log::debug!(target: "actors", "{}: no {:?} to haul for {}", agent.id, wanted, self.job);
        Transition::Abort
    }

    fn deliver(&mut self, agent: &mut Agent, sim: &mut SimContext, site: TilePos, adjacent: bool) -> Transition {
        if !at_site(sim, site, adjacent, agent.tile()) {
            let path = sim
                .pathfinder
                .find_path_to_tile(&sim.world, agent.tile(), site, adjacent);
            if path.is_empty() {
                sim.jobs.mark_cant_reach(self.job, agent.id);
                return Transition::Abort;
            }
            return Transition::Push(State::move_along(path));
        }
        if let Some(load) = agent.carried.take() {
            log::debug!(target: "actors", "{}: delivering {} {} to {}", agent.id, load.stack_size, load.item_type, self.job);
            let rest = sim.jobs.deliver(self.job, load);
            agent.carried.restore(rest);
        }
        match sim.jobs.job(self.job) {
            Some(job) if !job.material_needs_met() => Transition::Continue,
            _ => Transition::Finished,
        }
    }

    /// Drop the claim on the stack we were heading for.
    pub(super) fn release(&mut self, agent: &mut Agent, sim: &mut SimContext) {
        if let Some(tile) = self.pickup.take() {
            sim.world.release_claim(tile, agent.id);
        }
    }
}
