//! Harvest system - turns ripe crops into farming jobs

use colony_logic::WorldEvent;

use crate::context::SimContext;
use crate::jobs::{JobId, JobTemplate};

/// Work per harvest.
const HARVEST_COST: f32 = 2.0;

/// Queue a harvest job for every crop that ripened.
pub fn harvest_system(sim: &mut SimContext, events: &[WorldEvent]) -> Vec<JobId> {
    let mut queued = Vec::new();
    for event in events {
        let WorldEvent::GrowthComplete { structure, tile } = event else {
            continue;
        };
        let Some(growth) = sim.world.structure(*structure).and_then(|s| s.growth.as_ref()) else {
            continue;
        };
        let template = JobTemplate::harvest(&growth.yield_item, growth.yield_amount).cost(HARVEST_COST);
        if let Some(id) = sim.jobs.enqueue_template(&mut sim.world, &template, *tile) {
            queued.push(id);
        }
    }
    queued
}
