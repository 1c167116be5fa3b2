use super::{at_site, Agent, State, Transition};
use crate::context::SimContext;
use crate::jobs::{JobId, WorkOutcome};

/// Work one job to completion: haul materials, walk to the site, work.
#[derive(Debug)]
pub struct JobState {
    pub job: JobId,
}

impl JobState {
    pub fn new(job: JobId) -> Self {
        Self { job }
    }

    pub(super) fn update(&mut self, agent: &mut Agent, sim: &mut SimContext) -> Transition {
        let Some(job) = sim.jobs.job(self.job) else {
            // Finished or cancelled by someone else.
            return Transition::Finished;
        };
        if job.worker() != Some(agent.id) {
            log::debug!(target: "actors", "{}: lost claim on {}", agent.id, self.job);
            return Transition::Abort;
        }
        if !job.material_needs_met() {
            return Transition::Push(State::haul(self.job));
        }

        let (tile, adjacent, category) = (job.tile, job.adjacent, job.category.clone());
        if !at_site(sim, tile, adjacent, agent.tile()) {
            let path = sim
                .pathfinder
                .find_path_to_tile(&sim.world, agent.tile(), tile, adjacent);
            if path.is_empty() {
                sim.jobs.mark_cant_reach(self.job, agent.id);
                return Transition::Abort;
            }
            return Transition::Push(State::move_along(path));
        }

        if agent.points.current <= 0.0 {
            return Transition::Continue;
        }
        let work = agent.points.spend_all() * sim.config.work_rate * agent.skills.multiplier(&category);
        match sim.jobs.do_work(&mut sim.world, self.job, work) {
            Some(WorkOutcome::Wasted) | None => Transition::Continue,
            Some(outcome) => {
                agent.skills.add_xp(&category, work * sim.config.xp_per_work);
                match outcome {
                    WorkOutcome::Progressed => Transition::Continue,
                    _ => Transition::Finished,
                }
            }
        }
    }

    /// Hand the job back to the queue unless it is already gone.
    pub(super) fn exit(&mut self, agent: &mut Agent, sim: &mut SimContext) {
        sim.jobs.release(self.job, agent.id);
    }
}
