//! Actor state machine.
//!
//! An actor runs one [`State`] at a time. States chain through `next`: a
//! state that needs help (a job that lacks materials, say) pushes a child
//! in front of itself, and when the child finishes the parent resumes where
//! it left off. Interrupting a state interrupts everything after it.
//!
//! | State | Does |
//! |-------|------|
//! | Idle  | dwells, looks for work, wanders to a random neighbour |
//! | Job   | gets materials, walks to the site, spends points on work |
//! | Move  | walks a precomputed tile path, waiting at closed doors |
//! | Haul  | fetches, picks up and delivers a job's materials |
//! | Dump  | gets rid of whatever the actor carries |

mod dump;
mod haul;
mod idle;
mod job;
mod move_to;

use colony_logic::{ActorId, TilePath, TilePos};

pub use dump::DumpState;
pub use haul::HaulState;
pub use idle::IdleState;
pub use job::JobState;
pub use move_to::MoveState;

use crate::components::{ActionPoints, Actor, Behavior, Carried, JobPreferences, Skills};
use crate::context::SimContext;
use crate::jobs::{Applicant, JobId};

/// Mutable view of one actor's components for the duration of an update.
pub struct Agent<'a> {
    pub id: ActorId,
    pub actor: &'a mut Actor,
    pub points: &'a mut ActionPoints,
    pub carried: &'a mut Carried,
    pub preferences: &'a JobPreferences,
    pub skills: &'a mut Skills,
}

impl Agent<'_> {
    pub fn tile(&self) -> TilePos {
        self.actor.tile
    }

    pub fn applicant(&self) -> Applicant<'_> {
        Applicant {
            actor: self.id,
            tile: self.actor.tile,
            preferences: self.preferences,
            carried: self.carried.inventory.as_ref(),
        }
    }
}

/// What the running state wants next.
#[derive(Debug)]
pub enum Transition {
    Continue,
    /// Done; resume the chained state, if any.
    Finished,
    /// Run this state first, then come back.
    Push(State),
    /// Replace this state, keeping the chain behind it.
    Switch(State),
    /// Give up on this state and everything chained after it.
    Abort,
}

#[derive(Debug)]
pub enum StateKind {
    Idle(IdleState),
    Job(JobState),
    Move(MoveState),
    Haul(HaulState),
    Dump(DumpState),
}

#[derive(Debug)]
pub struct State {
    pub kind: StateKind,
    pub next: Option<Box<State>>,
}

impl State {
    fn new(kind: StateKind) -> Self {
        Self { kind, next: None }
    }

    pub fn idle() -> Self {
        Self::new(StateKind::Idle(IdleState::default()))
    }

    pub fn job(job: JobId) -> Self {
        Self::new(StateKind::Job(JobState::new(job)))
    }

    pub fn move_along(path: TilePath) -> Self {
        Self::new(StateKind::Move(MoveState::new(path)))
    }

    pub fn haul(job: JobId) -> Self {
        Self::new(StateKind::Haul(HaulState::new(job)))
    }

    pub fn dump() -> Self {
        Self::new(StateKind::Dump(DumpState::default()))
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            StateKind::Idle(_) => "Idle",
            StateKind::Job(_) => "Job",
            StateKind::Move(_) => "Move",
            StateKind::Haul(_) => "Haul",
            StateKind::Dump(_) => "Dump",
        }
    }

    /// The job this state or anything chained after it works toward.
    pub fn job_id(&self) -> Option<JobId> {
        let own = match &self.kind {
            StateKind::Job(s) => Some(s.job),
            StateKind::Haul(s) => Some(s.job),
            _ => None,
        };
        own.or_else(|| self.next.as_ref().and_then(|n| n.job_id()))
    }

    fn enter(&mut self, agent: &mut Agent, sim: &mut SimContext) {
        match &mut self.kind {
            StateKind::Idle(s) => s.enter(agent, sim),
            StateKind::Move(s) => s.enter(agent, sim),
            StateKind::Job(_) | StateKind::Haul(_) | StateKind::Dump(_) => {}
        }
    }

    fn update(&mut self, agent: &mut Agent, sim: &mut SimContext, delta: f32) -> Transition {
        match &mut self.kind {
            StateKind::Idle(s) => s.update(agent, sim, delta),
            StateKind::Job(s) => s.update(agent, sim),
            StateKind::Move(s) => s.update(agent, sim),
            StateKind::Haul(s) => s.update(agent, sim),
            StateKind::Dump(s) => s.update(agent, sim),
        }
    }

    /// Normal teardown of this state alone.
    fn exit(&mut self, agent: &mut Agent, sim: &mut SimContext) {
        match &mut self.kind {
            StateKind::Job(s) => s.exit(agent, sim),
            StateKind::Haul(s) => s.release(agent, sim),
            StateKind::Idle(_) | StateKind::Move(_) | StateKind::Dump(_) => {}
        }
    }

    /// Release claims held by this state, then by the rest of the chain.
    pub fn interrupt(mut self, agent: &mut Agent, sim: &mut SimContext) {
        log::debug!(target: "actors", "{}: interrupting {}", agent.id, self.name());
        match &mut self.kind {
            StateKind::Job(s) => s.exit(agent, sim),
            StateKind::Haul(s) => s.release(agent, sim),
            StateKind::Idle(_) | StateKind::Move(_) | StateKind::Dump(_) => {}
        }
        if let Some(next) = self.next.take() {
            next.interrupt(agent, sim);
        }
    }
}

impl Behavior {
    /// Interrupt whatever runs and start `state` now.
    pub fn set_state(&mut self, mut state: State, agent: &mut Agent, sim: &mut SimContext) {
        self.interrupt(agent, sim);
        state.enter(agent, sim);
        self.state = Some(state);
    }

    /// Run `state` once the current chain is done.
    pub fn queue_state(&mut self, state: State) {
        self.queued.push_back(state);
    }

    /// Drop the current chain, releasing its claims.
    pub fn interrupt(&mut self, agent: &mut Agent, sim: &mut SimContext) {
        if let Some(state) = self.state.take() {
            state.interrupt(agent, sim);
        }
    }

    /// Make `job` the next thing this actor works on.
    pub fn prioritize_job(&mut self, job: JobId, agent: &mut Agent, sim: &mut SimContext) {
        self.interrupt(agent, sim);
        self.prioritized_job = Some(job);
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.state.as_ref().map(State::name)
    }

    /// One tick: pick a state when there is none, then run it once.
    pub fn update(&mut self, agent: &mut Agent, sim: &mut SimContext, delta: f32) {
        if self.state.is_none() {
            let mut next = self.pick_next(agent, sim);
            log::debug!(target: "actors", "{}: starting {}", agent.id, next.name());
            next.enter(agent, sim);
            self.state = Some(next);
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match state.update(agent, sim, delta) {
            Transition::Continue => {}
            Transition::Finished => {
                if let Some(mut done) = self.state.take() {
                    done.exit(agent, sim);
                    self.state = done.next.take().map(|parent| *parent);
                    if let Some(parent) = &self.state {
                        log::trace!(target: "actors", "{}: {} -> {}", agent.id, done.name(), parent.name());
                    }
                }
            }
            Transition::Push(mut child) => {
                log::trace!(target: "actors", "{}: {} pushes {}", agent.id, state.name(), child.name());
                child.enter(agent, sim);
                let parent = self.state.take().map(Box::new);
                child.next = parent;
                self.state = Some(child);
            }
            Transition::Switch(mut replacement) => {
                if let Some(mut old) = self.state.take() {
                    old.exit(agent, sim);
                    log::trace!(target: "actors", "{}: {} -> {}", agent.id, old.name(), replacement.name());
                    replacement.next = old.next.take();
                }
                replacement.enter(agent, sim);
                self.state = Some(replacement);
            }
            Transition::Abort => {
                if let Some(state) = self.state.take() {
                    log::debug!(target: "actors", "{}: {} aborted", agent.id, state.name());
                    state.interrupt(agent, sim);
                }
                self.cooling_down = true;
            }
        }
    }

    /// Queued states first, then getting rid of carried items, then a
    /// prioritized job, then the job queue, then idling. Right after an
    /// abort the actor idles instead of retrying at once.
    fn pick_next(&mut self, agent: &mut Agent, sim: &mut SimContext) -> State {
        if let Some(state) = self.queued.pop_front() {
            return state;
        }
        if std::mem::take(&mut self.cooling_down) {
            return State::idle();
        }
        if !agent.carried.is_empty() {
            return State::dump();
        }
        if let Some(job) = self.prioritized_job.take() {
            if sim.jobs.claim(job, agent.id) {
                return State::job(job);
            }
            log::debug!(target: "actors", "{}: prioritized {} is not available", agent.id, job);
        }
        let applicant = agent.applicant();
        match sim.jobs.get_job(&sim.world, &mut sim.pathfinder, &applicant) {
            Some(job) => State::job(job),
            None => State::idle(),
        }
    }
}

/// Whether `pos` is a tile the job can be worked from.
pub(crate) fn at_site(sim: &SimContext, job_tile: TilePos, adjacent: bool, pos: TilePos) -> bool {
    colony_logic::goals::goal_tile_evaluator(&sim.world, job_tile, adjacent)(pos)
}

/// Owned components for driving a single state in tests.
#[cfg(test)]
pub(crate) struct TestBody {
    pub actor: Actor,
    pub points: ActionPoints,
    pub carried: Carried,
    pub preferences: JobPreferences,
    pub skills: Skills,
}

#[cfg(test)]
impl TestBody {
    pub fn at(id: u64, tile: TilePos) -> Self {
        Self {
            actor: Actor {
                id: ActorId(id),
                name: format!("actor{}", id),
                tile,
            },
            points: ActionPoints::new(4.0, 8.0),
            carried: Carried::new(50),
            preferences: JobPreferences::default(),
            skills: Skills::default(),
        }
    }

    pub fn agent(&mut self) -> Agent<'_> {
        Agent {
            id: self.actor.id,
            actor: &mut self.actor,
            points: &mut self.points,
            carried: &mut self.carried,
            preferences: &self.preferences,
            skills: &mut self.skills,
        }
    }
}
