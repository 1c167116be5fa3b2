//! Job queues per category, assignment, suspension and resumption.
//!
//! Assignment scans in two phases. Readiness of every candidate is
//! evaluated first without touching any job; suspensions and
//! unreachability marks found during the scan are applied only after a
//! job has been chosen, so one actor's scan never hides a job from the
//! decision it is making.

use std::collections::{BTreeMap, BTreeSet};

use colony_logic::{ActorId, Inventory, Pathfinder, RoomId, TilePos, World, WorldEvent};

use super::job::{Job, JobId, JobRunState, JobSnapshot, ResumeTrigger, WorkOutcome};
use super::template::JobTemplate;
use crate::components::{JobPreferences, MAX_PREFERENCE_LEVEL};
use crate::config::SimConfig;
use crate::observers::Observers;

/// Something that happened to a job, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Created(JobId),
    Claimed { job: JobId, actor: ActorId },
    Released { job: JobId, actor: ActorId },
    Suspended { job: JobId, state: JobRunState },
    Resumed(JobId),
    Completed(JobId),
    Cancelled(JobId),
    Removed(JobId),
}

/// The actor asking for work.
#[derive(Debug, Clone, Copy)]
pub struct Applicant<'a> {
    pub actor: ActorId,
    pub tile: TilePos,
    pub preferences: &'a JobPreferences,
    pub carried: Option<&'a Inventory>,
}

/// Side effect discovered while evaluating readiness.
#[derive(Debug)]
enum Deferred {
    Suspend(JobId, JobRunState, Vec<ResumeTrigger>),
    CantReach(JobId, ActorId),
}

pub struct JobManager {
    categories: Vec<String>,
    queues: BTreeMap<String, BTreeSet<JobId>>,
    jobs: BTreeMap<JobId, Job>,
    next_id: u64,
    max_stack_size: u32,
    events: Vec<JobEvent>,
    pub on_created: Observers<dyn FnMut(&Job)>,
    pub on_modified: Observers<dyn FnMut(&Job)>,
    pub on_removed: Observers<dyn FnMut(&Job)>,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("categories", &self.categories)
            .field("jobs", &self.jobs.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl JobManager {
    pub fn new(config: &SimConfig) -> Self {
        let categories: Vec<String> = config.category_names().map(String::from).collect();
        let queues = categories
            .iter()
            .map(|c| (c.clone(), BTreeSet::new()))
            .collect();
        Self {
            categories,
            queues,
            jobs: BTreeMap::new(),
            next_id: 1,
            max_stack_size: config.max_stack_size,
            events: Vec::new(),
            on_created: Observers::new(),
            on_modified: Observers::new(),
            on_removed: Observers::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    /// Every queued job, by id.
    pub fn peek_all_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn jobs_in_category<'a>(&'a self, category: &str) -> impl Iterator<Item = &'a Job> + 'a {
        self.queues
            .get(category)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.jobs.get(id))
    }

    /// A fresh job from `template` with the next free id. Not queued yet.
    pub fn create_job(&mut self, template: &JobTemplate, tile: TilePos) -> Job {
        let id = JobId(self.next_id);
        self.next_id += 1;
        template.build(id, tile)
    }

    pub fn enqueue_template(
        &mut self,
        world: &mut World,
        template: &JobTemplate,
        tile: TilePos,
    ) -> Option<JobId> {
        let job = self.create_job(template, tile);
        self.enqueue(world, job)
    }

    /// Queue `job` unclaimed under its category. A job with negative cost is
    /// already done: its action runs now and it is never queued. Returns the
    /// id when the job was queued.
    pub fn enqueue(&mut self, world: &mut World, mut job: Job) -> Option<JobId> {
        if job.cost < 0.0 {
            log::debug!(target: "jobs", "{} '{}' completes on enqueue", job.id, job.name);
            job.action.apply(world, job.tile, self.max_stack_size);
            job.fire_completed();
            job.fire_stopped();
            return None;
        }
        let Some(queue) = self.queues.get_mut(&job.category) else {
            log::warn!(target: "jobs", "unknown job category '{}' for '{}'", job.category, job.name);
            return None;
        };
        if self.jobs.contains_key(&job.id) {
            log::warn!(target: "jobs", "{} is already queued", job.id);
            return None;
        }
        let id = job.id;
        self.next_id = self.next_id.max(id.0 + 1);
        job.worker = None;
        queue.insert(id);
        log::info!(target: "jobs", "queued {} '{}' at {} [{}]", id, job.name, job.tile, job.category);
        self.jobs.insert(id, job);
        self.events.push(JobEvent::Created(id));
        if let Some(job) = self.jobs.get(&id) {
            self.on_created.notify(job);
        }
        Some(id)
    }

    /// Delete a job from its queue. Returns it when it existed.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let job = self.jobs.remove(&id)?;
        if let Some(queue) = self.queues.get_mut(&job.category) {
            queue.remove(&id);
        }
        log::debug!(target: "jobs", "removed {} '{}'", id, job.name);
        self.events.push(JobEvent::Removed(id));
        self.on_removed.notify(&job);
        Some(job)
    }

    /// Abandon a job: fire its stopped callbacks and remove it.
    pub fn cancel_job(&mut self, id: JobId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        job.fire_stopped();
        self.events.push(JobEvent::Cancelled(id));
        self.remove(id).is_some()
    }

    // ── Claims ─────────────────────────────────────────────────────────

    /// Make `actor` the job's worker. Fails when someone else holds it.
    pub fn claim(&mut self, id: JobId, actor: ActorId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        match job.worker {
            Some(current) if current != actor => false,
            Some(_) => true,
            None => {
                job.worker = Some(actor);
                self.events.push(JobEvent::Claimed { job: id, actor });
                self.notify_modified(id);
                true
            }
        }
    }

    /// `actor` stops working the job. Need-driven jobs are discarded; all
    /// others stay queued for the next applicant.
    pub fn release(&mut self, id: JobId, actor: ActorId) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.worker != Some(actor) {
            return;
        }
        job.worker = None;
        self.events.push(JobEvent::Released { job: id, actor });
        if job.is_need {
            log::debug!(target: "jobs", "discarding need job {}", id);
            self.remove(id);
        } else {
            self.notify_modified(id);
        }
    }

    // ── Work ───────────────────────────────────────────────────────────

    /// Hand items to a job; returns what it did not take.
    pub fn deliver(&mut self, id: JobId, inventory: Inventory) -> Option<Inventory> {
        let Some(job) = self.jobs.get_mut(&id) else {
            return Some(inventory);
        };
        let rest = job.deliver(inventory);
        self.notify_modified(id);
        rest
    }

    /// Apply work and carry out the job's action on completion. Finished
    /// one-shot jobs leave the queue.
    pub fn do_work(&mut self, world: &mut World, id: JobId, amount: f32) -> Option<WorkOutcome> {
        let job = self.jobs.get_mut(&id)?;
        let outcome = job.do_work(amount);
        match outcome {
            WorkOutcome::Completed | WorkOutcome::Repeated => {
                job.action.apply(world, job.tile, self.max_stack_size);
                log::info!(target: "jobs", "completed {} '{}'", id, job.name);
                self.events.push(JobEvent::Completed(id));
                if outcome == WorkOutcome::Completed {
                    self.remove(id);
                } else {
                    self.notify_modified(id);
                }
            }
            WorkOutcome::Progressed => self.notify_modified(id),
            WorkOutcome::Wasted => {}
        }
        Some(outcome)
    }

    // ── Suspension ─────────────────────────────────────────────────────

    pub fn suspend(&mut self, id: JobId, state: JobRunState, triggers: Vec<ResumeTrigger>) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.suspended {
            job.resume_on.extend(triggers);
            return;
        }
        log::debug!(target: "jobs", "suspending {} '{}': {:?}", id, job.name, state);
        job.suspended = true;
        job.resume_on = triggers;
        self.events.push(JobEvent::Suspended { job: id, state });
        self.notify_modified(id);
    }

    pub fn resume(&mut self, id: JobId) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if !job.suspended {
            return;
        }
        log::debug!(target: "jobs", "resuming {} '{}'", id, job.name);
        job.suspended = false;
        job.resume_on.clear();
        self.events.push(JobEvent::Resumed(id));
        self.notify_modified(id);
    }

    /// Record that `actor` cannot get to the job.
    pub fn mark_cant_reach(&mut self, id: JobId, actor: ActorId) {
        if let Some(job) = self.jobs.get_mut(&id) {
            if job.cant_reach.insert(actor) {
                log::debug!(target: "jobs", "{} cannot reach {} '{}'", actor, id, job.name);
            }
        }
    }

    /// Resume jobs whose triggers match and forget unreachability marks
    /// after topology changes.
    pub fn handle_world_events(&mut self, events: &[WorldEvent]) {
        if events.is_empty() {
            return;
        }
        let topology_changed = events
            .iter()
            .any(|e| matches!(e, WorldEvent::RoomsChanged | WorldEvent::TileChanged(_)));
        if topology_changed {
            for job in self.jobs.values_mut() {
                job.cant_reach.clear();
            }
        }
        let to_resume: Vec<JobId> = self
            .jobs
            .values()
            .filter(|job| job.suspended)
            .filter(|job| {
                job.resume_on
                    .iter()
                    .any(|trigger| events.iter().any(|e| trigger.matches(e)))
            })
            .map(|job| job.id)
            .collect();
        for id in to_resume {
            self.resume(id);
        }
    }

    pub fn drain_events(&mut self) -> Vec<JobEvent> {
        std::mem::take(&mut self.events)
    }

    fn notify_modified(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get(&id) {
            self.on_modified.notify(job);
        }
    }

    // ── Assignment ─────────────────────────────────────────────────────

    /// Readiness of `job` for `applicant`, plus the side effect the result
    /// calls for. Does not modify anything.
    pub fn can_job_run(
        &self,
        world: &World,
        pathfinder: &mut Pathfinder,
        job: &Job,
        applicant: &Applicant<'_>,
    ) -> JobRunState {
        evaluate(world, pathfinder, job, applicant).0
    }

    /// Pick and claim the best job for `applicant`: preference levels from
    /// most to least preferred, categories in configured order, then the
    /// most urgent ready priority, then the shortest path time. Returns
    /// `None` when nothing is assignable.
    pub fn get_job(
        &mut self,
        world: &World,
        pathfinder: &mut Pathfinder,
        applicant: &Applicant<'_>,
    ) -> Option<JobId> {
        let mut deferred = Vec::new();
        let chosen = self.select(world, pathfinder, applicant, &mut deferred);
        for effect in deferred {
            match effect {
                Deferred::Suspend(id, state, triggers) => self.suspend(id, state, triggers),
                Deferred::CantReach(id, actor) => self.mark_cant_reach(id, actor),
            }
        }
        let id = chosen?;
        if self.claim(id, applicant.actor) {
            log::debug!(target: "jobs", "{} takes {}", applicant.actor, id);
            Some(id)
        } else {
            None
        }
    }

    fn select(
        &self,
        world: &World,
        pathfinder: &mut Pathfinder,
        applicant: &Applicant<'_>,
        deferred: &mut Vec<Deferred>,
    ) -> Option<JobId> {
        for level in 1..=MAX_PREFERENCE_LEVEL {
            for category in &self.categories {
                if applicant.preferences.level(category) != Some(level) {
                    continue;
                }
                let Some(queue) = self.queues.get(category) else {
                    continue;
                };

                let mut ready = Vec::new();
                for job in queue.iter().filter_map(|id| self.jobs.get(id)) {
                    if job.is_being_worked() || job.is_unreachable_for(applicant.actor) {
                        continue;
                    }
                    let (state, effect) = evaluate(world, pathfinder, job, applicant);
                    if state == JobRunState::Active {
                        ready.push((job.priority, job.id));
                    } else if let Some(effect) = effect {
                        deferred.push(effect);
                    }
                }
                ready.sort();

                // Most urgent priority first; if none of its jobs has a
                // path, fall back to the next priority.
                let mut start = 0;
                while start < ready.len() {
                    let priority = ready[start].0;
                    let end = ready[start..]
                        .iter()
                        .position(|(p, _)| *p != priority)
                        .map_or(ready.len(), |n| start + n);
                    let mut best: Option<(f32, JobId)> = None;
                    for &(_, id) in &ready[start..end] {
                        let Some(job) = self.jobs.get(&id) else {
                            continue;
                        };
                        let budget = best.map(|(time, _)| time);
                        let time = pathfinder.find_min_path_time(
                            world,
                            applicant.tile,
                            job.tile,
                            job.adjacent,
                            budget,
                        );
                        if time.is_finite() && best.map_or(true, |(t, _)| time < t) {
                            best = Some((time, id));
                        }
                    }
                    if let Some((_, id)) = best {
                        return Some(id);
                    }
                    for &(_, id) in &ready[start..end] {
                        deferred.push(Deferred::CantReach(id, applicant.actor));
                    }
                    start = end;
                }
            }
        }
        None
    }

    // ── Persistence ────────────────────────────────────────────────────

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.jobs.values().map(Job::snapshot).collect()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Replace all jobs with restored snapshots. Jobs in categories this
    /// configuration does not know are dropped.
    pub fn restore(&mut self, snapshots: Vec<JobSnapshot>, next_id: u64) {
        self.jobs.clear();
        for queue in self.queues.values_mut() {
            queue.clear();
        }
        self.next_id = next_id.max(1);
        for snapshot in snapshots {
            let job = Job::from_snapshot(snapshot);
            let Some(queue) = self.queues.get_mut(&job.category) else {
                log::warn!(target: "jobs", "dropping {} in unknown category '{}'", job.id, job.category);
                continue;
            };
            queue.insert(job.id);
            self.next_id = self.next_id.max(job.id.0 + 1);
            self.jobs.insert(job.id, job);
        }
    }
}

/// Tiles an actor may stand on to work `job`.
pub fn work_sites(world: &World, job: &Job) -> Vec<TilePos> {
    if !job.adjacent {
        return vec![job.tile];
    }
    let evaluator = colony_logic::goals::goal_tile_evaluator(world, job.tile, true);
    job.tile
        .orthogonal()
        .into_iter()
        .chain([job.tile.above(), job.tile.below()])
        .filter(|p| world.is_walkable(*p) && evaluator(*p))
        .collect()
}

fn evaluate(
    world: &World,
    pathfinder: &mut Pathfinder,
    job: &Job,
    applicant: &Applicant<'_>,
) -> (JobRunState, Option<Deferred>) {
    if job.suspended {
        return (JobRunState::Suspended, None);
    }
    if job.is_unreachable_for(applicant.actor) {
        return (JobRunState::CantReach, None);
    }

    let sites = work_sites(world, job);
    if sites.is_empty() || (!job.adjacent && !world.is_walkable(job.tile)) {
        let triggers = vec![ResumeTrigger::RoomsChanged, ResumeTrigger::TileChanged(job.tile)];
        return (
            JobRunState::CantReach,
            Some(Deferred::Suspend(job.id, JobRunState::CantReach, triggers)),
        );
    }

    let target_rooms: BTreeSet<RoomId> = sites
        .iter()
        .filter_map(|p| world.room_of(*p))
        .collect();
    if !target_rooms.is_empty() {
        if let Some(actor_room) = pathfinder.find_nearest_room(world, applicant.tile) {
            if !pathfinder.is_room_reachable(world, actor_room, &target_rooms) {
                return (
                    JobRunState::CantReach,
                    Some(Deferred::CantReach(job.id, applicant.actor)),
                );
            }
        }
    }

    let carried = |item_type: &str| {
        applicant
            .carried
            .filter(|inv| inv.item_type == item_type)
            .map_or(0, |inv| inv.stack_size)
    };
    let unavailable: Vec<ResumeTrigger> = job
        .missing_items()
        .filter(|&t| world.total_stocked(t, job.can_take_from_stockpile) + carried(t) == 0)
        .map(|t| ResumeTrigger::InventoryCreated(t.to_string()))
        .collect();
    if !unavailable.is_empty() {
        return (
            JobRunState::MissingInventory,
            Some(Deferred::Suspend(job.id, JobRunState::MissingInventory, unavailable)),
        );
    }

    (JobRunState::Active, None)
}
