//! Jobs: the work queue actors pull from.

mod job;
mod manager;
mod template;

pub use job::{
    Job, JobAction, JobCallback, JobId, JobPriority, JobRunState, JobSnapshot, RequestedItem,
    ResumeTrigger, WorkOutcome,
};
pub use manager::{work_sites, Applicant, JobEvent, JobManager};
pub use template::JobTemplate;
