//! The job record the core reads and mutates (spec.md §3, "Job
//! (external, only fields the core reads)"), and the table of jobs a
//! [`crate::lifecycle::Controller`] owns.
//!
//! Per Design Note 1, the job is the unique owner of its steps (a plain
//! `Vec<StepRecord>`); a step never holds a pointer back to its job, only
//! its stable `job_id`, resolved through [`JobTable`] when needed.

use std::collections::HashMap;

use batchctl_bitset::Bitmap;
use batchctl_types::{JobId, StepId, UserId};

use crate::account::ResourceAccount;
use crate::step::StepRecord;

/// Job run state, as observed by the core (admission and transitions
/// between these states happen in the job scheduler above; out of
/// scope per §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Allocated but not yet running.
    Pending,
    /// Running normally.
    Running,
    /// Suspended; no new steps may be created.
    Suspended,
    /// Tearing down; step teardown may still be in flight (see the Open
    /// Question in DESIGN.md on partial completion against a
    /// non-running job).
    Completing,
    /// Fully finished.
    Finished,
}

/// A job's view of its allocation, account, and step list — the only
/// fields the step-scheduler core reads or mutates (spec.md §3).
#[derive(Debug, Clone)]
pub struct Job {
    /// Stable numeric identifier.
    pub job_id: JobId,
    /// Owning user.
    pub owner: UserId,
    /// Cluster node names in dense job-node-index order.
    pub node_names: Vec<String>,
    /// Job-node-index-space bitmap of nodes allocated to the job. In this
    /// dense space the job owns every index it has a name for; this
    /// bitmap instead tracks which of those indices are currently "up"
    /// per the cluster's up-node table (§4.4 step 1's "cluster-up set"
    /// projected into job-node-index space), refreshed by the caller
    /// before a step-create that needs it.
    pub node_bitmap: Bitmap,
    /// Per-job resource account (C2).
    pub account: ResourceAccount,
    /// Next step id to assign; strictly increasing (invariant 5).
    pub next_step_id: u32,
    /// Live steps.
    pub steps: Vec<StepRecord>,
    /// If true, job completion follows the completion of the job's last
    /// step (§4.6 Full completion).
    pub kill_on_last_step: bool,
    /// Current run state.
    pub state: JobState,
    /// Unix-epoch seconds the job was last suspended, if currently
    /// suspended.
    pub suspended_at: Option<i64>,
    /// Unix-epoch seconds after which the job is considered past its
    /// deadline (§4.6 Create rejects steps against such jobs).
    pub deadline: Option<i64>,
    /// User id that requested a hard kill, if any (§4.6 Signal: "the
    /// first writer wins").
    pub requid: Option<UserId>,
}

impl Job {
    /// Number of job-nodes in this job's allocation.
    pub fn node_count(&self) -> usize {
        self.node_names.len()
    }

    /// Assign and return the next step id, advancing the counter.
    pub fn allocate_step_id(&mut self) -> StepId {
        let id = StepId(self.next_step_id);
        self.next_step_id += 1;
        id
    }

    /// Find a step by id.
    pub fn find_step(&self, step_id: StepId) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Find a step by id, mutably.
    pub fn find_step_mut(&mut self, step_id: StepId) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    /// Remove and return a step by id.
    pub fn remove_step(&mut self, step_id: StepId) -> Option<StepRecord> {
        let pos = self.steps.iter().position(|s| s.step_id == step_id)?;
        Some(self.steps.remove(pos))
    }

    /// Whether the job has any live steps.
    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Union of every non-batch step's `core_bitmap`, used only for
    /// consistency checks (invariant 4) since the live value is tracked
    /// incrementally in `account.core_used_bitmap`.
    pub fn union_of_step_cores(&self) -> Bitmap {
        let total = self.account.core_bitmap().len();
        self.steps
            .iter()
            .filter(|s| !s.batch)
            .fold(Bitmap::zeros(total), |acc, s| {
                acc.or(&s.core_bitmap).unwrap_or(acc)
            })
    }
}

/// The set of jobs the core manages. Mutated only from within the
/// composite lock (§5); this type provides no internal locking of its
/// own, by design — the caller (an RPC handler) holds the lock for the
/// duration of the operation.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<JobId, Job>,
}

impl JobTable {
    /// An empty job table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job.
    pub fn insert(&mut self, job: Job) {
        self.jobs.insert(job.job_id, job);
    }

    /// Look up a job by id.
    pub fn get(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    /// Look up a job by id, mutably.
    pub fn get_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&job_id)
    }

    /// Remove a job.
    pub fn remove(&mut self, job_id: JobId) -> Option<Job> {
        self.jobs.remove(&job_id)
    }

    /// Iterate every job.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Iterate every job, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }
}
