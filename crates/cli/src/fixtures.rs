//! Builds a deterministic demo job for each [`crate::cli::Scenario`].
//! Job admission itself is out of scope for this workspace (spec.md §1);
//! these fixtures stand in for "a job already admitted and running" the
//! way a real `batchctl` daemon would receive it from the job scheduler.

use std::sync::Arc;

use batchctl_bitset::Bitmap;
use batchctl_scheduler::{
    Job, JobState, JobTable, NoopCheckpointPlugin, NoopSwitchPlugin, NullAccountingSink, NullAgent,
    SchedulerConfig,
};
use batchctl_scheduler::account::{NodeCoreLayout, ResourceAccount};
use batchctl_scheduler::adapters::NodeRegistry;
use batchctl_types::{JobId, UserId};

/// A node registry backing every demo job: every node is up, every node
/// reports the same configured CPU count regardless of `fast_schedule`.
pub struct AllNodesUp {
    cpu_count: u32,
}

impl AllNodesUp {
    pub fn new(cpu_count: u32) -> Self {
        Self { cpu_count }
    }
}

impl NodeRegistry for AllNodesUp {
    fn is_up(&self, _name: &str) -> bool {
        true
    }

    fn cpu_count(&self, _name: &str, _fast_schedule: bool) -> u32 {
        self.cpu_count
    }
}

/// A job with `node_count` nodes, each with `cpu_per_node` CPUs and
/// `mem_per_node` MiB, owned by a fixed demo user.
pub fn demo_job(node_count: usize, cpu_per_node: u32, mem_per_node: u64) -> Job {
    let mut layout = Vec::with_capacity(node_count);
    let mut offset = 0usize;
    for _ in 0..node_count {
        layout.push(NodeCoreLayout::new(1, cpu_per_node, offset));
        offset += cpu_per_node as usize;
    }
    let account = ResourceAccount::new(vec![cpu_per_node; node_count], vec![mem_per_node; node_count], layout);

    Job {
        job_id: JobId(1),
        owner: UserId(1000),
        node_names: (0..node_count).map(|i| format!("node{i}")).collect(),
        node_bitmap: Bitmap::ones(node_count),
        account,
        next_step_id: 0,
        steps: Vec::new(),
        kill_on_last_step: true,
        state: JobState::Running,
        suspended_at: None,
        deadline: None,
        requid: None,
    }
}

/// A job table containing a single demo job, and that job's id.
pub fn demo_job_table(node_count: usize, cpu_per_node: u32, mem_per_node: u64) -> (JobTable, JobId) {
    let job = demo_job(node_count, cpu_per_node, mem_per_node);
    let job_id = job.job_id;
    let mut jobs = JobTable::new();
    jobs.insert(job);
    (jobs, job_id)
}

/// A controller wired to no-op adapters and the given config, suitable
/// for every demo scenario (none of them exercise a real interconnect,
/// checkpoint backend, or accounting database).
pub fn demo_controller(config: SchedulerConfig, cpu_count: u32) -> batchctl_scheduler::Controller {
    batchctl_scheduler::Controller::new(
        config,
        Arc::new(NullAgent),
        Arc::new(NoopSwitchPlugin),
        Arc::new(NoopCheckpointPlugin),
        Arc::new(NullAccountingSink),
        Arc::new(AllNodesUp::new(cpu_count)),
    )
}
