//! C3 — the step record: identity, node/core sub-bitmaps, layout, exit
//! tracking, suspension accounting, and opaque plugin handles.

use batchctl_bitset::Bitmap;
use batchctl_types::{StepId, EXIT_CODE_UNSET};

use crate::adapters::{CheckpointHandle, SwitchHandle};

/// How tasks are laid out across a step's nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskDistribution {
    /// Fill nodes in order, packing tasks onto each before moving on.
    #[default]
    Block,
    /// Round-robin tasks across nodes.
    Cyclic,
    /// Caller-specified per-node task counts, requires switch support.
    Arbitrary,
}

/// Per-step-node task count and the node-list string presented to
/// clients, built from the final selected bitmap (§4.6: "always derived
/// from the final selected bitmap, even when the user supplied an
/// explicit list").
#[derive(Debug, Clone)]
pub struct StepLayout {
    /// Task count per step-node, in step-node-offset order.
    pub tasks_per_node: Vec<u32>,
    /// Comma-separated node names in step-node-offset order.
    pub node_list: String,
}

impl StepLayout {
    /// Total task count across every step-node.
    pub fn total_tasks(&self) -> u32 {
        self.tasks_per_node.iter().sum()
    }
}

/// A parallel task group within a job (C3).
///
/// Owned by its job's step list; created only through [`crate::lifecycle`]
/// operations. `release` performs the (idempotent) teardown of plugin
/// handles; a bare `Drop` only frees memory, since handle teardown may
/// require calling async adapter trait methods.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Unique, monotonically increasing step id within the owning job.
    pub step_id: StepId,
    /// Subset of the job's node bitmap this step runs on.
    pub step_node_bitmap: Bitmap,
    /// Step-node task layout and node-list string.
    pub layout: Option<StepLayout>,
    /// Subset of the job's core bitmap charged to this step. Empty for
    /// batch steps.
    pub core_bitmap: Bitmap,
    /// Lazily allocated on first partial completion; length equals the
    /// step-node count.
    pub exit_node_bitmap: Option<Bitmap>,
    /// `max` of every reported per-node return code; `EXIT_CODE_UNSET`
    /// until the first report.
    pub exit_code: i32,
    /// Original requested CPU count, preserved for reporting even though
    /// the selector may have ignored it (the `overcommit` case in §4.6).
    pub requested_cpu_count: u32,
    /// Requested memory per task, in MiB.
    pub mem_per_task: u64,
    /// Cyclic task distribution requested.
    pub cyclic: bool,
    /// Exclusive-node request.
    pub exclusive: bool,
    /// True for a batch step (consumes no explicit C5 resources).
    pub batch: bool,
    /// Unix-epoch seconds at step creation.
    pub start_time: i64,
    /// Reserved for a future live-suspend accounting query; the create
    /// path always leaves this at zero, and resume folds the closed
    /// interval straight into `tot_suspend_time`.
    pub pre_suspend_time: i64,
    /// Accumulated total suspended duration.
    pub tot_suspend_time: i64,
    /// Checkpoint interval in seconds; `0` disables periodic checkpoints.
    pub ckpt_interval: i64,
    /// Unix-epoch seconds of the last checkpoint tick.
    pub last_ckpt_time: i64,
    /// Directory checkpoint images are written to, if any.
    pub ckpt_path: String,
    /// Opaque per-step interconnect credential, `None` for batch steps.
    pub switch_handle: Option<SwitchHandle>,
    /// Opaque per-step checkpoint state.
    pub ckpt_handle: Option<CheckpointHandle>,
    /// Network type string passed through to the switch plugin.
    pub network: String,
    /// User-supplied step name.
    pub name: String,
    /// Requesting client host.
    pub host: String,
    /// Requesting client port.
    pub port: u16,
    released: bool,
}

impl StepRecord {
    /// Number of step-nodes (bits set in `step_node_bitmap`).
    pub fn step_node_count(&self) -> usize {
        self.step_node_bitmap.count_ones()
    }

    /// Count of unset bits in `exit_node_bitmap` ("remaining" in the
    /// partial-completion reply), or the full step-node count if no exit
    /// bitmap has been allocated yet.
    pub fn remaining(&self) -> usize {
        match &self.exit_node_bitmap {
            Some(bitmap) => bitmap.len() - bitmap.count_ones(),
            None => self.step_node_count(),
        }
    }

    /// Ensure `exit_node_bitmap` exists, lazily allocating it sized to
    /// the step-node count (invariant 6).
    pub fn ensure_exit_bitmap(&mut self) -> &mut Bitmap {
        if self.exit_node_bitmap.is_none() {
            self.exit_node_bitmap = Some(Bitmap::zeros(self.step_node_count()));
        }
        self.exit_node_bitmap.as_mut().expect("just allocated")
    }

    /// True once every step-node bit is set, or immediately for a step
    /// with zero step-nodes.
    pub fn is_fully_exited(&self) -> bool {
        self.remaining() == 0
    }

    /// Fold a newly reported return code into `exit_code` (`max` per
    /// §4.6).
    pub fn fold_exit_code(&mut self, reported_rc: i32) {
        self.exit_code = self.exit_code.max(reported_rc);
    }

    /// True if this record's handles have already been released.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release switch and checkpoint handles. Idempotent: a second call
    /// is a no-op (§4.3).
    pub fn release_handles(&mut self) -> (Option<SwitchHandle>, Option<CheckpointHandle>) {
        if self.released {
            return (None, None);
        }
        self.released = true;
        (self.switch_handle.take(), self.ckpt_handle.take())
    }
}

/// Builder used by [`crate::lifecycle`] to assemble a new step record in
/// one place, keeping field initialization out of the create path's
/// control flow.
pub struct StepRecordBuilder {
    step_id: StepId,
    step_node_bitmap: Bitmap,
    core_bitmap: Bitmap,
    requested_cpu_count: u32,
    mem_per_task: u64,
    cyclic: bool,
    exclusive: bool,
    batch: bool,
    start_time: i64,
    ckpt_interval: i64,
    ckpt_path: String,
    network: String,
    name: String,
    host: String,
    port: u16,
}

impl StepRecordBuilder {
    /// Start building a record for `step_id` over `step_node_bitmap`.
    pub fn new(step_id: StepId, step_node_bitmap: Bitmap, core_bitmap: Bitmap, start_time: i64) -> Self {
        Self {
            step_id,
            step_node_bitmap,
            core_bitmap,
            requested_cpu_count: 0,
            mem_per_task: 0,
            cyclic: false,
            exclusive: false,
            batch: false,
            start_time,
            ckpt_interval: 0,
            ckpt_path: String::new(),
            network: String::new(),
            name: String::new(),
            host: String::new(),
            port: 0,
        }
    }

    /// Set the requested CPU count preserved for reporting.
    pub fn requested_cpu_count(mut self, n: u32) -> Self {
        self.requested_cpu_count = n;
        self
    }

    /// Set memory-per-task.
    pub fn mem_per_task(mut self, mem: u64) -> Self {
        self.mem_per_task = mem;
        self
    }

    /// Set the cyclic distribution flag.
    pub fn cyclic(mut self, cyclic: bool) -> Self {
        self.cyclic = cyclic;
        self
    }

    /// Set the exclusive flag.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Mark this record as a batch step.
    pub fn batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    /// Set the checkpoint interval in seconds.
    pub fn ckpt_interval(mut self, secs: i64) -> Self {
        self.ckpt_interval = secs;
        self
    }

    /// Set the checkpoint image directory.
    pub fn ckpt_path(mut self, path: impl Into<String>) -> Self {
        self.ckpt_path = path.into();
        self
    }

    /// Set the network type string.
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Set the step name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the requesting client's host and port.
    pub fn client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Finish building, attaching `layout` and plugin handles.
    pub fn build(
        self,
        layout: Option<StepLayout>,
        switch_handle: Option<SwitchHandle>,
        ckpt_handle: Option<CheckpointHandle>,
    ) -> StepRecord {
        StepRecord {
            step_id: self.step_id,
            step_node_bitmap: self.step_node_bitmap,
            layout,
            core_bitmap: self.core_bitmap,
            exit_node_bitmap: None,
            exit_code: EXIT_CODE_UNSET,
            requested_cpu_count: self.requested_cpu_count,
            mem_per_task: self.mem_per_task,
            cyclic: self.cyclic,
            exclusive: self.exclusive,
            batch: self.batch,
            start_time: self.start_time,
            pre_suspend_time: 0,
            tot_suspend_time: 0,
            ckpt_interval: self.ckpt_interval,
            last_ckpt_time: self.start_time,
            ckpt_path: self.ckpt_path,
            switch_handle,
            ckpt_handle,
            network: self.network,
            name: self.name,
            host: self.host,
            port: self.port,
            released: false,
        }
    }
}
