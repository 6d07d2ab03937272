//! C8 — thin, narrow trait contracts over the four external collaborators
//! named in §6: the node-daemon agent, the switch/interconnect plugin,
//! the checkpoint plugin, and the accounting sink, plus the read-only
//! node registry the selector (C4) consults.
//!
//! The core never calls these directly over the network; it depends only
//! on these trait contracts, mirroring the teacher's `backend.rs` module
//! (a thin `reqwest`-based wrapper the engine calls through narrow
//! free functions) generalized to a swappable trait so the core can be
//! driven by a real agent/switch/checkpoint implementation in production
//! and by deterministic fakes in tests.

use async_trait::async_trait;
use batchctl_types::{JobId, StepId, SchedulerError};

/// Opaque per-step interconnect credential. Built once at step-create,
/// freed once at step-complete (or, for batch steps, never built).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchHandle(pub Vec<u8>);

/// Opaque per-step checkpoint state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointHandle(pub Vec<u8>);

/// Agent fan-out message kinds (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMessageType {
    /// Hard-terminate every task of the step.
    TerminateTasks,
    /// Deliver a signal to every task of the step.
    SignalTasks(i32),
}

/// Asynchronous RPC fan-out to compute nodes. `enqueue` must not block:
/// it publishes a message record and returns, exactly mirroring §5's
/// "the core publishes a message record and returns; the agent retries
/// up to a fixed bound."
pub trait Agent: Send + Sync {
    /// Enqueue `payload` for delivery to every host in `hostlist`,
    /// retried up to `retry_limit` times by the agent, independent of
    /// the caller.
    fn enqueue(&self, msg_type: AgentMessageType, hostlist: Vec<String>, payload: Vec<u8>, retry_limit: u32);
}

/// Checkpoint operation kinds (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointOp {
    /// Query whether checkpointing is possible.
    Able,
    /// Disable checkpointing for the step.
    Disable,
    /// Re-enable checkpointing for the step.
    Enable,
    /// Take a checkpoint now.
    Create,
    /// Checkpoint and terminate, vacating the allocation.
    Vacate,
    /// Restart from the most recent checkpoint.
    Restart,
    /// Report a checkpoint error.
    Error,
}

/// Result of a [`CheckpointPlugin::op`] call.
#[derive(Debug, Clone, Default)]
pub struct CheckpointOutcome {
    /// Unix-epoch seconds the event occurred.
    pub event_time: i64,
    /// Plugin-defined error code, `0` on success.
    pub error_code: i32,
    /// Human-readable error message, if any.
    pub error_msg: Option<String>,
}

/// The checkpoint plugin contract (§6).
#[async_trait]
pub trait CheckpointPlugin: Send + Sync {
    /// Allocate a fresh, empty checkpoint handle.
    fn allocate_jobinfo(&self) -> CheckpointHandle;

    /// Serialize a handle for persistence (used by C7).
    fn pack_jobinfo(&self, handle: &CheckpointHandle) -> Vec<u8>;

    /// Deserialize a handle previously produced by [`Self::pack_jobinfo`].
    fn unpack_jobinfo(&self, data: &[u8]) -> CheckpointHandle;

    /// Invoke a checkpoint operation against a live step.
    async fn op(
        &self,
        op: CheckpointOp,
        data: &[u8],
        step_id: StepId,
        handle: &CheckpointHandle,
    ) -> Result<CheckpointOutcome, SchedulerError>;

    /// True when this plugin is a real checkpoint backend (vs. the
    /// no-op default). The periodic checkpoint tick (§4.6) only walks
    /// running steps when this is true.
    fn is_trivial(&self) -> bool;
}

/// The switch/interconnect plugin contract (§6).
pub trait SwitchPlugin: Send + Sync {
    /// Allocate a fresh, empty switch handle.
    fn allocate_jobinfo(&self) -> SwitchHandle;

    /// Build per-step interconnect credentials for `node_list`. Fails
    /// with `SchedulerError::InterconnectFailure` if the switch refuses
    /// (§4.6: step-create undoes the step record on this failure).
    fn build_jobinfo(
        &self,
        handle: &mut SwitchHandle,
        node_list: &str,
        tasks_per_node: &[u32],
        cyclic: bool,
        network: &str,
    ) -> Result<(), SchedulerError>;

    /// Serialize a handle for persistence (used by C7).
    fn pack_jobinfo(&self, handle: &SwitchHandle) -> Vec<u8>;

    /// Deserialize a handle previously produced by [`Self::pack_jobinfo`].
    fn unpack_jobinfo(&self, data: &[u8]) -> SwitchHandle;

    /// Full step completion: release the switch handle for the whole
    /// step.
    fn job_step_complete(&self, handle: &SwitchHandle, node_list: &str);

    /// Partial completion: a subset of the step's nodes finished.
    /// Only called when [`Self::part_complete_supported`] is true.
    fn job_step_part_complete(&self, handle: &SwitchHandle, node_list: &str);

    /// Whether this plugin can act on a subset of a step's nodes before
    /// the whole step completes.
    fn part_complete_supported(&self) -> bool;

    /// Whether this plugin supports an arbitrary (caller-specified)
    /// per-node task distribution. When false, §4.5's explicit-node-list
    /// path silently promotes `Arbitrary` requests to `Block`.
    fn supports_arbitrary_distribution(&self) -> bool;
}

/// Per-step accounting facts recorded at start and completion (§6).
#[derive(Debug, Clone)]
pub struct StepAccountingRecord {
    /// Owning job id.
    pub job_id: JobId,
    /// Step id.
    pub step_id: StepId,
    /// Step name.
    pub name: String,
    /// Unix-epoch seconds the step started.
    pub start_time: i64,
    /// Unix-epoch seconds the step ended, if known.
    pub end_time: Option<i64>,
    /// Final exit code, if known.
    pub exit_code: Option<i32>,
    /// Elapsed wall-clock runtime excluding suspended time, in seconds.
    pub elapsed_secs: Option<i64>,
}

/// Best-effort accounting sink (§6). Every method may fail (e.g. a
/// transient database error); callers treat any error as non-fatal and
/// log it (§5), never propagating it as the primary outcome of an
/// operation.
#[async_trait]
pub trait AccountingSink: Send + Sync {
    /// Record that a step has started.
    async fn step_start(&self, record: &StepAccountingRecord) -> Result<(), SchedulerError>;

    /// Record that a step has completed.
    async fn step_complete(&self, record: &StepAccountingRecord) -> Result<(), SchedulerError>;

    /// Record that a job has completed.
    async fn job_complete(&self, job_id: JobId) -> Result<(), SchedulerError>;
}

/// Read-only view of cluster node state the selector (C4) consults.
/// Immutable during a single operation (§6).
pub trait NodeRegistry: Send + Sync {
    /// True if `name` is currently up and responsive.
    fn is_up(&self, name: &str) -> bool;

    /// CPU count for `name`: the live-detected count, or the
    /// admin-configured count when `fast_schedule` is set (§6's
    /// "fast-schedule" policy flag).
    fn cpu_count(&self, name: &str, fast_schedule: bool) -> u32;
}

/// A [`SwitchPlugin`] that performs no interconnect setup, modeled
/// directly on SLURM's `switch/none` plugin (every hook is a no-op that
/// always succeeds). The default for clusters without a high-speed
/// interconnect.
#[derive(Debug, Default)]
pub struct NoopSwitchPlugin;

impl SwitchPlugin for NoopSwitchPlugin {
    fn allocate_jobinfo(&self) -> SwitchHandle {
        SwitchHandle::default()
    }

    fn build_jobinfo(
        &self,
        _handle: &mut SwitchHandle,
        _node_list: &str,
        _tasks_per_node: &[u32],
        _cyclic: bool,
        _network: &str,
    ) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn pack_jobinfo(&self, _handle: &SwitchHandle) -> Vec<u8> {
        Vec::new()
    }

    fn unpack_jobinfo(&self, _data: &[u8]) -> SwitchHandle {
        SwitchHandle::default()
    }

    fn job_step_complete(&self, _handle: &SwitchHandle, _node_list: &str) {}

    fn job_step_part_complete(&self, _handle: &SwitchHandle, _node_list: &str) {}

    fn part_complete_supported(&self) -> bool {
        false
    }

    fn supports_arbitrary_distribution(&self) -> bool {
        true
    }
}

/// A [`CheckpointPlugin`] that performs no checkpointing; `is_trivial`
/// returns true so the periodic checkpoint tick never walks steps.
#[derive(Debug, Default)]
pub struct NoopCheckpointPlugin;

#[async_trait]
impl CheckpointPlugin for NoopCheckpointPlugin {
    fn allocate_jobinfo(&self) -> CheckpointHandle {
        CheckpointHandle::default()
    }

    fn pack_jobinfo(&self, _handle: &CheckpointHandle) -> Vec<u8> {
        Vec::new()
    }

    fn unpack_jobinfo(&self, _data: &[u8]) -> CheckpointHandle {
        CheckpointHandle::default()
    }

    async fn op(
        &self,
        _op: CheckpointOp,
        _data: &[u8],
        _step_id: StepId,
        _handle: &CheckpointHandle,
    ) -> Result<CheckpointOutcome, SchedulerError> {
        Ok(CheckpointOutcome::default())
    }

    fn is_trivial(&self) -> bool {
        true
    }
}

/// An [`AccountingSink`] that discards every record.
#[derive(Debug, Default)]
pub struct NullAccountingSink;

#[async_trait]
impl AccountingSink for NullAccountingSink {
    async fn step_start(&self, _record: &StepAccountingRecord) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn step_complete(&self, _record: &StepAccountingRecord) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn job_complete(&self, _job_id: JobId) -> Result<(), SchedulerError> {
        Ok(())
    }
}

/// An [`Agent`] that discards every message, for tests and for
/// deployments with no node daemons to drive.
#[derive(Debug, Default)]
pub struct NullAgent;

impl Agent for NullAgent {
    fn enqueue(&self, _msg_type: AgentMessageType, _hostlist: Vec<String>, _payload: Vec<u8>, _retry_limit: u32) {}
}
