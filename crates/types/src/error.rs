use batchctl_bitset::BitmapError;
use thiserror::Error;

/// The error kinds the core surfaces to RPC handlers (spec.md §7).
///
/// Every inbound RPC handler reports the most specific variant it can;
/// refund/accounting/switch-teardown failures are never surfaced through
/// this type (§7 propagation policy: they are logged and swallowed inside
/// the core).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Job or step not found.
    #[error("invalid job or step id")]
    InvalidJobId,

    /// Caller is neither the job owner nor superuser.
    #[error("access denied")]
    AccessDenied,

    /// Job/step is already finished; the requested operation is idempotent
    /// and nothing further happens.
    #[error("job or step already complete")]
    AlreadyDone,

    /// Job is suspended or otherwise inoperable for the requested op.
    #[error("job is disabled for this operation")]
    Disabled,

    /// Job is not running; a signal was dropped rather than delivered.
    #[error("job is not in a running state; signal not delivered")]
    TransitionStateNoUpdate,

    /// Request cannot be satisfied by the job's allocation at all.
    #[error("request exceeds the job's total allocation")]
    ConfigUnavailable,

    /// Request could be satisfied if resources freed up.
    #[error("insufficient idle resources; retry later")]
    NodesBusy,

    /// Memory-per-task exceeds every eligible node.
    #[error("requested memory per task exceeds every eligible node")]
    InvalidTaskMemory,

    /// Task distribution not supported by the configured switch.
    #[error("requested task distribution is not supported")]
    BadDist,

    /// Task count outside `[1, nodes * MAX_TASKS_PER_NODE]`.
    #[error("task count out of range")]
    BadTaskCount,

    /// The switch plugin refused to build jobinfo for the step.
    #[error("interconnect failed to allocate step credentials")]
    InterconnectFailure,

    /// A request string (name, network, host, path) exceeded the
    /// configured maximum length.
    #[error("request string exceeds configured maximum length")]
    PathnameTooLong,

    /// A batch step was requested against a still-pending job (§4.6
    /// special case, reported as a duplicate-id error rather than a plain
    /// reject).
    #[error("duplicate job id")]
    DuplicateJobId,

    /// A bitmap operation inside the core failed; see the wrapped error.
    #[error("bitmap error: {0}")]
    Bitmap(#[from] BitmapError),
}
