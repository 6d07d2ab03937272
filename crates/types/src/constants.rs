/// Maximum tasks permitted on a single node, bounding §4.6's task-count
/// validation: `task_count in [1, nodes * MAX_TASKS_PER_NODE]`.
pub const MAX_TASKS_PER_NODE: u32 = 512;

/// Maximum length, in bytes, of any request string (name, network, host,
/// checkpoint path) before `SchedulerError::PathnameTooLong` is returned.
pub const MAX_REQUEST_STRING_LEN: usize = 1024;

/// Default bound on agent fan-out retries (§5 "Cancellation / timeout":
/// "the agent applies its own retry bound (default 10 attempts) and gives
/// up silently"). Recovered from `original_source`'s
/// `branches/core_bitmaps/src/slurmctld/step_mgr.c`, which defines
/// `MAX_RETRIES 10` for the same purpose.
pub const DEFAULT_AGENT_RETRY_LIMIT: u32 = 10;

/// Sentinel step exit code meaning "not yet set".
pub const EXIT_CODE_UNSET: i32 = i32::MIN;

/// Sentinel meaning "every node" in a step-create node-count request.
pub const NODE_COUNT_INFINITE: u32 = u32::MAX;

/// Sentinel meaning "unspecified" in a step-create CPU-count request.
pub const CPU_COUNT_UNSPECIFIED: u32 = u32::MAX;
