//! Ambient tuning knobs for the core, deserializable the way the teacher
//! loads `submitter.rs`'s config from an `XDG_CONFIG_HOME`-relative JSON
//! file — loading itself lives in `batchctl-cli::config`, this crate only
//! owns the shape and its defaults.

use batchctl_types::{DEFAULT_AGENT_RETRY_LIMIT, MAX_REQUEST_STRING_LEN, MAX_TASKS_PER_NODE};
use serde::{Deserialize, Serialize};

/// Whether the agent fans a message out to every step node or collapses
/// it to a single front-end host (§4.6 Signal: "Front-end deployments
/// collapse fan-out to a single node").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontEndMode {
    /// Send to every node in the step's bitmap.
    PerNode,
    /// Collapse to a single front-end hostname supplied by the node
    /// registry.
    Collapsed,
}

impl Default for FrontEndMode {
    fn default() -> Self {
        Self::PerNode
    }
}

/// Tunable limits consulted by C4/C5/C6 that spec.md leaves as named
/// constants or policy flags rather than hardcoded behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound on tasks per node for §4.6's task-count validation.
    pub max_tasks_per_node: u32,
    /// Maximum length of any request string before `PathnameTooLong`.
    pub max_path_len: usize,
    /// When true, the node registry's configured CPU count is used in
    /// place of the live-detected count (§6's "fast-schedule" flag).
    pub fast_schedule: bool,
    /// Bound on agent fan-out retry attempts (§5, §0).
    pub agent_retry_limit: u32,
    /// Caps how many additional, already-used cores a node may hand out
    /// to a single step's second (over-subscription) pass (invariant 3).
    /// Zero means unlimited.
    pub oversubscribe_cpu_slack: u32,
    /// Agent fan-out collapse policy.
    pub front_end_mode: FrontEndMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_node: MAX_TASKS_PER_NODE,
            max_path_len: MAX_REQUEST_STRING_LEN,
            fast_schedule: false,
            agent_retry_limit: DEFAULT_AGENT_RETRY_LIMIT,
            oversubscribe_cpu_slack: 0,
            front_end_mode: FrontEndMode::PerNode,
        }
    }
}
