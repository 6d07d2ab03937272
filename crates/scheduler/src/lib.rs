//! Job-step scheduler and resource-accounting engine.
//!
//! This crate implements C1's caller (via [`batchctl_bitset`]) through
//! C8: the per-job resource account, step records, the node selector,
//! the core picker/charger, job lifecycle operations, record
//! (de)serialization, and the narrow adapter traits the core is driven
//! through. Every public operation here expects to be called while the
//! caller holds the composite job/step lock described by the crate's
//! design notes; none of these types take any lock of their own.

#[cfg(test)]
use proptest as _;

pub mod account;
pub mod adapters;
pub mod charger;
pub mod config;
pub mod job;
pub mod lifecycle;
pub mod selector;
pub mod serialize;
pub mod step;

pub use account::{NodeCoreLayout, ResourceAccount};
pub use adapters::{
    Agent, AgentMessageType, CheckpointHandle, CheckpointOp, CheckpointOutcome, CheckpointPlugin,
    NoopCheckpointPlugin, NoopSwitchPlugin, NodeRegistry, NullAccountingSink, NullAgent,
    StepAccountingRecord, SwitchHandle, SwitchPlugin, AccountingSink,
};
pub use config::SchedulerConfig;
pub use job::{Job, JobState, JobTable};
pub use lifecycle::{Controller, StepCompleteOutcome, StepCreateRequest, StepPartialCompleteOutcome};
pub use selector::{NodeRequest, NodeSelection};
pub use step::{StepLayout, StepRecord, StepRecordBuilder, TaskDistribution};
