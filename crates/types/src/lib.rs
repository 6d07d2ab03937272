#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Identifiers, error kinds (§7), and sizing constants shared by every
//! `batchctl` crate. Kept intentionally small and dependency-light, the
//! same role the teacher gives `bbr-client-core`.

mod constants;
mod error;
mod ids;

pub use constants::*;
pub use error::SchedulerError;
pub use ids::{JobId, StepId, UserId};
