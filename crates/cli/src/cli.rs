use clap::{Parser, Subcommand, ValueEnum};

/// Demonstration scenarios, each seeding a single in-memory job and
/// driving it through a handful of `Controller` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Two-node job, a step that fits entirely within idle cores.
    BasicFit,
    /// A step requesting more tasks per node than idle cores allow,
    /// forcing over-subscription.
    Oversubscription,
    /// A step naming an explicit node list that the switch can't honor
    /// as an arbitrary distribution.
    ExplicitList,
    /// A step completed in two node-range batches.
    PartialCompletion,
    /// A step suspended, then resumed, then completed.
    SuspendResume,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scripted scenario against an in-memory controller and print
    /// each step's outcome.
    Demo {
        #[arg(value_enum)]
        scenario: Scenario,
    },
    /// Print the scheduler config that would be loaded, without running
    /// anything.
    ShowConfig,
}

#[derive(Debug, Parser)]
#[command(name = "batchctl", version, about = "batchctl step scheduler demo front-end")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}
