//! One function per [`crate::cli::Scenario`], each driving the public
//! `Controller` API against a fixture job and printing what happened.

use batchctl_bitset::Bitmap;
use batchctl_scheduler::selector::NodeRequest;
use batchctl_scheduler::{SchedulerConfig, StepCreateRequest, TaskDistribution};
use batchctl_types::UserId;

use crate::fixtures::{demo_controller, demo_job_table};

async fn run_basic_fit() -> anyhow::Result<()> {
    let (mut jobs, job_id) = demo_job_table(2, 4, 8192);
    let ctl = demo_controller(SchedulerConfig::default(), 4);

    let request = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(2),
            task_count: 8,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        ..Default::default()
    };

    let (step_id, node_list) = ctl.step_create(&mut jobs, job_id, request).await?;
    println!("created step {step_id} on [{node_list}]");

    let outcome = ctl.step_complete(&mut jobs, job_id, step_id, 0).await?;
    println!("completed step {step_id}, triggers_job_completion={}", outcome.triggers_job_completion);
    Ok(())
}

async fn run_oversubscription() -> anyhow::Result<()> {
    let (mut jobs, job_id) = demo_job_table(1, 4, 8192);
    let ctl = demo_controller(SchedulerConfig::default(), 4);

    let first = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(1),
            task_count: 4,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        ..Default::default()
    };
    let (first_id, _) = ctl.step_create(&mut jobs, job_id, first).await?;
    println!("created first step {first_id}, charging all 4 idle cores");

    let second = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(1),
            task_count: 4,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        ..Default::default()
    };
    let (second_id, _) = ctl.step_create(&mut jobs, job_id, second).await?;
    println!("created second step {second_id}, sharing the same 4 cores (over-subscribed)");

    ctl.step_complete(&mut jobs, job_id, second_id, 0).await?;
    ctl.step_complete(&mut jobs, job_id, first_id, 0).await?;
    println!("both steps completed cleanly");
    Ok(())
}

async fn run_explicit_list() -> anyhow::Result<()> {
    let (mut jobs, job_id) = demo_job_table(5, 4, 8192);
    let ctl = demo_controller(SchedulerConfig::default(), 4);

    let mut explicit = Bitmap::zeros(5);
    explicit.set(0);
    explicit.set(1);
    explicit.set(2);

    let request = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            explicit_nodes: Some(explicit),
            distribution: TaskDistribution::Arbitrary,
            task_count: 3,
            ..Default::default()
        },
        ..Default::default()
    };

    let (step_id, node_list) = ctl.step_create(&mut jobs, job_id, request).await?;
    println!("created step {step_id} on [{node_list}] (arbitrary distribution silently promoted to block)");
    Ok(())
}

async fn run_partial_completion() -> anyhow::Result<()> {
    let (mut jobs, job_id) = demo_job_table(1, 4, 8192);
    let ctl = demo_controller(SchedulerConfig::default(), 4);

    let request = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(1),
            task_count: 4,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        batch: true,
        ..Default::default()
    };
    let (step_id, _) = ctl.step_create(&mut jobs, job_id, request).await?;

    let first = ctl.step_partial_complete(&mut jobs, job_id, step_id, 0, 0, 0)?;
    println!("partial complete range [0,0]: remaining={} fully_complete={}", first.remaining, first.fully_complete);

    Ok(())
}

async fn run_suspend_resume() -> anyhow::Result<()> {
    let (mut jobs, job_id) = demo_job_table(1, 4, 8192);
    let ctl = demo_controller(SchedulerConfig::default(), 4);

    let request = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(1),
            task_count: 4,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        batch: true,
        ..Default::default()
    };
    let (step_id, _) = ctl.step_create(&mut jobs, job_id, request).await?;

    ctl.job_suspend(&mut jobs, job_id, 200)?;
    println!("job suspended at t=200");
    ctl.job_resume(&mut jobs, job_id, 300)?;
    println!("job resumed at t=300");

    ctl.step_complete(&mut jobs, job_id, step_id, 0).await?;
    println!("step {step_id} completed");
    Ok(())
}

/// Dispatch a scenario by name.
pub async fn run(scenario: crate::cli::Scenario) -> anyhow::Result<()> {
    use crate::cli::Scenario;
    match scenario {
        Scenario::BasicFit => run_basic_fit().await,
        Scenario::Oversubscription => run_oversubscription().await,
        Scenario::ExplicitList => run_explicit_list().await,
        Scenario::PartialCompletion => run_partial_completion().await,
        Scenario::SuspendResume => run_suspend_resume().await,
    }
}
