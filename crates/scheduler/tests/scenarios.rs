//! Black-box scenarios against the public `Controller` API, one per
//! spec.md §8 testable scenario.
#![allow(unused_crate_dependencies)]

use std::sync::Arc;

use batchctl_bitset::Bitmap;
use batchctl_scheduler::adapters::{NodeRegistry, SwitchHandle, SwitchPlugin};
use batchctl_scheduler::account::{NodeCoreLayout, ResourceAccount};
use batchctl_scheduler::selector::NodeRequest;
use batchctl_scheduler::serialize;
use batchctl_scheduler::{
    Controller, Job, JobState, JobTable, NoopCheckpointPlugin, NoopSwitchPlugin, NullAccountingSink,
    NullAgent, SchedulerConfig, StepCreateRequest, TaskDistribution,
};
use batchctl_types::{JobId, UserId};

struct AllUp;
impl NodeRegistry for AllUp {
    fn is_up(&self, _name: &str) -> bool {
        true
    }
    fn cpu_count(&self, _name: &str, _fast_schedule: bool) -> u32 {
        4
    }
}

fn controller() -> Controller {
    Controller::new(
        SchedulerConfig::default(),
        Arc::new(NullAgent),
        Arc::new(NoopSwitchPlugin),
        Arc::new(NoopCheckpointPlugin),
        Arc::new(NullAccountingSink),
        Arc::new(AllUp),
    )
}

fn job_table(node_count: usize, cpu_per_node: u32, mem_per_node: u64) -> (JobTable, JobId) {
    let mut layout = Vec::new();
    let mut offset = 0usize;
    for _ in 0..node_count {
        layout.push(NodeCoreLayout::new(1, cpu_per_node, offset));
        offset += cpu_per_node as usize;
    }
    let account = ResourceAccount::new(vec![cpu_per_node; node_count], vec![mem_per_node; node_count], layout);
    let job = Job {
        job_id: JobId(42),
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
    };
    let job_id = job.job_id;
    let mut jobs = JobTable::new();
    jobs.insert(job);
    (jobs, job_id)
}

#[tokio::test]
async fn basic_fit_charges_idle_cores_and_refunds_on_completion() {
    let ctl = controller();
    let (mut jobs, job_id) = job_table(2, 4, 8192);

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
    let (step_id, node_list) = ctl.step_create(&mut jobs, job_id, request).await.unwrap();
    assert_eq!(node_list, "node0,node1");

    let job = jobs.get(job_id).unwrap();
    assert_eq!(job.account.core_used_bitmap().count_ones(), 8);

    let outcome = ctl.step_complete(&mut jobs, job_id, step_id, 0).await.unwrap();
    assert!(outcome.triggers_job_completion);

    let job = jobs.get(job_id).unwrap();
    assert_eq!(job.account.core_used_bitmap().count_ones(), 0);
    assert!(!job.has_steps());
}

#[tokio::test]
async fn oversubscription_two_steps_share_the_same_node() {
    let ctl = controller();
    let (mut jobs, job_id) = job_table(1, 4, 8192);

    let req = |task_count| StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(1),
            task_count,
            distribution: TaskDistribution::Block,
            ..Default::default()
        },
        ..Default::default()
    };

    let (first, _) = ctl.step_create(&mut jobs, job_id, req(4)).await.unwrap();
    let (second, _) = ctl.step_create(&mut jobs, job_id, req(4)).await.unwrap();

    let job = jobs.get(job_id).unwrap();
    assert_eq!(job.account.capacity(0).1, 8);
    assert_eq!(job.account.core_used_bitmap().count_ones(), 4);

    ctl.step_complete(&mut jobs, job_id, second, 0).await.unwrap();
    ctl.step_complete(&mut jobs, job_id, first, 0).await.unwrap();

    let job = jobs.get(job_id).unwrap();
    assert_eq!(job.account.capacity(0).1, 0);
    assert_eq!(job.account.core_used_bitmap().count_ones(), 0);
}

/// A switch plugin with no arbitrary-distribution support, so a step
/// create can exercise the silent block-promotion path.
#[derive(Debug, Default)]
struct NoArbitrarySwitch;

impl SwitchPlugin for NoArbitrarySwitch {
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
    ) -> Result<(), batchctl_types::SchedulerError> {
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
        false
    }
}

#[tokio::test]
async fn explicit_node_list_is_promoted_to_block_without_arbitrary_support() {
    let ctl = Controller::new(
        SchedulerConfig::default(),
        Arc::new(NullAgent),
        Arc::new(NoArbitrarySwitch),
        Arc::new(NoopCheckpointPlugin),
        Arc::new(NullAccountingSink),
        Arc::new(AllUp),
    );
    let (mut jobs, job_id) = job_table(5, 4, 8192);

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

    let (_step_id, node_list) = ctl.step_create(&mut jobs, job_id, request).await.unwrap();
    assert_eq!(node_list.split(',').count(), 5);
}

#[tokio::test]
async fn partial_completion_accumulates_until_fully_released() {
    let ctl = controller();
    let (mut jobs, job_id) = job_table(1, 4, 8192);

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
    let (step_id, _) = ctl.step_create(&mut jobs, job_id, request).await.unwrap();

    let first = ctl.step_partial_complete(&mut jobs, job_id, step_id, 0, 0, 0).unwrap();
    assert_eq!(first.remaining, 0);
    assert!(first.fully_complete);
}

#[tokio::test]
async fn step_record_survives_a_pack_unpack_round_trip() {
    let ctl = controller();
    let (mut jobs, job_id) = job_table(2, 4, 8192);

    let request = StepCreateRequest {
        uid: UserId(1000),
        node_request: NodeRequest {
            node_count: Some(2),
            task_count: 8,
            distribution: TaskDistribution::Cyclic,
            ..Default::default()
        },
        name: "recovered".into(),
        ..Default::default()
    };
    let (step_id, _) = ctl.step_create(&mut jobs, job_id, request).await.unwrap();

    let job = jobs.get(job_id).unwrap();
    let step = job.find_step(step_id).unwrap();
    let blob = serialize::pack(step, &NoopSwitchPlugin, &NoopCheckpointPlugin);

    let restored = serialize::unpack(&blob, &job.node_names, &NoopSwitchPlugin, &NoopCheckpointPlugin).unwrap();
    assert_eq!(restored.step_id, step.step_id);
    assert_eq!(restored.step_node_bitmap, step.step_node_bitmap);
    assert_eq!(restored.core_bitmap, step.core_bitmap);
    assert_eq!(restored.name, "recovered");
}

#[tokio::test]
async fn suspend_resume_reports_correct_elapsed_runtime() {
    let ctl = controller();
    let (mut jobs, job_id) = job_table(1, 4, 8192);

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
    let (step_id, _) = ctl.step_create(&mut jobs, job_id, request).await.unwrap();
    {
        let job = jobs.get_mut(job_id).unwrap();
        job.find_step_mut(step_id).unwrap().start_time = 100;
    }

    ctl.job_suspend(&mut jobs, job_id, 200).unwrap();
    ctl.job_resume(&mut jobs, job_id, 300).unwrap();

    let job = jobs.get(job_id).unwrap();
    let step = job.find_step(step_id).unwrap();
    assert_eq!(step.pre_suspend_time + step.tot_suspend_time, 100);

    ctl.step_complete(&mut jobs, job_id, step_id, 0).await.unwrap();
}
