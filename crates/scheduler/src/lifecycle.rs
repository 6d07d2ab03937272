//! C6 — the step life-cycle: create, signal, partial/full completion,
//! suspend/resume, periodic checkpoint tick. This is the entry point
//! every inbound RPC in §6 is routed through; every public method here
//! assumes the caller already holds the composite job/step lock (§5) for
//! its duration and takes `&mut JobTable` accordingly rather than taking
//! any lock itself.

use std::sync::Arc;

use batchctl_types::{JobId, SchedulerError, StepId};
use tracing::{info, info_span, warn};

use crate::adapters::{
    Agent, AgentMessageType, AccountingSink, CheckpointOp, CheckpointPlugin, NodeRegistry,
    StepAccountingRecord, SwitchPlugin,
};
use crate::charger::{charge_step, refund_step};
use crate::config::{FrontEndMode, SchedulerConfig};
use crate::job::{Job, JobState, JobTable};
use crate::selector::{select_nodes, NodeRequest};
use crate::step::{StepLayout, StepRecord, StepRecordBuilder, TaskDistribution};

/// Everything a step-create request needs beyond what's already implied
/// by the job (§6 "Step create").
#[derive(Debug, Clone, Default)]
pub struct StepCreateRequest {
    /// Requesting user id.
    pub uid: batchctl_types::UserId,
    /// Node selection inputs, forwarded to C4.
    pub node_request: NodeRequest,
    /// True for a batch step.
    pub batch: bool,
    /// Under overcommit, the caller's CPU-count target is still recorded
    /// on the step for accounting/serialization but withheld from the
    /// selector, which then sizes purely by node/task count (§4.6
    /// Create).
    pub overcommit: bool,
    /// Step name.
    pub name: String,
    /// Network type string passed to the switch plugin.
    pub network: String,
    /// Requesting client host.
    pub host: String,
    /// Requesting client port.
    pub port: u16,
    /// Checkpoint interval in seconds.
    pub ckpt_interval: i64,
    /// Checkpoint image directory.
    pub ckpt_path: String,
}

/// Outcome of a full step-completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCompleteOutcome {
    /// Whether this was the job's last step and `kill_on_last_step` was
    /// set, meaning the caller should now forward to job-completion.
    pub triggers_job_completion: bool,
}

/// Outcome of a partial step-completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPartialCompleteOutcome {
    /// Count of step-nodes that have not yet reported completion.
    pub remaining: usize,
    /// True once `remaining` reached zero and the switch handle (if any)
    /// was released in full.
    pub fully_complete: bool,
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn check_request_strings(req: &StepCreateRequest, max_len: usize) -> Result<(), SchedulerError> {
    for s in [&req.name, &req.network, &req.host, &req.ckpt_path] {
        if s.len() > max_len {
            return Err(SchedulerError::PathnameTooLong);
        }
    }
    Ok(())
}

fn validate_task_count(task_count: u32, node_count: usize, max_tasks_per_node: u32) -> Result<(), SchedulerError> {
    let max = node_count as u32 * max_tasks_per_node;
    if task_count == 0 || task_count > max {
        return Err(SchedulerError::BadTaskCount);
    }
    Ok(())
}

/// Drives the C2–C8 job-step state machine. Generic over its four
/// external collaborators so production code wires real implementations
/// and tests wire deterministic fakes, matching the Arc-held
/// trait-object adapter pattern used for pluggable backends elsewhere in
/// the example pack.
pub struct Controller {
    config: SchedulerConfig,
    agent: Arc<dyn Agent>,
    switch: Arc<dyn SwitchPlugin>,
    checkpoint: Arc<dyn CheckpointPlugin>,
    accounting: Arc<dyn AccountingSink>,
    registry: Arc<dyn NodeRegistry>,
}

impl Controller {
    /// Build a controller over the given adapters and configuration.
    pub fn new(
        config: SchedulerConfig,
        agent: Arc<dyn Agent>,
        switch: Arc<dyn SwitchPlugin>,
        checkpoint: Arc<dyn CheckpointPlugin>,
        accounting: Arc<dyn AccountingSink>,
        registry: Arc<dyn NodeRegistry>,
    ) -> Self {
        Self {
            config,
            agent,
            switch,
            checkpoint,
            accounting,
            registry,
        }
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a new step against `job_id` (§4.6 Create).
    pub async fn step_create(
        &self,
        jobs: &mut JobTable,
        job_id: JobId,
        request: StepCreateRequest,
    ) -> Result<(StepId, String), SchedulerError> {
        let _span = info_span!("step_create", job_id = %job_id).entered();

        check_request_strings(&request, self.config.max_path_len)?;

        let now = now_unix();
        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;

        match job.state {
            JobState::Finished => return Err(SchedulerError::AlreadyDone),
            JobState::Suspended => return Err(SchedulerError::Disabled),
            JobState::Pending if request.batch => return Err(SchedulerError::DuplicateJobId),
            JobState::Pending => return Err(SchedulerError::Disabled),
            JobState::Completing => return Err(SchedulerError::Disabled),
            JobState::Running => {}
        }

        // A job past its deadline is treated the same as a finished job
        // (original: `IS_JOB_FINISHED(job_ptr) || job_ptr->end_time <=
        // time(NULL)` both map to ESLURM_ALREADY_DONE).
        if job.deadline.is_some_and(|deadline| now >= deadline) {
            return Err(SchedulerError::AlreadyDone);
        }

        let task_count = request.node_request.task_count;
        let node_cap = if job.node_count() == 0 { 1 } else { job.node_count() };
        validate_task_count(task_count, node_cap, self.config.max_tasks_per_node)?;

        // Under overcommit, keep the caller's cpu-count target for the
        // step record but strip it from what the selector sees so sizing
        // falls back to node/task count (§4.6 Create).
        let mut node_request = request.node_request.clone();
        let requested_cpu_count = if request.overcommit {
            node_request.cpu_count.take().unwrap_or(0)
        } else {
            node_request.cpu_count.unwrap_or(0)
        };

        if node_request.distribution == TaskDistribution::Arbitrary
            && node_request.explicit_nodes.is_none()
            && !self.switch.supports_arbitrary_distribution()
        {
            return Err(SchedulerError::BadDist);
        }

        let first_step = !job.has_steps();
        let selection = select_nodes(
            job,
            self.registry.as_ref(),
            self.switch.as_ref(),
            &node_request,
            first_step,
            self.config.fast_schedule,
        )?;

        let step_id = job.allocate_step_id();
        let step_node_count = selection.node_bitmap.count_ones();

        let layout = if request.batch {
            None
        } else {
            let tasks_per_node = distribute_tasks(task_count, step_node_count, selection.distribution);
            let node_list = selection
                .node_bitmap
                .iter_set()
                .map(|i| job.node_names[i].clone())
                .collect::<Vec<_>>()
                .join(",");
            Some(StepLayout {
                tasks_per_node,
                node_list,
            })
        };

        let core_bitmap_len = job.account.core_bitmap().len();
        let mut record = StepRecordBuilder::new(
            step_id,
            selection.node_bitmap.clone(),
            batchctl_bitset::Bitmap::zeros(core_bitmap_len),
            now,
        )
        .requested_cpu_count(requested_cpu_count)
        .mem_per_task(node_request.mem_per_task.unwrap_or(0))
        .cyclic(node_request.distribution == TaskDistribution::Cyclic)
        .exclusive(node_request.exclusive)
        .batch(request.batch)
        .ckpt_interval(request.ckpt_interval)
        .ckpt_path(request.ckpt_path.clone())
        .network(request.network.clone())
        .name(request.name.clone())
        .client(request.host.clone(), request.port)
        .build(layout, None, None);

        if !request.batch {
            let mut switch_handle = self.switch.allocate_jobinfo();
            let tasks_per_node = record
                .layout
                .as_ref()
                .map(|l| l.tasks_per_node.clone())
                .unwrap_or_default();
            let node_list = record
                .layout
                .as_ref()
                .map(|l| l.node_list.clone())
                .unwrap_or_default();
            if let Err(err) = self.switch.build_jobinfo(
                &mut switch_handle,
                &node_list,
                &tasks_per_node,
                record.cyclic,
                &request.network,
            ) {
                warn!(job_id = %job_id, %err, "switch refused jobinfo, undoing step create");
                return Err(SchedulerError::InterconnectFailure);
            }
            record.switch_handle = Some(switch_handle);

            charge_step(job, &mut record, self.config.oversubscribe_cpu_slack)?;
        }

        record.ckpt_handle = Some(self.checkpoint.allocate_jobinfo());

        let node_list = record
            .layout
            .as_ref()
            .map(|l| l.node_list.clone())
            .unwrap_or_else(|| job.node_names.join(","));

        let accounting_record = StepAccountingRecord {
            job_id,
            step_id,
            name: record.name.clone(),
            start_time: record.start_time,
            end_time: None,
            exit_code: None,
            elapsed_secs: None,
        };
        if let Err(err) = self.accounting.step_start(&accounting_record).await {
            warn!(job_id = %job_id, step_id = %step_id, %err, "accounting step_start failed, continuing");
        }

        job.steps.push(record);
        info!(job_id = %job_id, step_id = %step_id, nodes = step_node_count, "step created");

        Ok((step_id, node_list))
    }

    /// Signal a step (§4.6 Signal).
    pub fn step_signal(
        &self,
        jobs: &mut JobTable,
        job_id: JobId,
        step_id: StepId,
        uid: batchctl_types::UserId,
        signal: i32,
        hard_kill: bool,
    ) -> Result<(), SchedulerError> {
        let _span = info_span!("step_signal", job_id = %job_id, step_id = %step_id).entered();

        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;
        if job.owner != uid {
            return Err(SchedulerError::AccessDenied);
        }
        if job.state != JobState::Running {
            return Err(SchedulerError::TransitionStateNoUpdate);
        }
        if job.find_step(step_id).is_none() {
            return Err(SchedulerError::InvalidJobId);
        }

        if hard_kill && job.requid.is_none() {
            job.requid = Some(uid);
        }

        let step = job.find_step(step_id).expect("checked above");
        let hostlist = match self.config.front_end_mode {
            FrontEndMode::PerNode => step_hostlist(job, step),
            FrontEndMode::Collapsed => step_hostlist(job, step).into_iter().take(1).collect(),
        };

        let msg_type = if hard_kill {
            AgentMessageType::TerminateTasks
        } else {
            AgentMessageType::SignalTasks(signal)
        };
        self.agent.enqueue(msg_type, hostlist, Vec::new(), self.config.agent_retry_limit);

        Ok(())
    }

    /// Fully complete a step (§4.6 Full completion).
    pub async fn step_complete(
        &self,
        jobs: &mut JobTable,
        job_id: JobId,
        step_id: StepId,
        job_rc: i32,
    ) -> Result<StepCompleteOutcome, SchedulerError> {
        let _span = info_span!("step_complete", job_id = %job_id, step_id = %step_id).entered();

        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;
        let mut step = job.remove_step(step_id).ok_or(SchedulerError::AlreadyDone)?;

        step.fold_exit_code(job_rc);
        refund_step(job, &step);

        let (switch_handle, _ckpt_handle) = step.release_handles();
        if let Some(handle) = &switch_handle {
            let node_list = step.layout.as_ref().map(|l| l.node_list.as_str()).unwrap_or("");
            self.switch.job_step_complete(handle, node_list);
        }

        let end_time = now_unix();
        let record = StepAccountingRecord {
            job_id,
            step_id,
            name: step.name.clone(),
            start_time: step.start_time,
            end_time: Some(end_time),
            exit_code: Some(step.exit_code),
            elapsed_secs: Some(elapsed_runtime(&step, end_time)),
        };
        if let Err(err) = self.accounting.step_complete(&record).await {
            warn!(job_id = %job_id, step_id = %step_id, %err, "accounting step_complete failed, continuing");
        }

        let last_step_done = !job.has_steps();
        let triggers_job_completion = job.kill_on_last_step && last_step_done;

        Ok(StepCompleteOutcome {
            triggers_job_completion,
        })
    }

    /// Partially complete a step over `[range_first, range_last]` in
    /// step-node-offset space (§4.6 Partial completion).
    pub fn step_partial_complete(
        &self,
        jobs: &mut JobTable,
        job_id: JobId,
        step_id: StepId,
        range_first: usize,
        range_last: usize,
        step_rc: i32,
    ) -> Result<StepPartialCompleteOutcome, SchedulerError> {
        let _span = info_span!("step_partial_complete", job_id = %job_id, step_id = %step_id).entered();

        if range_first > range_last {
            return Err(SchedulerError::BadTaskCount);
        }

        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;
        let step = job.find_step_mut(step_id).ok_or(SchedulerError::InvalidJobId)?;

        step.fold_exit_code(step_rc);
        let step_node_count = step.step_node_count();
        if range_last >= step_node_count {
            return Err(SchedulerError::BadTaskCount);
        }

        step.ensure_exit_bitmap().set_range(range_first, range_last);
        let remaining = step.remaining();
        let fully_complete = remaining == 0;

        if fully_complete {
            if let Some(handle) = step.switch_handle.take() {
                let node_list = step.layout.as_ref().map(|l| l.node_list.as_str()).unwrap_or("");
                self.switch.job_step_complete(&handle, node_list);
            }
        } else if self.switch.part_complete_supported() {
            if let (Some(handle), Some(layout)) = (&step.switch_handle, &step.layout) {
                let node_names: Vec<&str> = layout.node_list.split(',').collect();
                let partial_names: Vec<&str> = node_names
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i >= range_first && *i <= range_last)
                    .map(|(_, n)| *n)
                    .collect();
                self.switch.job_step_part_complete(handle, &partial_names.join(","));
            }
        }

        Ok(StepPartialCompleteOutcome {
            remaining,
            fully_complete,
        })
    }

    /// Suspend a job. Per-step counters are not touched here: a step's
    /// suspended duration is only known once resume closes the interval
    /// (§4.6 Suspend / resume).
    pub fn job_suspend(&self, jobs: &mut JobTable, job_id: JobId, at: i64) -> Result<(), SchedulerError> {
        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;
        job.state = JobState::Suspended;
        job.suspended_at = Some(at);
        Ok(())
    }

    /// Resume a job, closing the suspended interval for each of its
    /// steps. A step created after the job was already suspended only
    /// accrues suspended time from its own start, via `max(step.start,
    /// job.suspended_at)` (§4.6 Suspend / resume).
    pub fn job_resume(&self, jobs: &mut JobTable, job_id: JobId, at: i64) -> Result<(), SchedulerError> {
        let job = jobs.get_mut(job_id).ok_or(SchedulerError::InvalidJobId)?;
        let suspended_at = job.suspended_at.take().ok_or(SchedulerError::TransitionStateNoUpdate)?;
        job.state = JobState::Running;
        for step in &mut job.steps {
            let interval_start = step.start_time.max(suspended_at);
            step.tot_suspend_time += (at - interval_start).max(0);
        }
        Ok(())
    }

    /// Walk every running job's steps and fire due checkpoints (§4.6
    /// Checkpoint tick). A no-op when the configured checkpoint plugin
    /// is trivial.
    pub async fn checkpoint_tick(&self, jobs: &mut JobTable, now: i64) {
        if self.checkpoint.is_trivial() {
            return;
        }

        for job in jobs.iter_mut() {
            if job.state != JobState::Running {
                continue;
            }
            for step in &mut job.steps {
                if step.ckpt_interval <= 0 {
                    continue;
                }
                if step.last_ckpt_time + step.ckpt_interval > now {
                    continue;
                }
                let handle = step.ckpt_handle.clone().unwrap_or_default();
                match self
                    .checkpoint
                    .op(CheckpointOp::Create, &[], step.step_id, &handle)
                    .await
                {
                    Ok(outcome) if outcome.error_code == 0 => {
                        step.last_ckpt_time = now;
                    }
                    Ok(outcome) => {
                        warn!(
                            step_id = %step.step_id,
                            code = outcome.error_code,
                            msg = ?outcome.error_msg,
                            "checkpoint reported an error"
                        );
                    }
                    Err(err) => {
                        warn!(step_id = %step.step_id, %err, "checkpoint op failed, continuing");
                    }
                }
            }
        }
    }
}

fn step_hostlist(job: &Job, step: &StepRecord) -> Vec<String> {
    step.step_node_bitmap
        .iter_set()
        .map(|i| job.node_names[i].clone())
        .collect()
}

fn elapsed_runtime(step: &StepRecord, end_time: i64) -> i64 {
    (end_time - step.start_time - step.tot_suspend_time).max(0)
}

fn distribute_tasks(task_count: u32, node_count: usize, distribution: TaskDistribution) -> Vec<u32> {
    if node_count == 0 {
        return Vec::new();
    }
    let mut counts = vec![0u32; node_count];
    match distribution {
        TaskDistribution::Cyclic => {
            for t in 0..task_count {
                counts[t as usize % node_count] += 1;
            }
        }
        TaskDistribution::Block | TaskDistribution::Arbitrary => {
            let base = task_count / node_count as u32;
            let extra = task_count % node_count as u32;
            for (i, c) in counts.iter_mut().enumerate() {
                *c = base + u32::from((i as u32) < extra);
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NodeCoreLayout, ResourceAccount};
    use crate::adapters::{NoopCheckpointPlugin, NoopSwitchPlugin, NullAccountingSink, NullAgent};
    use batchctl_bitset::Bitmap;
    use batchctl_types::UserId;

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

    fn job_table_with_job(n: usize, cpu_per_node: u32, mem_per_node: u64) -> (JobTable, JobId) {
        let mut layout = Vec::new();
        let mut offset = 0usize;
        for _ in 0..n {
            layout.push(NodeCoreLayout::new(1, cpu_per_node, offset));
            offset += cpu_per_node as usize;
        }
        let account = ResourceAccount::new(vec![cpu_per_node; n], vec![mem_per_node; n], layout);
        let job = Job {
            job_id: JobId(1),
            owner: UserId(1000),
            node_names: (0..n).map(|i| format!("node{i}")).collect(),
            node_bitmap: Bitmap::ones(n),
            account,
            next_step_id: 0,
            steps: Vec::new(),
            kill_on_last_step: true,
            state: JobState::Running,
            suspended_at: None,
            deadline: None,
            requid: None,
        };
        let mut jobs = JobTable::new();
        let job_id = job.job_id;
        jobs.insert(job);
        (jobs, job_id)
    }

    #[tokio::test]
    async fn basic_fit_scenario_charges_and_completes_cleanly() {
        let ctl = controller();
        let (mut jobs, job_id) = job_table_with_job(2, 4, 8192);

        let req = StepCreateRequest {
            uid: UserId(1000),
            node_request: NodeRequest {
                node_count: Some(2),
                mem_per_task: Some(1024),
                task_count: 4,
                ..Default::default()
            },
            ..Default::default()
        };

        let (step_id, node_list) = ctl.step_create(&mut jobs, job_id, req).await.unwrap();
        assert_eq!(node_list, "node0,node1");

        let job = jobs.get(job_id).unwrap();
        assert_eq!(job.account.capacity(0), (4, 2, 8192, 2048));
        assert_eq!(job.account.capacity(1), (4, 2, 8192, 2048));

        let outcome = ctl.step_complete(&mut jobs, job_id, step_id, 0).await.unwrap();
        assert!(outcome.triggers_job_completion);

        let job = jobs.get(job_id).unwrap();
        assert_eq!(job.account.capacity(0), (4, 0, 8192, 0));
        assert!(!job.has_steps());
    }

    #[tokio::test]
    async fn partial_completion_tracks_remaining_and_frees_switch_handle() {
        let ctl = controller();
        let (mut jobs, job_id) = job_table_with_job(4, 4, 8192);

        let req = StepCreateRequest {
            uid: UserId(1000),
            node_request: NodeRequest {
                node_count: Some(4),
                task_count: 4,
                ..Default::default()
            },
            ..Default::default()
        };
        let (step_id, _) = ctl.step_create(&mut jobs, job_id, req).await.unwrap();

        let outcome1 = ctl
            .step_partial_complete(&mut jobs, job_id, step_id, 0, 1, 0)
            .unwrap();
        assert_eq!(outcome1.remaining, 2);
        assert!(!outcome1.fully_complete);

        let outcome2 = ctl
            .step_partial_complete(&mut jobs, job_id, step_id, 2, 3, 0)
            .unwrap();
        assert_eq!(outcome2.remaining, 0);
        assert!(outcome2.fully_complete);
    }

    #[test]
    fn suspend_then_resume_accumulates_suspended_time() {
        let ctl = controller();
        let (mut jobs, job_id) = job_table_with_job(1, 4, 8192);
        {
            let job = jobs.get_mut(job_id).unwrap();
            job.steps.push(
                StepRecordBuilder::new(StepId(0), Bitmap::ones(1), Bitmap::zeros(4), 100).build(None, None, None),
            );
        }

        ctl.job_suspend(&mut jobs, job_id, 200).unwrap();
        ctl.job_resume(&mut jobs, job_id, 300).unwrap();

        let job = jobs.get(job_id).unwrap();
        let step = &job.steps[0];
        assert_eq!(step.pre_suspend_time + step.tot_suspend_time, 100);
        assert_eq!(elapsed_runtime(step, 400), 200);
    }

    #[test]
    fn bad_task_count_rejected_without_mutating_job() {
        let range_err = {
            let ctl = controller();
            let (mut jobs, job_id) = job_table_with_job(1, 4, 8192);
            jobs.get_mut(job_id).unwrap().steps.push(
                StepRecordBuilder::new(StepId(0), Bitmap::ones(1), Bitmap::zeros(4), 100).build(None, None, None),
            );
            ctl.step_partial_complete(&mut jobs, job_id, StepId(0), 5, 2, 0)
        };
        assert_eq!(range_err.unwrap_err(), SchedulerError::BadTaskCount);
    }

    #[tokio::test]
    async fn past_deadline_job_rejects_step_create() {
        let ctl = controller();
        let (mut jobs, job_id) = job_table_with_job(1, 4, 8192);
        jobs.get_mut(job_id).unwrap().deadline = Some(100);

        let req = StepCreateRequest {
            uid: UserId(1000),
            node_request: NodeRequest {
                node_count: Some(1),
                task_count: 4,
                ..Default::default()
            },
            ..Default::default()
        };

        // now_unix() reflects real wall-clock time, comfortably past a
        // deadline of the unix epoch + 100s.
        let err = ctl.step_create(&mut jobs, job_id, req).await.unwrap_err();
        assert_eq!(err, SchedulerError::AlreadyDone);
    }

    #[tokio::test]
    async fn arbitrary_distribution_without_explicit_list_or_switch_support_is_bad_dist() {
        use crate::adapters::SwitchHandle;

        #[derive(Debug, Default)]
        struct NoArbitrarySwitch;
        impl SwitchPlugin for NoArbitrarySwitch {
            fn allocate_jobinfo(&self) -> SwitchHandle {
                SwitchHandle::default()
            }
            fn build_jobinfo(
                &self,
                _h: &mut SwitchHandle,
                _n: &str,
                _t: &[u32],
                _c: bool,
                _net: &str,
            ) -> Result<(), SchedulerError> {
                Ok(())
            }
            fn pack_jobinfo(&self, _h: &SwitchHandle) -> Vec<u8> {
                Vec::new()
            }
            fn unpack_jobinfo(&self, _d: &[u8]) -> SwitchHandle {
                SwitchHandle::default()
            }
            fn job_step_complete(&self, _h: &SwitchHandle, _n: &str) {}
            fn job_step_part_complete(&self, _h: &SwitchHandle, _n: &str) {}
            fn part_complete_supported(&self) -> bool {
                false
            }
            fn supports_arbitrary_distribution(&self) -> bool {
                false
            }
        }

        let ctl = Controller::new(
            SchedulerConfig::default(),
            Arc::new(NullAgent),
            Arc::new(NoArbitrarySwitch),
            Arc::new(NoopCheckpointPlugin),
            Arc::new(NullAccountingSink),
            Arc::new(AllUp),
        );
        let (mut jobs, job_id) = job_table_with_job(1, 4, 8192);

        let req = StepCreateRequest {
            uid: UserId(1000),
            node_request: NodeRequest {
                node_count: Some(1),
                task_count: 4,
                distribution: TaskDistribution::Arbitrary,
                ..Default::default()
            },
            ..Default::default()
        };

        let err = ctl.step_create(&mut jobs, job_id, req).await.unwrap_err();
        assert_eq!(err, SchedulerError::BadDist);
    }
}
