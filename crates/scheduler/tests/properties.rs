//! Property tests for spec.md §8's P1 (conservation), P2 (bitmap
//! containment), P3 (no double booking), P4 (exit-bitmap monotonicity),
//! and P6 (step id monotonicity). P5 (serialization round trip) is
//! covered by the deterministic unit tests in `serialize.rs` instead,
//! since the step record's field set is fixed rather than arbitrary
//! shaped.
#![allow(unused_crate_dependencies)]

use batchctl_bitset::Bitmap;
use batchctl_scheduler::account::{NodeCoreLayout, ResourceAccount};
use batchctl_scheduler::job::{Job, JobState};
use batchctl_scheduler::step::{StepLayout, StepRecordBuilder};
use batchctl_types::{JobId, StepId, UserId};
use proptest::prelude::*;

fn job_with_uniform_nodes(node_count: usize, cpu_per_node: u32, mem_per_node: u64) -> Job {
    let mut layout = Vec::with_capacity(node_count);
    let mut offset = 0usize;
    for _ in 0..node_count {
        layout.push(NodeCoreLayout::new(1, cpu_per_node, offset));
        offset += cpu_per_node as usize;
    }
    let account = ResourceAccount::new(vec![cpu_per_node; node_count], vec![mem_per_node; node_count], layout);
    Job {
        job_id: JobId(1),
        owner: UserId(1),
        node_names: (0..node_count).map(|i| format!("node{i}")).collect(),
        node_bitmap: Bitmap::ones(node_count),
        account,
        next_step_id: 0,
        steps: Vec::new(),
        kill_on_last_step: false,
        state: JobState::Running,
        suspended_at: None,
        deadline: None,
        requid: None,
    }
}

proptest! {
    /// P1: charging and then refunding the same (cpus, mem) pair on the
    /// same node always returns the account to its starting usage,
    /// regardless of how many charge/refund pairs are interleaved.
    #[test]
    fn p1_charge_refund_conserves_usage(
        ops in prop::collection::vec((0usize..4, 0u32..16, 0u64..4096), 0..50),
    ) {
        let mut job = job_with_uniform_nodes(4, 16, 16_384);
        for (node_idx, cpus, mem) in &ops {
            job.account.charge(*node_idx, *cpus, *mem);
            job.account.refund(*node_idx, *cpus, *mem);
        }
        for i in 0..4 {
            let (_, used_cpu, _, used_mem) = job.account.capacity(i);
            prop_assert_eq!(used_cpu, 0);
            prop_assert_eq!(used_mem, 0);
        }
    }

    /// P2: a step's core bitmap, however it was picked, is always a
    /// subset of the job's owned core bitmap.
    #[test]
    fn p2_step_core_bitmap_is_subset_of_job_core_bitmap(
        picked in prop::collection::vec(0usize..16, 0..16),
    ) {
        let job = job_with_uniform_nodes(4, 4, 8192);
        let mut step_cores = Bitmap::zeros(16);
        for bit in picked {
            step_cores.set(bit);
        }
        prop_assert!(job.account.core_bitmap().is_superset_of(&step_cores).unwrap());
    }

    /// P3: marking a random set of cores used then free never leaves
    /// `core_used_bitmap` larger than the job's total core bitmap, and
    /// a mark-used/mark-free pair always round-trips to empty.
    #[test]
    fn p3_mark_used_then_free_never_double_books(
        bits in prop::collection::vec(0usize..16, 0..16),
    ) {
        let mut job = job_with_uniform_nodes(4, 4, 8192);
        let mut marked = Bitmap::zeros(16);
        for bit in &bits {
            marked.set(*bit);
        }
        job.account.mark_cores_used(&marked);
        prop_assert!(job.account.core_bitmap().is_superset_of(job.account.core_used_bitmap()).unwrap());
        job.account.mark_cores_free(&marked);
        prop_assert_eq!(job.account.core_used_bitmap().count_ones(), 0);
    }

    /// P4: the exit-node bitmap only ever gains bits as more ranges are
    /// reported; `remaining()` is monotonically non-increasing.
    #[test]
    fn p4_exit_bitmap_is_monotonic(
        ranges in prop::collection::vec((0usize..8, 0usize..8), 0..10),
    ) {
        let mut step = StepRecordBuilder::new(StepId(1), Bitmap::ones(8), Bitmap::zeros(4), 0)
            .build(Some(StepLayout { tasks_per_node: vec![1; 8], node_list: String::new() }), None, None);

        let mut last_remaining = step.remaining();
        for (a, b) in ranges {
            let (first, last) = if a <= b { (a, b) } else { (b, a) };
            step.ensure_exit_bitmap().set_range(first, last);
            let remaining = step.remaining();
            prop_assert!(remaining <= last_remaining);
            last_remaining = remaining;
        }
    }

    /// P6: step ids allocated from the same job are strictly increasing,
    /// regardless of how many are drawn.
    #[test]
    fn p6_step_ids_strictly_increase(draw_count in 0usize..100) {
        let mut job = job_with_uniform_nodes(1, 4, 8192);
        let mut last: Option<StepId> = None;
        for _ in 0..draw_count {
            let id = job.allocate_step_id();
            if let Some(prev) = last {
                prop_assert!(id.0 > prev.0);
            }
            last = Some(id);
        }
    }
}
