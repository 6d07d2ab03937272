//! C5 — the core picker and charger: choose specific cores on each
//! selected node, update the job's used-CPU/used-memory/used-cores, and
//! undo all of it on refund (spec.md §4.5).

use batchctl_bitset::Bitmap;
use batchctl_types::SchedulerError;

use crate::job::Job;
use crate::step::StepRecord;

/// Charge a step's resources against its job's account and pick its
/// cores. `step.step_node_bitmap` must already be set; `step.core_bitmap`
/// is populated in place. Batch steps must not be passed here (§4.5:
/// "Batch-steps skip all of 4.5"). `oversubscribe_cpu_slack` bounds how
/// many additional, already-used cores a single node may hand out in the
/// second (over-subscription) pass; zero means unlimited, matching the
/// config default (§4.5, invariant 3).
pub fn charge_step(job: &mut Job, step: &mut StepRecord, oversubscribe_cpu_slack: u32) -> Result<(), SchedulerError> {
    debug_assert!(!step.batch, "batch steps must not be charged");

    let tasks_per_node = step
        .layout
        .as_ref()
        .map(|l| l.tasks_per_node.clone())
        .unwrap_or_default();

    // The step's actual total CPU count, not the caller's original
    // cpu-count target: the latter is frequently 0 when the step was
    // sized by node/task count instead (§4.5).
    let total_step_cpus: u32 = tasks_per_node.iter().sum();
    let total_job_cpus = job.account.total_cpus();
    let whole_job = total_step_cpus == total_job_cpus && total_job_cpus > 0;

    if whole_job {
        step.core_bitmap = job.account.core_bitmap().clone();
    }

    for (step_offset, node_idx) in step.step_node_bitmap.iter_set().enumerate() {
        let task_cnt = *tasks_per_node.get(step_offset).unwrap_or(&0);
        job.account.charge(node_idx, task_cnt, step.mem_per_task * task_cnt as u64);

        if whole_job {
            continue;
        }

        let layout = job.account.layout(node_idx);
        let use_all_cores = task_cnt == layout.total_cores();
        let offsets: Vec<(u32, u32, usize)> = layout.core_offsets().collect();

        let mut picked_bits = Vec::new();
        for &(_, _, bit) in &offsets {
            if picked_bits.len() as u32 >= task_cnt {
                break;
            }
            let job_owns = job.account.core_bitmap().test(bit);
            let idle = use_all_cores || !job.account.core_used_bitmap().test(bit);
            if job_owns && idle {
                picked_bits.push(bit);
            }
        }

        // Second pass: over-subscription. Only reached if the first pass
        // could not seat every task on idle cores. Capped by the
        // configured slack; zero means unlimited.
        if (picked_bits.len() as u32) < task_cnt {
            let oversub_limit = if oversubscribe_cpu_slack == 0 {
                usize::MAX
            } else {
                oversubscribe_cpu_slack as usize
            };
            let mut oversub_count = 0usize;
            for &(_, _, bit) in &offsets {
                if picked_bits.len() as u32 >= task_cnt || oversub_count >= oversub_limit {
                    break;
                }
                if picked_bits.contains(&bit) {
                    continue;
                }
                if job.account.core_bitmap().test(bit) {
                    picked_bits.push(bit);
                    oversub_count += 1;
                }
            }
        }

        let mut node_cores = Bitmap::zeros(step.core_bitmap.len());
        for bit in &picked_bits {
            node_cores.set(*bit);
        }

        // Cores charged in the first pass (still idle-exclusive, i.e. not
        // already over-subscribed by this step) get marked used; the
        // distinction only matters when a later pass needs to tell which
        // bits were newly over-subscribed, so we recompute idle-only
        // membership here rather than threading pass membership through.
        let mut idle_only = Bitmap::zeros(step.core_bitmap.len());
        for bit in &picked_bits {
            if use_all_cores || !job.account.core_used_bitmap().test(*bit) {
                idle_only.set(*bit);
            }
        }
        job.account.mark_cores_used(&idle_only);

        step.core_bitmap = step.core_bitmap.or(&node_cores)?;
    }

    Ok(())
}

/// Refund a step's resources, the exact inverse of [`charge_step`].
pub fn refund_step(job: &mut Job, step: &StepRecord) {
    if step.batch {
        return;
    }

    let tasks_per_node = step
        .layout
        .as_ref()
        .map(|l| l.tasks_per_node.clone())
        .unwrap_or_default();

    for (step_offset, node_idx) in step.step_node_bitmap.iter_set().enumerate() {
        let task_cnt = *tasks_per_node.get(step_offset).unwrap_or(&0);
        job.account.refund(node_idx, task_cnt, step.mem_per_task * task_cnt as u64);
    }

    job.account.mark_cores_free(&step.core_bitmap);
}
