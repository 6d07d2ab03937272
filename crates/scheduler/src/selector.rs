//! C4 — the node selector: given a step request and a parent job's
//! allocation, produce a node sub-bitmap satisfying node-count,
//! CPU-count, memory-per-task, exclusivity, explicit-node-list, and
//! relative-offset constraints (spec.md §4.4).

use batchctl_bitset::Bitmap;
use batchctl_types::{SchedulerError, NODE_COUNT_INFINITE};

use crate::adapters::{NodeRegistry, SwitchPlugin};
use crate::job::Job;
use crate::step::TaskDistribution;

/// A step-create request's node-selection inputs.
#[derive(Debug, Clone, Default)]
pub struct NodeRequest {
    /// Explicit node count, or `Some(NODE_COUNT_INFINITE)` for "all".
    pub node_count: Option<u32>,
    /// Explicit CPU-count target.
    pub cpu_count: Option<u32>,
    /// Caller-supplied candidate node set, already parsed to a bitmap
    /// over the job's node-index space.
    pub explicit_nodes: Option<Bitmap>,
    /// Skip this many idle-available nodes from the front before
    /// filling (job-array / heterogeneous-step replay support).
    pub relative_offset: Option<usize>,
    /// Minimum free memory (MiB) required per task.
    pub mem_per_task: Option<u64>,
    /// Exclusive-node request.
    pub exclusive: bool,
    /// Requested task distribution.
    pub distribution: TaskDistribution,
    /// Total task count for the step.
    pub task_count: u32,
}

/// The selector's successful output.
#[derive(Debug, Clone)]
pub struct NodeSelection {
    /// The chosen node sub-bitmap, a subset of the job's node-index
    /// space.
    pub node_bitmap: Bitmap,
    /// Final distribution, possibly silently promoted from `Arbitrary`
    /// to `Block` when the switch doesn't support arbitrary layouts.
    pub distribution: TaskDistribution,
}

fn up_mask(job: &Job, registry: &dyn NodeRegistry) -> Bitmap {
    let mut mask = Bitmap::zeros(job.node_count());
    for (i, name) in job.node_names.iter().enumerate() {
        if registry.is_up(name) {
            mask.set(i);
        }
    }
    mask
}

fn idle_mask(job: &Job) -> Bitmap {
    let total = job.node_count();
    let busy = job
        .steps
        .iter()
        .fold(Bitmap::zeros(total), |acc, s| acc.or(&s.step_node_bitmap).unwrap_or(acc));
    let mut idle = busy;
    idle.not_in_place();
    idle
}

fn job_is_cpu_homogeneous(job: &Job) -> Option<u32> {
    let n = job.account.node_count();
    if n == 0 {
        return None;
    }
    let (first_cap, ..) = job.account.capacity(0);
    for i in 1..n {
        let (cap, ..) = job.account.capacity(i);
        if cap != first_cap {
            return None;
        }
    }
    Some(first_cap)
}

fn resolve_target(request: &NodeRequest, job: &Job) -> Option<u32> {
    if let Some(n) = request.node_count {
        if n != NODE_COUNT_INFINITE {
            return Some(n);
        }
    }
    if let Some(cpu) = request.cpu_count {
        if let Some(per_node) = job_is_cpu_homogeneous(job) {
            if per_node > 0 {
                return Some(cpu.div_ceil(per_node));
            }
        }
    }
    None
}

/// Pick nodes for a step request against `job`'s allocation.
/// `fast_schedule` is forwarded to the registry's live CPU-count lookups
/// (§6's fast-schedule policy flag): when set, capacity ceiling checks
/// trust the admin-configured count over the live-detected one.
pub fn select_nodes(
    job: &Job,
    registry: &dyn NodeRegistry,
    switch: &dyn SwitchPlugin,
    request: &NodeRequest,
    first_step: bool,
    fast_schedule: bool,
) -> Result<NodeSelection, SchedulerError> {
    let available = up_mask(job, registry);
    if first_step && available.count_ones() < job.node_count() {
        return Err(SchedulerError::NodesBusy);
    }

    if request.exclusive {
        return select_exclusive(job, registry, &available, request, fast_schedule);
    }

    let prefiltered = if let Some(mem_per_task) = request.mem_per_task {
        let mut filtered = Bitmap::zeros(available.len());
        for i in available.iter_set() {
            if job.account.mem_remaining(i) >= mem_per_task {
                filtered.set(i);
            }
        }
        if filtered.count_ones() == 0 && available.count_ones() > 0 {
            return Err(SchedulerError::InvalidTaskMemory);
        }
        filtered
    } else {
        available.clone()
    };

    if request.node_count == Some(NODE_COUNT_INFINITE) {
        return Ok(NodeSelection {
            node_bitmap: prefiltered,
            distribution: request.distribution,
        });
    }

    if let Some(explicit) = &request.explicit_nodes {
        return select_explicit(job, &prefiltered, switch, request, explicit);
    }

    let mut pool = prefiltered;
    if let Some(offset) = request.relative_offset {
        if offset > 0 {
            let to_skip = pool.pick_n(offset.min(pool.count_ones()))?;
            pool = pool.difference(&to_skip)?;
        }
    }

    let target = resolve_target(request, job)
        .unwrap_or_else(|| request.task_count.max(1).min(pool.count_ones() as u32));

    let selected = fill_to_target(job, &pool, target)?;

    if let Some(cpu_target) = request.cpu_count {
        let total_cpu: u32 = selected
            .iter_set()
            .map(|i| job.account.capacity(i).0)
            .sum();
        if total_cpu < cpu_target {
            return Err(SchedulerError::ConfigUnavailable);
        }
    }

    Ok(NodeSelection {
        node_bitmap: selected,
        distribution: request.distribution,
    })
}

fn fill_to_target(job: &Job, pool: &Bitmap, target: u32) -> Result<Bitmap, SchedulerError> {
    let target = target as usize;
    if target == 0 {
        return Ok(Bitmap::zeros(pool.len()));
    }
    if pool.count_ones() < target {
        let total_capacity = job.node_count();
        return Err(if total_capacity >= target {
            SchedulerError::NodesBusy
        } else {
            SchedulerError::ConfigUnavailable
        });
    }

    let idle = idle_mask(job);
    let idle_in_pool = idle.and(pool)?;
    let idle_picked = idle_in_pool.pick_n(idle_in_pool.count_ones().min(target))?;

    let deficit = target - idle_picked.count_ones();
    if deficit == 0 {
        return Ok(idle_picked);
    }

    let remaining_pool = pool.difference(&idle_picked)?;
    let fill = remaining_pool.pick_n(deficit)?;
    idle_picked.or(&fill).map_err(SchedulerError::from)
}

fn select_explicit(
    job: &Job,
    prefiltered: &Bitmap,
    switch: &dyn SwitchPlugin,
    request: &NodeRequest,
    explicit: &Bitmap,
) -> Result<NodeSelection, SchedulerError> {
    if !prefiltered.is_superset_of(explicit)? {
        return Err(SchedulerError::NodesBusy);
    }

    if request.distribution == TaskDistribution::Arbitrary && !switch.supports_arbitrary_distribution() {
        // §4.5 / scenario 3: silently promote to block distribution and
        // fall back to the whole prefiltered available set rather than
        // the caller's named candidates.
        return Ok(NodeSelection {
            node_bitmap: prefiltered.clone(),
            distribution: TaskDistribution::Block,
        });
    }

    let explicit_count = explicit.count_ones() as u32;
    let target = resolve_target(request, job).unwrap_or(explicit_count);

    if explicit_count > target {
        // More candidates than needed: pool the extras as a
        // replenishment set and fill from it deterministically.
        let selected = fill_to_target(job, explicit, target)?;
        Ok(NodeSelection {
            node_bitmap: selected,
            distribution: request.distribution,
        })
    } else {
        // Exactly the right nodes (or no target constraint at all): pin
        // them and exclude the rest from further picking.
        Ok(NodeSelection {
            node_bitmap: explicit.clone(),
            distribution: request.distribution,
        })
    }
}

fn select_exclusive(
    job: &Job,
    registry: &dyn NodeRegistry,
    available: &Bitmap,
    request: &NodeRequest,
    fast_schedule: bool,
) -> Result<NodeSelection, SchedulerError> {
    let target_cpus = request.cpu_count.unwrap_or_else(|| job.account.total_cpus());

    let mut selected = Bitmap::zeros(available.len());
    let mut acc_cpus = 0u32;
    for i in available.iter_set() {
        if acc_cpus >= target_cpus {
            break;
        }
        let mut tasks_fit = job.account.cpu_remaining(i);
        if let Some(mem_per_task) = request.mem_per_task {
            if mem_per_task > 0 {
                let mem_tasks = (job.account.mem_remaining(i) / mem_per_task) as u32;
                tasks_fit = tasks_fit.min(mem_tasks);
            }
        }
        if tasks_fit == 0 {
            continue;
        }
        selected.set(i);
        acc_cpus += tasks_fit;
    }

    if acc_cpus < target_cpus {
        // The live-reported count, not the job's recorded account
        // capacity, bounds whether this request could ever succeed
        // (§6's fast-schedule policy flag governs which count the
        // registry trusts).
        let total_capacity: u32 = job
            .node_names
            .iter()
            .map(|name| registry.cpu_count(name, fast_schedule))
            .sum();
        return Err(if total_capacity >= target_cpus {
            SchedulerError::NodesBusy
        } else {
            SchedulerError::ConfigUnavailable
        });
    }

    Ok(NodeSelection {
        node_bitmap: selected,
        distribution: request.distribution,
    })
}
