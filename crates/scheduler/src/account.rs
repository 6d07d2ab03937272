//! C2 — the per-job resource account: dense per-job-node CPU/memory
//! capacity and usage, plus the job's global core bitmap and the
//! currently-charged subset of it.

use batchctl_bitset::Bitmap;
use tracing::warn;

/// Socket x core geometry for a single job-node, and where its cores land
/// in the job's `core_bitmap`.
#[derive(Debug, Clone)]
pub struct NodeCoreLayout {
    sockets: u32,
    cores_per_socket: u32,
    /// First bit index in `core_bitmap` belonging to this node.
    core_offset: usize,
}

impl NodeCoreLayout {
    /// Construct a layout describing `sockets * cores_per_socket` cores
    /// starting at `core_offset` in the owning account's `core_bitmap`.
    pub fn new(sockets: u32, cores_per_socket: u32, core_offset: usize) -> Self {
        Self {
            sockets,
            cores_per_socket,
            core_offset,
        }
    }

    /// Total cores on this node.
    pub fn total_cores(&self) -> u32 {
        self.sockets * self.cores_per_socket
    }

    /// Enumerate `(socket, core, bit_offset)` triples for this node, in
    /// socket-major, core-minor order — the order the core picker (C5)
    /// walks when selecting idle cores.
    pub fn core_offsets(&self) -> impl Iterator<Item = (u32, u32, usize)> + '_ {
        let cores_per_socket = self.cores_per_socket;
        let base = self.core_offset;
        (0..self.sockets).flat_map(move |socket| {
            (0..cores_per_socket).map(move |core| {
                let bit = base + (socket * cores_per_socket + core) as usize;
                (socket, core, bit)
            })
        })
    }
}

/// Per-job-node CPU/memory capacity and usage, plus the job's core
/// bitmaps. Owned one-per-job; mutated only by the core, always from
/// within the composite lock (spec.md §5).
#[derive(Debug, Clone)]
pub struct ResourceAccount {
    cpu_capacity: Vec<u32>,
    cpu_used: Vec<u32>,
    mem_capacity: Vec<u64>,
    mem_used: Vec<u64>,
    layout: Vec<NodeCoreLayout>,
    core_bitmap: Bitmap,
    core_used_bitmap: Bitmap,
}

impl ResourceAccount {
    /// Build an account for a job with the given per-node capacities and
    /// core geometry. `core_bitmap` starts fully owned by the job (every
    /// bit set); `core_used_bitmap` starts empty.
    pub fn new(cpu_capacity: Vec<u32>, mem_capacity: Vec<u64>, layout: Vec<NodeCoreLayout>) -> Self {
        let total_cores: usize = layout.iter().map(|l| l.total_cores() as usize).sum();
        let cpu_used = vec![0u32; cpu_capacity.len()];
        let mem_used = vec![0u64; mem_capacity.len()];
        Self {
            cpu_capacity,
            cpu_used,
            mem_capacity,
            mem_used,
            layout,
            core_bitmap: Bitmap::ones(total_cores),
            core_used_bitmap: Bitmap::zeros(total_cores),
        }
    }

    /// Number of job-nodes this account covers.
    pub fn node_count(&self) -> usize {
        self.cpu_capacity.len()
    }

    /// `(cpu_cap, cpu_used, mem_cap, mem_used)` for a job-node index.
    pub fn capacity(&self, node_idx: usize) -> (u32, u32, u64, u64) {
        (
            self.cpu_capacity[node_idx],
            self.cpu_used[node_idx],
            self.mem_capacity[node_idx],
            self.mem_used[node_idx],
        )
    }

    /// Cores remaining before `cpu_capacity[node_idx]` is exhausted.
    pub fn cpu_remaining(&self, node_idx: usize) -> u32 {
        self.cpu_capacity[node_idx].saturating_sub(self.cpu_used[node_idx])
    }

    /// Memory remaining before `mem_capacity[node_idx]` is exhausted.
    pub fn mem_remaining(&self, node_idx: usize) -> u64 {
        self.mem_capacity[node_idx].saturating_sub(self.mem_used[node_idx])
    }

    /// Core geometry for a job-node index.
    pub fn layout(&self, node_idx: usize) -> &NodeCoreLayout {
        &self.layout[node_idx]
    }

    /// The job's total core bitmap (every core it owns).
    pub fn core_bitmap(&self) -> &Bitmap {
        &self.core_bitmap
    }

    /// The subset of `core_bitmap` currently charged to some non-batch,
    /// non-over-subscribed step.
    pub fn core_used_bitmap(&self) -> &Bitmap {
        &self.core_used_bitmap
    }

    /// Total CPUs across every job-node (used by the selector's
    /// CPU-target-equals-job-total shortcut in C5).
    pub fn total_cpus(&self) -> u32 {
        self.cpu_capacity.iter().sum()
    }

    /// Charge `cpus` CPUs and `mem` memory against job-node `node_idx`.
    pub fn charge(&mut self, node_idx: usize, cpus: u32, mem: u64) {
        self.cpu_used[node_idx] = self.cpu_used[node_idx].saturating_add(cpus);
        self.mem_used[node_idx] = self.mem_used[node_idx].saturating_add(mem);
    }

    /// Refund `cpus` CPUs and `mem` memory from job-node `node_idx`.
    ///
    /// Underflow-protected per invariant 3: a refund that would drive
    /// usage below zero is clamped to zero and logged rather than
    /// panicking or returning an error (§7: refunds are logged and
    /// swallowed, never surfaced as the primary outcome of an operation).
    pub fn refund(&mut self, node_idx: usize, cpus: u32, mem: u64) {
        if self.cpu_used[node_idx] < cpus {
            warn!(
                node_idx,
                requested = cpus,
                available = self.cpu_used[node_idx],
                "cpu refund underflow, clamping to zero"
            );
            self.cpu_used[node_idx] = 0;
        } else {
            self.cpu_used[node_idx] -= cpus;
        }

        if self.mem_used[node_idx] < mem {
            warn!(
                node_idx,
                requested = mem,
                available = self.mem_used[node_idx],
                "memory refund underflow, clamping to zero"
            );
            self.mem_used[node_idx] = 0;
        } else {
            self.mem_used[node_idx] -= mem;
        }
    }

    /// Mark every bit of `bitmap` as used in `core_used_bitmap`.
    pub fn mark_cores_used(&mut self, bitmap: &Bitmap) {
        match self.core_used_bitmap.or(bitmap) {
            Ok(merged) => self.core_used_bitmap = merged,
            Err(err) => warn!(%err, "mark_cores_used: bitmap length mismatch, ignoring"),
        }
    }

    /// Clear every bit of `bitmap` from `core_used_bitmap`.
    pub fn mark_cores_free(&mut self, bitmap: &Bitmap) {
        match self.core_used_bitmap.difference(bitmap) {
            Ok(remaining) => self.core_used_bitmap = remaining,
            Err(err) => warn!(%err, "mark_cores_free: bitmap length mismatch, ignoring"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_account() -> ResourceAccount {
        let layout = vec![
            NodeCoreLayout::new(1, 4, 0),
            NodeCoreLayout::new(1, 4, 4),
        ];
        ResourceAccount::new(vec![4, 4], vec![8_192, 8_192], layout)
    }

    #[test]
    fn charge_and_refund_are_inverses() {
        let mut acct = two_node_account();
        acct.charge(0, 2, 2048);
        assert_eq!(acct.capacity(0), (4, 2, 8192, 2048));
        acct.refund(0, 2, 2048);
        assert_eq!(acct.capacity(0), (4, 0, 8192, 0));
    }

    #[test]
    fn refund_underflow_clamps_to_zero() {
        let mut acct = two_node_account();
        acct.refund(0, 10, 100_000);
        assert_eq!(acct.capacity(0), (4, 0, 8192, 0));
    }

    #[test]
    fn core_bitmap_starts_fully_owned_and_unused() {
        let acct = two_node_account();
        assert_eq!(acct.core_bitmap().count_ones(), 8);
        assert_eq!(acct.core_used_bitmap().count_ones(), 0);
    }

    #[test]
    fn mark_used_then_free_round_trips() {
        let mut acct = two_node_account();
        let mut used = Bitmap::zeros(8);
        used.set(0);
        used.set(1);
        acct.mark_cores_used(&used);
        assert_eq!(acct.core_used_bitmap().count_ones(), 2);
        acct.mark_cores_free(&used);
        assert_eq!(acct.core_used_bitmap().count_ones(), 0);
    }
}
