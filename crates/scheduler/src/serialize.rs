//! C7 — pack/unpack a step record into a seek-able byte buffer for crash
//! recovery and info RPCs (spec.md §4.7). The field order and grouping
//! mirror `original_source`'s `step_mgr.c` `pack_job_step` /
//! `load_step_state` (`pack32`/`pack_time`/`packstr` in sequence),
//! translated into a small length-prefixed binary format instead of
//! SLURM's mutable `Buf`.

use batchctl_bitset::{format, Bitmap};
use batchctl_types::{SchedulerError, StepId, EXIT_CODE_UNSET};

use crate::adapters::{CheckpointPlugin, SwitchPlugin};
use crate::step::{StepLayout, StepRecord, StepRecordBuilder};

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn bytes(&mut self, b: &[u8]) {
        self.u32(b.len() as u32);
        self.buf.extend_from_slice(b);
    }

    fn bitmap(&mut self, b: &Bitmap) {
        self.u32(b.len() as u32);
        self.str(&format::dump(b));
    }

    fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads sequentially from a byte slice, tracking a cursor position — the
/// "seek-able byte buffer" of §4.7, read-only.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SchedulerError> {
        if self.pos + n > self.data.len() {
            return Err(parse_err("unexpected end of step blob"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SchedulerError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, SchedulerError> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> Result<u16, SchedulerError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, SchedulerError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, SchedulerError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, SchedulerError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, SchedulerError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String, SchedulerError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| parse_err("non-utf8 string in step blob"))
    }

    fn bytes(&mut self) -> Result<Vec<u8>, SchedulerError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn bitmap(&mut self) -> Result<Bitmap, SchedulerError> {
        let len = self.u32()? as usize;
        let dump = self.str()?;
        format::parse(&dump, len).map_err(SchedulerError::from)
    }
}

fn parse_err(msg: &str) -> SchedulerError {
    SchedulerError::Bitmap(batchctl_bitset::BitmapError::Parse(msg.to_string()))
}

/// Serialize `step` to a binary blob. `switch`/`ckpt` supply the opaque
/// handle (de)serializers (C8); a step with no switch handle packs an
/// empty switch blob.
pub fn pack(step: &StepRecord, switch: &dyn SwitchPlugin, ckpt: &dyn CheckpointPlugin) -> Vec<u8> {
    let mut w = Writer::new();

    w.u32(step.step_id.0);
    w.bool(step.cyclic);
    w.bool(step.exclusive);
    w.u16(step.port);
    w.i64(step.ckpt_interval);
    w.u32(step.requested_cpu_count);
    w.u64(step.mem_per_task);
    w.i32(step.exit_code);

    if step.exit_code != EXIT_CODE_UNSET {
        let exit_bitmap = step
            .exit_node_bitmap
            .clone()
            .unwrap_or_else(|| Bitmap::zeros(step.step_node_count()));
        w.bitmap(&exit_bitmap);
    }

    w.bitmap(&step.core_bitmap);

    w.i64(step.start_time);
    w.i64(step.pre_suspend_time);
    w.i64(step.tot_suspend_time);
    w.i64(step.last_ckpt_time);

    w.str(&step.host);
    w.str(&step.name);
    w.str(&step.network);
    w.str(&step.ckpt_path);

    w.bool(step.batch);
    if !step.batch {
        let layout = step.layout.as_ref();
        let tasks_per_node = layout.map(|l| l.tasks_per_node.as_slice()).unwrap_or(&[]);
        w.u32(tasks_per_node.len() as u32);
        for t in tasks_per_node {
            w.u32(*t);
        }
        w.str(layout.map(|l| l.node_list.as_str()).unwrap_or(""));

        let switch_blob = step
            .switch_handle
            .as_ref()
            .map(|h| switch.pack_jobinfo(h))
            .unwrap_or_default();
        w.bytes(&switch_blob);
    }

    let ckpt_blob = step
        .ckpt_handle
        .as_ref()
        .map(|h| ckpt.pack_jobinfo(h))
        .unwrap_or_default();
    w.bytes(&ckpt_blob);

    w.into_vec()
}

/// Deserialize a blob produced by [`pack`] into a fresh [`StepRecord`].
///
/// `job_node_names` resolves the step layout's node-list string back into
/// a job-node-index-space `step_node_bitmap`, since that bitmap itself is
/// not part of the wire format (§4.7 derives it from the layout, the same
/// way the core always re-derives the reported node-list string from the
/// final selected bitmap rather than the other way around). A batch step
/// carries no layout, so its `step_node_bitmap` defaults to the full job
/// allocation.
///
/// Strict: an unrecognized node name, a malformed bitmap dump, or a
/// truncated blob aborts with [`SchedulerError::Bitmap`] and nothing is
/// returned; no partial `StepRecord` escapes a failed unpack.
pub fn unpack(
    data: &[u8],
    job_node_names: &[String],
    switch: &dyn SwitchPlugin,
    ckpt: &dyn CheckpointPlugin,
) -> Result<StepRecord, SchedulerError> {
    let mut r = Reader::new(data);

    let step_id = StepId(r.u32()?);
    let cyclic = r.bool()?;
    let exclusive = r.bool()?;
    let port = r.u16()?;
    let ckpt_interval = r.i64()?;
    let requested_cpu_count = r.u32()?;
    let mem_per_task = r.u64()?;
    let exit_code = r.i32()?;

    let exit_node_bitmap = if exit_code != EXIT_CODE_UNSET {
        Some(r.bitmap()?)
    } else {
        None
    };

    let core_bitmap = r.bitmap()?;

    let start_time = r.i64()?;
    let pre_suspend_time = r.i64()?;
    let tot_suspend_time = r.i64()?;
    let last_ckpt_time = r.i64()?;

    let host = r.str()?;
    let name = r.str()?;
    let network = r.str()?;
    let ckpt_path = r.str()?;

    let batch = r.bool()?;
    let (layout, switch_handle, step_node_bitmap) = if !batch {
        let task_count = r.u32()? as usize;
        let mut tasks_per_node = Vec::with_capacity(task_count);
        for _ in 0..task_count {
            tasks_per_node.push(r.u32()?);
        }
        let node_list = r.str()?;
        let switch_blob = r.bytes()?;
        let handle = switch.unpack_jobinfo(&switch_blob);

        let mut bitmap = Bitmap::zeros(job_node_names.len());
        for node_name in node_list.split(',').filter(|s| !s.is_empty()) {
            let idx = job_node_names
                .iter()
                .position(|n| n == node_name)
                .ok_or_else(|| parse_err(&format!("unknown node {node_name:?} in step blob")))?;
            bitmap.set(idx);
        }

        (
            Some(StepLayout {
                tasks_per_node,
                node_list,
            }),
            Some(handle),
            bitmap,
        )
    } else {
        (None, None, Bitmap::ones(job_node_names.len()))
    };

    let ckpt_blob = r.bytes()?;
    let ckpt_handle = Some(ckpt.unpack_jobinfo(&ckpt_blob));

    let mut record = StepRecordBuilder::new(step_id, step_node_bitmap, core_bitmap, start_time)
        .requested_cpu_count(requested_cpu_count)
        .mem_per_task(mem_per_task)
        .cyclic(cyclic)
        .exclusive(exclusive)
        .batch(batch)
        .ckpt_interval(ckpt_interval)
        .ckpt_path(ckpt_path)
        .network(network)
        .name(name)
        .client(host, port)
        .build(layout, switch_handle, ckpt_handle);

    record.exit_node_bitmap = exit_node_bitmap;
    record.exit_code = exit_code;
    record.pre_suspend_time = pre_suspend_time;
    record.tot_suspend_time = tot_suspend_time;
    record.last_ckpt_time = last_ckpt_time;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{NoopCheckpointPlugin, NoopSwitchPlugin};
    use batchctl_types::StepId;

    fn node_names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("node{i}")).collect()
    }

    #[test]
    fn round_trips_a_non_batch_step() {
        let names = node_names(4);
        let mut step_node_bitmap = Bitmap::zeros(4);
        step_node_bitmap.set(0);
        step_node_bitmap.set(2);

        let mut core_bitmap = Bitmap::zeros(16);
        core_bitmap.set(0);
        core_bitmap.set(1);

        let mut step = StepRecordBuilder::new(StepId(7), step_node_bitmap, core_bitmap, 100)
            .requested_cpu_count(2)
            .mem_per_task(1024)
            .cyclic(true)
            .exclusive(false)
            .ckpt_interval(30)
            .ckpt_path("/ckpt/7")
            .network("none")
            .name("mystep")
            .client("client.example", 4242)
            .build(
                Some(StepLayout {
                    tasks_per_node: vec![1, 1],
                    node_list: "node0,node2".into(),
                }),
                Some(NoopSwitchPlugin.allocate_jobinfo()),
                Some(NoopCheckpointPlugin.allocate_jobinfo()),
            );
        step.fold_exit_code(0);
        step.ensure_exit_bitmap().set(0);

        let blob = pack(&step, &NoopSwitchPlugin, &NoopCheckpointPlugin);
        let restored = unpack(&blob, &names, &NoopSwitchPlugin, &NoopCheckpointPlugin).unwrap();

        assert_eq!(restored.step_id, step.step_id);
        assert_eq!(restored.step_node_bitmap, step.step_node_bitmap);
        assert_eq!(restored.core_bitmap, step.core_bitmap);
        assert_eq!(restored.exit_node_bitmap, step.exit_node_bitmap);
        assert_eq!(restored.exit_code, step.exit_code);
        assert_eq!(restored.requested_cpu_count, step.requested_cpu_count);
        assert_eq!(restored.mem_per_task, step.mem_per_task);
        assert_eq!(restored.cyclic, step.cyclic);
        assert_eq!(restored.host, step.host);
        assert_eq!(restored.name, step.name);
        assert_eq!(restored.ckpt_path, step.ckpt_path);
        assert_eq!(
            restored.layout.as_ref().unwrap().tasks_per_node,
            step.layout.as_ref().unwrap().tasks_per_node
        );
    }

    #[test]
    fn batch_step_round_trips_without_layout() {
        let names = node_names(2);
        let step = StepRecordBuilder::new(StepId(1), Bitmap::ones(2), Bitmap::zeros(0), 50)
            .batch(true)
            .build(None, None, Some(NoopCheckpointPlugin.allocate_jobinfo()));

        let blob = pack(&step, &NoopSwitchPlugin, &NoopCheckpointPlugin);
        let restored = unpack(&blob, &names, &NoopSwitchPlugin, &NoopCheckpointPlugin).unwrap();

        assert!(restored.batch);
        assert!(restored.layout.is_none());
        assert_eq!(restored.step_node_bitmap.count_ones(), 2);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let names = node_names(2);
        let step = StepRecordBuilder::new(StepId(1), Bitmap::ones(2), Bitmap::zeros(8), 50)
            .batch(true)
            .build(None, None, Some(NoopCheckpointPlugin.allocate_jobinfo()));
        let mut blob = pack(&step, &NoopSwitchPlugin, &NoopCheckpointPlugin);
        blob.truncate(blob.len() - 2);
        assert!(unpack(&blob, &names, &NoopSwitchPlugin, &NoopCheckpointPlugin).is_err());
    }

    #[test]
    fn unknown_node_name_is_rejected() {
        let step = StepRecordBuilder::new(StepId(1), Bitmap::ones(1), Bitmap::zeros(4), 50)
            .build(
                Some(StepLayout {
                    tasks_per_node: vec![1],
                    node_list: "ghost-node".into(),
                }),
                None,
                None,
            );
        let blob = pack(&step, &NoopSwitchPlugin, &NoopCheckpointPlugin);
        let names = node_names(1);
        assert!(unpack(&blob, &names, &NoopSwitchPlugin, &NoopCheckpointPlugin).is_err());
    }
}
