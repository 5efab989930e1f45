//! Trace export: the stable document a finished (or in-progress) run can be
//! serialized into, in JSON and in an indented human-readable form.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::buffer::Buffer;
use crate::config::SimulationConfig;
use crate::engine::SimulationState;
use crate::process::ProcessTable;
use crate::semaphore::Semaphores;
use crate::statistics::Statistics;
use crate::ProcessId;

/// Exported view of a simulation run: metadata plus one entry per recorded
/// step. Field names and shapes are a wire contract; do not rename.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceDocument {
    pub metadata: TraceMetadata,
    pub steps: Vec<TraceStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetadata {
    /// RFC 3339 timestamp of the export itself.
    pub export_timestamp: String,
    pub simulation_config: SimulationConfig,
    pub total_steps: usize,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    pub step_number: usize,
    /// RFC 3339 label on the animation timeline: `start_time` plus one
    /// animation period per step. An educational approximation, not a
    /// measurement; kept for format stability.
    pub timestamp: String,
    pub action: String,
    pub process_id: ProcessId,
    pub semaphores: Semaphores,
    pub processes: ProcessTable,
    pub buffer: Buffer,
    pub statistics: Statistics,
}

impl TraceDocument {
    /// Build the export document from the current state and history.
    /// `exported_at_ms` stamps the metadata.
    pub fn build(state: &SimulationState, exported_at_ms: u64) -> Self {
        let speed = state.animation_speed;
        let steps = state
            .history
            .snapshots()
            .iter()
            .map(|snapshot| TraceStep {
                step_number: snapshot.step_number,
                timestamp: rfc3339(step_timestamp_ms(
                    snapshot.start_time,
                    snapshot.step_number,
                    speed,
                )),
                action: snapshot.action.clone(),
                process_id: snapshot.process_id,
                semaphores: snapshot.semaphores.clone(),
                processes: snapshot.processes.clone(),
                buffer: snapshot.buffer.clone(),
                statistics: snapshot.statistics.clone(),
            })
            .collect();
        Self {
            metadata: TraceMetadata {
                export_timestamp: rfc3339(exported_at_ms),
                simulation_config: state.config.clone(),
                total_steps: state.history.len(),
                total_duration_ms: duration_ms(state.history.len(), speed),
            },
            steps,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Indented plain-text rendering carrying the same information as the
    /// JSON form.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let meta = &self.metadata;
        writeln!(out, "Bounded-buffer simulation trace").unwrap();
        writeln!(out, "Exported: {}", meta.export_timestamp).unwrap();
        writeln!(
            out,
            "Config: buffer_size={} producers={} consumers={} speed={}",
            meta.simulation_config.buffer_size,
            meta.simulation_config.producer_count,
            meta.simulation_config.consumer_count,
            meta.simulation_config.animation_speed,
        )
        .unwrap();
        writeln!(
            out,
            "Total steps: {} ({} ms)",
            meta.total_steps, meta.total_duration_ms
        )
        .unwrap();

        for step in &self.steps {
            writeln!(out).unwrap();
            writeln!(
                out,
                "Step {} [{}] {}: {}",
                step.step_number, step.timestamp, step.process_id, step.action
            )
            .unwrap();

            writeln!(out, "  semaphores:").unwrap();
            for semaphore in step.semaphores.iter() {
                let queue: Vec<String> =
                    semaphore.wait_queue.iter().map(|id| id.to_string()).collect();
                writeln!(
                    out,
                    "    {} value={} queue=[{}]",
                    semaphore.name,
                    semaphore.value,
                    queue.join(", ")
                )
                .unwrap();
            }

            writeln!(out, "  processes:").unwrap();
            for process in step.processes.iter() {
                let waiting_on = match process.waiting_on {
                    Some(name) => name.to_string(),
                    None => "none".to_owned(),
                };
                writeln!(
                    out,
                    "    {} kind={} state={} operation={} waiting_on={} \
                     items_processed={} total_wait_time={}",
                    process.id,
                    process.kind,
                    process.state,
                    process.current_operation,
                    waiting_on,
                    process.items_processed,
                    process.total_wait_time,
                )
                .unwrap();
            }

            writeln!(out, "  buffer:").unwrap();
            for slot in step.buffer.slots() {
                match &slot.item {
                    Some(item) => writeln!(
                        out,
                        "    slot {} occupied: {} (by {} at step {})",
                        slot.id, item.id, item.produced_by, item.timestamp
                    )
                    .unwrap(),
                    None => writeln!(out, "    slot {} free", slot.id).unwrap(),
                }
            }

            let stats = &step.statistics;
            writeln!(
                out,
                "  statistics: produced={} consumed={} utilization={:.1}% average_wait={:.1}",
                stats.items_produced,
                stats.items_consumed,
                stats.buffer_utilization,
                stats.average_wait_time,
            )
            .unwrap();
        }
        out
    }
}

/// Timeline label of one step, in epoch milliseconds:
/// `start_time + step_number * 1000 / animation_speed`.
fn step_timestamp_ms(start_time: u64, step_number: usize, speed: f64) -> u64 {
    start_time + (step_number as f64 * 1000.0 / speed) as u64
}

fn duration_ms(total_steps: usize, speed: f64) -> u64 {
    (total_steps as f64 * 1000.0 / speed) as u64
}

fn rfc3339(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
