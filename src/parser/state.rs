use crate::flow::{FlowKey, FlowMeta};
use crate::gquic;
use crate::gquic::state::{FlowDecodeState, FlowRecord, GquicSummary};
use std::collections::HashMap;

/// One flow-table slot: pipeline bookkeeping plus the decoder's
/// exclusively-owned per-flow state.
pub struct FlowSlot {
    pub meta: FlowMeta,
    pub decode: FlowDecodeState,
}

/// Accumulated state for one capture run.
#[derive(Default)]
pub struct ParseState {
    pub flows: HashMap<FlowKey, FlowSlot>,
    pub packet_count: usize,
    pub first_packet_ts: Option<f64>,
    pub summary: GquicSummary,
}

impl ParseState {
    /// Terminates every live flow, draining the table into output records
    /// sorted by flow key.
    pub fn terminate_flows(&mut self) -> Vec<(FlowKey, FlowRecord)> {
        let summary = &mut self.summary;
        let mut records: Vec<(FlowKey, FlowRecord)> = self
            .flows
            .drain()
            .map(|(key, slot)| (key, gquic::on_flow_terminate(&slot.decode, summary)))
            .collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }
}

pub fn update_first_timestamp(first_packet_ts: &mut Option<f64>, timestamp: f64) {
    match first_packet_ts {
        None => *first_packet_ts = Some(timestamp),
        Some(current) if timestamp < *current => *first_packet_ts = Some(timestamp),
        _ => {}
    }
}
