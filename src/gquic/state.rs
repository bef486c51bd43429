//! Per-flow decode state and run-level aggregation.

use tracing::info;

// Decode status bits (`FlowDecodeState::status`).
pub const STAT_GQUIC: u8 = 0x01; // flow matched the port heuristic
pub const STAT_HANDSHAKE: u8 = 0x02; // handshake stream (ID 1) seen
pub const STAT_CID_CHANGE: u8 = 0x04; // connection ID changed mid-flow
pub const STAT_SNAPPED: u8 = 0x40; // payload ended before a field did
pub const STAT_MALFORMED: u8 = 0x80; // structurally invalid data

// Frame-type bitmap bits; control frames 0x00-0x07 map to `1 << frame_type`.
pub const FRAME_STREAM: u16 = 0x8000;
pub const FRAME_ACK: u16 = 0x4000;

/// Longest SNI/UAID value kept per flow.
pub const MAX_ATTR_LEN: usize = 63;

/// Accumulator mutated across the packets of one flow and flushed into a
/// [`FlowRecord`] when the flow terminates.
#[derive(Debug, Default, Clone)]
pub struct FlowDecodeState {
    /// Monotonically OR-accumulated decode outcomes; never cleared mid-flow.
    pub status: u8,
    /// OR of every public-flags byte observed.
    pub pub_flags: u8,
    /// Frame categories observed across the flow.
    pub frame_types: u16,
    /// First connection ID seen, 0 if none.
    pub conn_id: u64,
    pub sni: String,
    pub uaid: String,
}

impl FlowDecodeState {
    /// First-seen-wins: a later, different ID only sets the change bit.
    pub fn record_cid(&mut self, cid: u64) {
        if self.conn_id == 0 {
            self.conn_id = cid;
        } else if self.conn_id != cid {
            self.status |= STAT_CID_CHANGE;
        }
    }
}

/// Fixed-schema output record, one per terminated flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub status: u8,
    pub pub_flags: u8,
    pub frame_types: u16,
    pub conn_id: u64,
    pub sni: String,
    pub uaid: String,
}

/// Run-level aggregation across all flows. Owned by the pipeline and passed
/// into the decoder by reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct GquicSummary {
    /// OR of every terminated flow's status.
    pub status: u8,
    /// GQUIC packets decoded.
    pub packets: u64,
    pub chlo: u64,
    pub shlo: u64,
    pub rej: u64,
    pub prst: u64,
}

impl GquicSummary {
    pub fn log_report(&self, total_packets: usize) {
        if self.packets == 0 {
            return;
        }
        info!(
            status = format_args!("0x{:02x}", self.status),
            gquic_packets = self.packets,
            total_packets,
            chlo = self.chlo,
            shlo = self.shlo,
            rej = self.rej,
            prst = self.prst,
            "GQUIC decode summary"
        );
    }
}
