//! Passive GQUIC (Google QUIC) decoder.
//!
//! Accumulates a [`FlowDecodeState`] across the packets of a flow: public
//! header fields, the frame-type bitmap, and the SNI/UAID handshake
//! attributes. Decode failures never abort the run; they surface as bits in
//! the per-flow status and stop only the current packet.

pub mod cursor;
mod frames;
mod handshake;
mod header;
pub mod state;


use crate::flow::{Direction, Protocol};
use cursor::Cursor;
use state::{FlowDecodeState, FlowRecord, GquicSummary, STAT_GQUIC, STAT_SNAPPED};

/// UDP ports over which GQUIC runs.
pub const GQUIC_PORT1: u16 = 80;
pub const GQUIC_PORT2: u16 = 443;

// Public Flags
pub(crate) const PUB_FLAG_VERSION: u8 = 0x01; // header contains a version
pub(crate) const PUB_FLAG_RESET: u8 = 0x02; // Public Reset packet
pub(crate) const PUB_FLAG_DNONCE: u8 = 0x04; // 32-byte diversification nonce
pub(crate) const PUB_FLAG_CID: u8 = 0x08; // 8-byte connection ID
pub(crate) const PUB_FLAG_PKTNO: u8 = 0x30; // packet-number width sub-field
pub(crate) const PUB_FLAG_RESERVED: u8 = 0x80; // MUST be 0

/// Port heuristic: does this endpoint pair look like GQUIC?
pub fn is_candidate(sport: u16, dport: u16) -> bool {
    sport == GQUIC_PORT1
        || dport == GQUIC_PORT1
        || sport == GQUIC_PORT2
        || dport == GQUIC_PORT2
}

/// Called when the flow table allocates a new flow. Classification happens
/// exactly once, here; packets of non-candidate flows are never decoded.
pub fn on_new_flow(protocol: Protocol, sport: u16, dport: u16) -> FlowDecodeState {
    let mut st = FlowDecodeState::default();
    if protocol == Protocol::UDP && is_candidate(sport, dport) {
        st.status |= STAT_GQUIC;
    }
    st
}

/// Decodes one packet's transport payload against its flow's state.
///
/// Non-first fragments and packets of non-candidate flows are ignored. All
/// failures are local to this packet: state committed before the failing
/// step is kept, and the failure is recorded in the status bitset.
pub fn decode_packet(
    payload: &[u8],
    dir: Direction,
    first_fragment: bool,
    st: &mut FlowDecodeState,
    summary: &mut GquicSummary,
) {
    if !first_fragment || st.status & STAT_GQUIC == 0 {
        return;
    }
    summary.packets += 1;

    let mut cur = Cursor::new(payload);

    let hdr = match header::decode(&mut cur, dir, st, summary) {
        Ok(Some(hdr)) => hdr,
        Ok(None) => return, // Public Reset carries no frames
        Err(_) => {
            st.status |= STAT_SNAPPED;
            return;
        }
    };

    if frames::dispatch(&mut cur, &hdr, st, summary).is_err() {
        st.status |= STAT_SNAPPED;
    }
}

/// Flushes a terminated flow into its output record and folds its status
/// into the run summary. The flow table releases the state afterwards.
pub fn on_flow_terminate(st: &FlowDecodeState, summary: &mut GquicSummary) -> FlowRecord {
    summary.status |= st.status;
    FlowRecord {
        status: st.status,
        pub_flags: st.pub_flags,
        frame_types: st.frame_types,
        conn_id: st.conn_id,
        sni: st.sni.clone(),
        uaid: st.uaid.clone(),
    }
}
