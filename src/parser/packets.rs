use super::decoder::PacketContext;
use super::state::{FlowSlot, ParseState};
use crate::flow::{Endpoint, FlowKey, FlowMeta, Protocol};
use crate::gquic;

/// Routes one decoded packet into its flow slot and, for UDP payloads,
/// through the GQUIC decoder.
pub fn add_packet(context: &PacketContext, timestamp: f64, wire_len: u64, state: &mut ParseState) {
    let Some((src, dst, protocol)) = unpack_context(context) else {
        return;
    };

    let key = FlowKey::new(src, dst, protocol);
    let slot = state.flows.entry(key).or_insert_with(|| FlowSlot {
        meta: FlowMeta::new(src, dst, protocol, timestamp),
        decode: gquic::on_new_flow(protocol, src.port, dst.port),
    });
    slot.meta.account(timestamp, wire_len);
    state.packet_count += 1;

    if let Some(payload) = &context.udp_payload {
        let dir = slot.meta.direction_of(src);
        gquic::decode_packet(
            payload,
            dir,
            context.first_fragment,
            &mut slot.decode,
            &mut state.summary,
        );
    }
}

fn unpack_context(context: &PacketContext) -> Option<(Endpoint, Endpoint, Protocol)> {
    match (
        context.src_ip,
        context.dst_ip,
        context.src_port,
        context.dst_port,
        context.protocol,
    ) {
        (Some(src_ip), Some(dst_ip), Some(src_port), Some(dst_port), Some(protocol)) => Some((
            Endpoint::new(src_ip, src_port),
            Endpoint::new(dst_ip, dst_port),
            protocol,
        )),
        _ => None,
    }
}
