use crate::flow::{IPAddress, Protocol};
use etherparse::{NetHeaders, PacketHeaders, TransportHeader};
use tracing::trace;

/// L2-L4 fields extracted from one captured packet.
#[derive(Default, Debug, Clone)]
pub struct PacketContext {
    pub src_ip: Option<IPAddress>,
    pub dst_ip: Option<IPAddress>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub protocol: Option<Protocol>,
    /// False for later fragments of a fragmented datagram.
    pub first_fragment: bool,
    pub udp_payload: Option<Vec<u8>>,
}

pub fn decode_headers(packet: &[u8]) -> Result<PacketContext, String> {
    let mut context = PacketContext {
        first_fragment: true,
        ..PacketContext::default()
    };

    let headers = PacketHeaders::from_ethernet_slice(packet).map_err(|err| {
        trace!(error = ?err, "Failed to parse packet headers");
        format!("header parse error: {err:?}")
    })?;

    if let Some(net) = &headers.net {
        match net {
            NetHeaders::Ipv4(ip, _) => {
                context.src_ip = Some(IPAddress::V4(ip.source));
                context.dst_ip = Some(IPAddress::V4(ip.destination));
                context.first_fragment = ip.fragment_offset.value() == 0;
            }
            NetHeaders::Ipv6(ip, exts) => {
                context.src_ip = Some(IPAddress::V6(ip.source));
                context.dst_ip = Some(IPAddress::V6(ip.destination));
                if let Some(frag) = &exts.fragment {
                    context.first_fragment = frag.fragment_offset.value() == 0;
                }
            }
            _ => {}
        }
    }

    if let Some(transport) = headers.transport {
        match transport {
            TransportHeader::Udp(udp) => {
                context.src_port = Some(udp.source_port);
                context.dst_port = Some(udp.destination_port);
                context.protocol = Some(Protocol::UDP);
                context.udp_payload = Some(headers.payload.slice().to_vec());
            }
            TransportHeader::Tcp(tcp) => {
                context.src_port = Some(tcp.source_port);
                context.dst_port = Some(tcp.destination_port);
                context.protocol = Some(Protocol::TCP);
            }
            _ => {}
        }
    }

    Ok(context)
}
