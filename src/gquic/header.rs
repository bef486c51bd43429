use super::cursor::{Cursor, Result};
use super::state::{FlowDecodeState, GquicSummary, STAT_MALFORMED};
use super::{PUB_FLAG_CID, PUB_FLAG_DNONCE, PUB_FLAG_PKTNO, PUB_FLAG_RESERVED, PUB_FLAG_RESET, PUB_FLAG_VERSION};
use crate::flow::Direction;
use tracing::trace;

/// Header fields the frame loop still needs; everything else about the
/// public header is packet-scoped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PublicHeader {
    pub version: u8,
    pub pktnum_len: u8,
}

/// Decodes the unencrypted public header, leaving the cursor at the first
/// frame byte. `Ok(None)` means the packet was a Public Reset and carries no
/// frames; a [`Snap`](super::cursor::Snap) maps to the snapped status bit at
/// the per-packet boundary.
pub(crate) fn decode(
    cur: &mut Cursor,
    dir: Direction,
    st: &mut FlowDecodeState,
    summary: &mut GquicSummary,
) -> Result<Option<PublicHeader>> {
    let pub_flags = cur.read_u8()?;
    st.pub_flags |= pub_flags;
    if pub_flags & PUB_FLAG_RESERVED != 0 {
        st.status |= STAT_MALFORMED;
    }

    if pub_flags & PUB_FLAG_CID != 0 {
        let cid = cur.read_le_u64()?;
        st.record_cid(cid);
    }

    let version_present = pub_flags & PUB_FLAG_VERSION != 0;
    let mut version = 0u8;
    if version_present {
        let raw = cur.read_u32()?.to_be_bytes();
        version = parse_version(&raw);
    }

    if pub_flags & PUB_FLAG_RESET != 0 {
        // Public Reset: nothing decodable follows for this packet
        if pub_flags & PUB_FLAG_CID == 0 {
            st.status |= STAT_MALFORMED;
        }
        summary.prst += 1;
        trace!(pub_flags, "GQUIC public reset");
        return Ok(None);
    }

    // Diversification Nonce (responder only)
    if version >= 33 && pub_flags & PUB_FLAG_DNONCE != 0 && dir == Direction::B {
        cur.skip(32)?;
    }

    // Packet Number
    let pktnum_len = pktnum_width(pub_flags);
    let pktnum = match pktnum_len {
        1 => u64::from(cur.read_u8()?),
        2 => u64::from(cur.read_u16()?),
        4 => u64::from(cur.read_u32()?),
        _ => cur.read_u48()?,
    };

    trace!(pub_flags, version, pktnum, "GQUIC public header");

    // Message Authentication Hash
    cur.skip(12)?;

    // Private Flags; version-less packets carry none
    if version_present && version < 34 {
        cur.skip(1)?;
    }

    Ok(Some(PublicHeader { version, pktnum_len }))
}

/// Packet-number width in bytes from the 2-bit flags sub-field.
pub(crate) fn pktnum_width(pub_flags: u8) -> u8 {
    match (pub_flags & PUB_FLAG_PKTNO) >> 4 {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 6,
    }
}

/// Derives the version number from its 4-byte wire encoding by reading the
/// ASCII digit run after the leading letter, e.g. `Q035` -> 35.
pub(crate) fn parse_version(raw: &[u8; 4]) -> u8 {
    let mut version = 0u32;
    for &b in &raw[1..] {
        if !b.is_ascii_digit() {
            break;
        }
        version = version * 10 + u32::from(b - b'0');
    }
    version as u8
}
