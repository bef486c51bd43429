use super::cursor::{Cursor, Result};
use super::handshake;
use super::header::PublicHeader;
use super::state::{
    FlowDecodeState, GquicSummary, FRAME_ACK, FRAME_STREAM, STAT_HANDSHAKE, STAT_MALFORMED,
};
use tracing::trace;

// Frame types
const FRAME_TYPE_PADDING: u8 = 0x00;
const FRAME_TYPE_RST_STREAM: u8 = 0x01;
const FRAME_TYPE_CONN_CLOSE: u8 = 0x02;
const FRAME_TYPE_GOAWAY: u8 = 0x03;
const FRAME_TYPE_WIN_UPDATE: u8 = 0x04;
const FRAME_TYPE_BLOCKED: u8 = 0x05;
const FRAME_TYPE_STOP_WAIT: u8 = 0x06;
const FRAME_TYPE_PING: u8 = 0x07;
const FRAME_TYPE_ACK: u8 = 0x40; // 01nullmm
const FRAME_TYPE_STREAM: u8 = 0x80; // 1fdoooss

// STREAM frame sub-fields
const STREAM_FIN: u8 = 0x40;
const STREAM_DLEN: u8 = 0x20; // data length present
const STREAM_OLEN: u8 = 0x1c; // offset width (3 bits)
const STREAM_SLEN: u8 = 0x03; // stream-ID width (2 bits)

// ACK frame sub-fields
const ACK_N: u8 = 0x20; // more than one ack range
const ACK_LL_LEN: u8 = 0x0c; // largest-observed width (2 bits)
const ACK_MP_LEN: u8 = 0x03; // missing-packet delta width (2 bits)

enum StreamOutcome {
    Continue,
    Stop,
}

/// Iterates frames until the payload is exhausted or a terminal condition is
/// reached. Committed flow state survives an early stop.
pub(crate) fn dispatch(
    cur: &mut Cursor,
    hdr: &PublicHeader,
    st: &mut FlowDecodeState,
    summary: &mut GquicSummary,
) -> Result<()> {
    while cur.left() > 0 {
        let ftype = cur.read_u8()?;

        if ftype & FRAME_TYPE_STREAM != 0 {
            st.frame_types |= FRAME_STREAM;
            match stream_frame(cur, ftype, st, summary)? {
                StreamOutcome::Continue => {}
                StreamOutcome::Stop => return Ok(()),
            }
        } else if ftype & FRAME_TYPE_ACK != 0 {
            st.frame_types |= FRAME_ACK;
            ack_frame(cur, ftype, hdr.version)?;
        } else if ftype <= FRAME_TYPE_PING {
            st.frame_types |= 1 << ftype;
            if ftype == FRAME_TYPE_PADDING {
                // the rest of the datagram is padding
                return Ok(());
            }
            control_frame(cur, ftype, hdr)?;
        } else {
            // unknown framing makes every later offset untrustworthy
            trace!(ftype, "unhandled GQUIC frame type");
            return Ok(());
        }
    }
    Ok(())
}

fn stream_frame(
    cur: &mut Cursor,
    ftype: u8,
    st: &mut FlowDecodeState,
    summary: &mut GquicSummary,
) -> Result<StreamOutcome> {
    let data_len = ((ftype & STREAM_DLEN) >> 5) << 1; // 0 or 2 bytes
    let mut off_len = (ftype & STREAM_OLEN) >> 2; // 0, 2, 3, ..., 8 bytes
    if off_len > 0 {
        off_len += 1;
    }
    let sid_len = (ftype & STREAM_SLEN) + 1; // 1, 2, 3, 4 bytes

    if data_len == 0 && ftype & STREAM_FIN == 0 {
        st.status |= STAT_MALFORMED;
    }

    // Stream ID
    let stream_id = match sid_len {
        1 => u32::from(cur.read_u8()?),
        2 => u32::from(cur.read_u16()?),
        3 => cur.read_u24()?,
        _ => cur.read_u32()?,
    };
    if stream_id == 0 {
        st.status |= STAT_MALFORMED;
    } else if stream_id == 1 {
        st.status |= STAT_HANDSHAKE;
    }

    // Offset
    cur.skip(usize::from(off_len))?;

    // Data Length
    cur.skip(usize::from(data_len))?;

    // Stream 1 is reserved for the handshake; any other stream carries
    // encrypted data, so nothing further in this packet is interpreted.
    if stream_id != 1 {
        return Ok(StreamOutcome::Stop);
    }

    match handshake::parse(cur, st, summary)? {
        handshake::Outcome::Parsed => Ok(StreamOutcome::Continue),
        handshake::Outcome::UnknownTag => Ok(StreamOutcome::Stop),
    }
}

/// Skips an ACK frame. No values are retained; the two version branches
/// differ only in field layout.
fn ack_frame(cur: &mut Cursor, ftype: u8, version: u8) -> Result<()> {
    let ll_len = usize::from((1u8 << ((ftype & ACK_LL_LEN) >> 2)).min(6)); // 1, 2, 4, 6 bytes
    let mm_len = usize::from((1u8 << (ftype & ACK_MP_LEN)).min(6)); // 1, 2, 4, 6 bytes

    if version < 34 {
        cur.skip(1)?; // received entropy
        cur.skip(ll_len)?; // largest observed
        cur.skip(2)?; // ack delay time
        let num_ts = cur.read_u8()?;
        if num_ts > 0 {
            cur.skip(1)?; // delta largest observed
            cur.skip(4)?; // first timestamp
            cur.skip(usize::from(num_ts - 1) * (1 + 2))?; // delta, time since previous
        }
        if ftype & ACK_N != 0 {
            let num_ranges = cur.read_u8()?;
            cur.skip(usize::from(num_ranges) * (mm_len + 1))?;
            let num_revived = cur.read_u8()?;
            cur.skip(usize::from(num_revived) * (ll_len + 1))?;
        }
    } else {
        cur.skip(ll_len)?; // largest acked
        cur.skip(2)?; // largest acked delta time
        if ftype & ACK_N != 0 {
            let num_blocks = cur.read_u8()?;
            cur.skip(mm_len)?; // first ack block length
            cur.skip(usize::from(num_blocks) * (1 + mm_len))?; // gap, block length
        }
        let num_ts = cur.read_u8()?;
        if num_ts > 0 {
            cur.skip(1)?; // delta largest acked
            cur.skip(4)?; // time since largest acked
            cur.skip(usize::from(num_ts - 1) * (1 + 2))?;
        }
    }
    Ok(())
}

/// Skips one fixed control frame (types 0x01-0x07); padding is handled by
/// the dispatch loop.
fn control_frame(cur: &mut Cursor, ftype: u8, hdr: &PublicHeader) -> Result<()> {
    match ftype {
        FRAME_TYPE_RST_STREAM => {
            cur.skip(4)?; // stream ID
            cur.skip(8)?; // byte offset
            cur.skip(4)?; // error code
        }
        FRAME_TYPE_CONN_CLOSE => {
            cur.skip(4)?; // error code
            let rlen = cur.read_u16()?;
            cur.skip(usize::from(rlen))?; // reason phrase
        }
        FRAME_TYPE_GOAWAY => {
            cur.skip(4)?; // error code
            cur.skip(4)?; // last good stream ID
            let rlen = cur.read_u16()?;
            cur.skip(usize::from(rlen))?; // reason phrase
        }
        FRAME_TYPE_WIN_UPDATE => {
            cur.skip(4)?; // stream ID
            cur.skip(8)?; // byte offset
        }
        FRAME_TYPE_BLOCKED => {
            cur.skip(4)?; // stream ID
        }
        FRAME_TYPE_STOP_WAIT => {
            if hdr.version < 34 {
                cur.skip(1)?; // sent entropy
            }
            cur.skip(usize::from(hdr.pktnum_len))?; // least unacked delta
        }
        _ => {} // PING carries no payload
    }
    Ok(())
}
