use super::cursor::{Cursor, Result};
use super::state::{FlowDecodeState, GquicSummary, MAX_ATTR_LEN};
use tracing::trace;

// Handshake message tags
const TAG_CHLO: u32 = 0x4348_4c4f; // Client Hello (CHLO)
const TAG_SHLO: u32 = 0x5348_4c4f; // Server Hello (SHLO)
const TAG_REJ: u32 = 0x5245_4a00; // Rejection (REJ)
const TAG_PRST: u32 = 0x5052_5354; // Public Reset (PRST)

// Tag/value types of interest; all others are skipped over
const TAG_TYPE_SNI: u32 = 0x534e_4900; // Server Name Indication
const TAG_TYPE_UAID: u32 = 0x5541_4944; // Client's User Agent ID

pub(crate) enum Outcome {
    Parsed,
    UnknownTag,
}

/// Parses one handshake-stream message: the role tag, the tag/offset table,
/// and the SNI/UAID values located through it. On success the cursor is left
/// just past the last tagged value.
pub(crate) fn parse(
    cur: &mut Cursor,
    st: &mut FlowDecodeState,
    summary: &mut GquicSummary,
) -> Result<Outcome> {
    // Message Tag
    let tag = cur.read_u32()?;
    match tag {
        TAG_CHLO => summary.chlo += 1,
        TAG_SHLO => summary.shlo += 1,
        TAG_REJ => summary.rej += 1,
        TAG_PRST => summary.prst += 1,
        _ => {
            trace!(tag = format_args!("{tag:#010x}"), "unhandled GQUIC handshake tag");
            return Ok(Outcome::UnknownTag);
        }
    }

    // Tag Number
    let tag_count = cur.read_le_u16()?;

    // Padding
    cur.skip(2)?;

    // The table holds (type, cumulative end offset) pairs; the values are
    // packed back to back right after it, so entry i spans
    // [first_val_pos + end(i-1), first_val_pos + end(i)).
    let first_tag_pos = cur.tell();
    let first_val_pos = first_tag_pos + usize::from(tag_count) * 8;

    let mut last_end = 0usize;

    // Tag/Value
    for _ in 0..tag_count {
        let tag_type = cur.read_u32()?;
        let tag_end = cur.read_le_u32()? as usize;
        let tag_len = tag_end.saturating_sub(last_end);

        if tag_type == TAG_TYPE_SNI || tag_type == TAG_TYPE_UAID {
            let pos = cur.tell();
            cur.seek(first_val_pos + last_end)?;
            let value = cur.read_str(tag_len.min(MAX_ATTR_LEN))?;
            cur.seek(pos)?;

            let dest = if tag_type == TAG_TYPE_SNI {
                &mut st.sni
            } else {
                &mut st.uaid
            };
            // first successful decode wins
            if dest.is_empty() {
                *dest = value;
            }
        }

        last_end = tag_end;
    }

    cur.seek(first_val_pos + last_end)?;
    Ok(Outcome::Parsed)
}
