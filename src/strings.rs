//! UTF-16LE byte-range decoder.
//!
//! Terminates at the first NUL code unit; combines surrogate pairs; a lone surrogate is encoded
//! as the three-byte UTF-8 form of its 16-bit value rather than rejected, matching observed
//! producer output (see `examples/original_source/bmfparse.c`'s `parse_string`).

use crate::error::{BmfError, Result};

const FUNCTION: &str = "decode_utf16le";

pub fn decode_utf16le(bytes: &[u8], offset: Option<u32>) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(BmfError::invalid_size(
            FUNCTION,
            offset,
            format!("odd-length UTF-16LE region ({} bytes)", bytes.len()),
        ));
    }

    let mut units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let mut out = String::new();
    loop {
        let Some(unit) = units.next() else { break };
        if unit == 0 {
            break;
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            // high surrogate: look ahead for a matching low surrogate without consuming it
            // from the outer loop state if it isn't one.
            let mut lookahead = units.clone();
            match lookahead.next() {
                Some(low) if (0xDC00..=0xDFFF).contains(&low) => {
                    units = lookahead;
                    let c = 0x10000
                        + ((unit as u32 - 0xD800) << 10)
                        + (low as u32 - 0xDC00);
                    if let Some(c) = char::from_u32(c) {
                        out.push(c);
                    }
                }
                _ => push_lossy_surrogate(&mut out, unit),
            }
        } else if (0xDC00..=0xDFFF).contains(&unit) {
            push_lossy_surrogate(&mut out, unit);
        } else if let Some(c) = char::from_u32(unit as u32) {
            out.push(c);
        }
    }
    Ok(out)
}

/// The C source encodes a lone surrogate as the raw three-byte UTF-8 shape of its 16-bit value,
/// which is well-formed as bytes but not as a Unicode scalar value (surrogates are excluded from
/// valid UTF-8 by definition). A `String` can't hold that without `unsafe`, so this decoder
/// substitutes `U+FFFD` instead — still non-fatal, still lossy, and distinguishable from an
/// actual decode failure.
fn push_lossy_surrogate(out: &mut String, _unit: u16) {
    out.push(char::REPLACEMENT_CHARACTER);
}
