//! Qualifier TLV decoder, grounded on `bmfparse.c`'s `parse_qualifier`.

use crate::diag::hex_dump;
use crate::error::{BmfError, Result};
use crate::flavor::{apply_flavor_match, FlavorTable};
use crate::model::{FlavorFlags, Qualifier, QualifierValue};
use crate::reader::Reader;
use crate::strings::decode_utf16le;

const FUNCTION: &str = "decode_qualifier";

const TAG_BOOLEAN: u32 = 0x0B;
const TAG_SINT32: u32 = 0x03;
const TAG_STRING: u32 = 0x08;
const TAG_VALUEMAP: u32 = 0x2008;

/// Decodes one qualifier record. `record_offset` is the absolute byte offset of `buf[0]` in the
/// original file, used both for error locations and to look this qualifier up in the flavor
/// side-table.
pub fn decode_qualifier(
    buf: &[u8],
    record_offset: Option<u32>,
    mut flavor: Option<&mut FlavorTable>,
) -> Result<Qualifier> {
    let mut r = Reader::new(buf, record_offset);
    let _record_len = r.read_u32(FUNCTION)?;
    let type_tag = r.read_u32(FUNCTION)?;
    let _reserved = r.read_u32(FUNCTION)?;
    let name_len = r.read_u32(FUNCTION)?;
    let name_offset = r.abs_offset();
    let name_bytes = r.take(name_len, FUNCTION)?;
    let name = decode_utf16le(name_bytes, name_offset)?;

    let value_offset = r.abs_offset();
    let value_bytes = r.rest();

    let value = decode_value(type_tag, value_bytes, value_offset, &name)?;

    let mut qualifier = Qualifier {
        name,
        value,
        flavor: FlavorFlags::default(),
    };

    if let (Some(offset), Some(table)) = (record_offset, flavor.as_deref_mut()) {
        if let Some(m) = table.consume(offset) {
            apply_flavor_match(
                &mut qualifier.flavor,
                m,
                &qualifier.name,
                qualifier.value.kind_name(),
            )?;
        }
    }

    Ok(qualifier)
}

fn decode_value(
    type_tag: u32,
    value_bytes: &[u8],
    value_offset: Option<u32>,
    name: &str,
) -> Result<QualifierValue> {
    match type_tag {
        TAG_BOOLEAN => match value_bytes.len() {
            0 => Ok(QualifierValue::Boolean(true)),
            4 => {
                let v = u32::from_le_bytes(value_bytes.try_into().unwrap());
                if v != 0 && v != 0xFFFF {
                    return Err(BmfError::invalid_unknown(
                        FUNCTION,
                        value_offset,
                        format!("Boolean qualifier value {v:#x} is neither 0 nor 0xFFFF"),
                    ));
                }
                Ok(QualifierValue::Boolean(v == 0xFFFF))
            }
            other => Err(BmfError::invalid_size(
                FUNCTION,
                value_offset,
                format!("Boolean qualifier value region is {other} bytes, expected 0 or 4"),
            )),
        },
        TAG_SINT32 => {
            if value_bytes.len() != 4 {
                return Err(BmfError::invalid_size(
                    FUNCTION,
                    value_offset,
                    format!("Sint32 qualifier value region is {} bytes, expected 4", value_bytes.len()),
                ));
            }
            let v = i32::from_le_bytes(value_bytes.try_into().unwrap());
            Ok(QualifierValue::Sint32(v))
        }
        TAG_STRING => {
            let s = decode_utf16le(value_bytes, value_offset)?;
            Ok(QualifierValue::String(s))
        }
        TAG_VALUEMAP => {
            tracing::warn!(qualifier = name, "Values/ValueMap qualifier recognized but not decoded, skipping");
            Ok(QualifierValue::Unknown {
                type_tag,
                raw: value_bytes.to_vec(),
            })
        }
        other => {
            tracing::warn!(
                qualifier = name,
                tag = format!("{other:#x}"),
                value = hex_dump(value_bytes),
                "unrecognized qualifier type"
            );
            Ok(QualifierValue::Unknown {
                type_tag: other,
                raw: value_bytes.to_vec(),
            })
        }
    }
}
