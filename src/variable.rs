//! Variable/property TLV decoder and class-pseudo-property decoder, grounded on `bmfparse.c`'s
//! `parse_class_variable` and `parse_class_property`.

use crate::diag::hex_dump;
use crate::error::{BmfError, Result};
use crate::flavor::FlavorTable;
use crate::model::{BasicType, Variable, VariableKind, VariableType};
use crate::qualifier::decode_qualifier;
use crate::reader::Reader;
use crate::strings::decode_utf16le;

const PSEUDO_PROPERTY_SENTINEL: u32 = 0xFFFF_FFFF;
const ARRAY_MARKER: u32 = 0x20;

/// What a property-list slot turned out to be: a real field, or one of the class-level
/// pseudo-properties absorbed into the class itself.
pub(crate) enum PropertyRecord {
    Variable(Variable),
    Attr(ClassAttr),
}

pub(crate) enum ClassAttr {
    Class(String),
    Namespace(String),
    Superclass(String),
    ClassFlags(i32),
    Unknown,
}

/// Peeks `header[4]` to decide whether `buf` is a real variable or a pseudo-property, then
/// dispatches. `buf` is the entire record, length prefix included.
pub(crate) fn decode_property(
    buf: &[u8],
    record_offset: Option<u32>,
    flavor: Option<&mut FlavorTable>,
) -> Result<PropertyRecord> {
    const FUNCTION: &str = "decode_property";
    let r = Reader::new(buf, record_offset);
    let discriminator = r.peek_u32_at(16, FUNCTION)?;
    if discriminator == PSEUDO_PROPERTY_SENTINEL {
        decode_class_attr(buf, record_offset).map(PropertyRecord::Attr)
    } else {
        decode_variable(buf, record_offset, flavor).map(PropertyRecord::Variable)
    }
}

pub fn decode_variable(
    buf: &[u8],
    record_offset: Option<u32>,
    mut flavor: Option<&mut FlavorTable>,
) -> Result<Variable> {
    const FUNCTION: &str = "decode_variable";
    let mut r = Reader::new(buf, record_offset);
    let _record_len = r.read_u32(FUNCTION)?;
    let type_word = r.read_u32(FUNCTION)?;
    let reserved = r.read_u32(FUNCTION)?;
    if reserved != 0 {
        return Err(BmfError::invalid_unknown(
            FUNCTION,
            r.abs_offset(),
            "variable header[2] must be 0",
        ));
    }
    let slen = r.read_u32(FUNCTION)?;
    let total_len = r.read_u32(FUNCTION)?;

    let is_array = (type_word >> 8) & 0xFF == ARRAY_MARKER;
    let type_code = (type_word & 0xFF) as u8;

    let (name_len, default_len) = if slen == PSEUDO_PROPERTY_SENTINEL {
        (total_len, 0u32)
    } else {
        if slen > total_len {
            return Err(BmfError::invalid_size(
                FUNCTION,
                r.abs_offset(),
                "inline default value name length exceeds blob length",
            ));
        }
        (slen, total_len - slen)
    };

    let name_offset = r.abs_offset();
    let name_bytes = r.take(name_len, FUNCTION)?;
    let name = decode_utf16le(name_bytes, name_offset)?;

    if default_len > 0 {
        let default_bytes = r.take(default_len, FUNCTION)?;
        tracing::warn!(
            variable = name.as_str(),
            value = hex_dump(default_bytes),
            "inline default value recognized but not supported"
        );
    }

    let _qual_sublen = r.read_u32(FUNCTION)?;
    let qual_count = r.read_u32(FUNCTION)?;

    let is_object = type_code == 0x0D;
    let basic = BasicType::from_type_code(type_code);
    let kind = match (is_array, is_object, basic.is_some()) {
        (false, true, _) => VariableKind::Object,
        (true, true, _) => VariableKind::ObjectArray,
        (false, false, true) => VariableKind::Basic,
        (true, false, true) => VariableKind::BasicArray,
        (false, false, false) => VariableKind::Unknown,
        (true, false, false) => VariableKind::Unknown,
    };

    let mut qualifiers = Vec::new();
    let mut cimtype: Option<String> = None;
    let mut array_max = 0i32;
    let mut has_array_max = false;

    for _ in 0..qual_count {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let qualifier_offset = child.abs_offset();
        let qualifier = decode_qualifier(child.bytes(), qualifier_offset, flavor.as_deref_mut())?;

        if qualifier.name == "CIMTYPE" {
            if let Some(s) = qualifier.as_str() {
                cimtype = Some(s.to_string());
                continue;
            }
        }
        if is_array && qualifier.name == "MAX" {
            if let Some(v) = qualifier.as_sint32() {
                array_max = v;
                has_array_max = true;
                continue;
            }
        }
        qualifiers.push(qualifier);
    }

    r.finish(FUNCTION)?;

    let var_type = finalize_type(FUNCTION, kind, basic, cimtype, r.abs_offset())?;

    Ok(Variable {
        name,
        qualifiers,
        kind,
        var_type,
        array_max,
        has_array_max,
    })
}

fn finalize_type(
    function: &'static str,
    kind: VariableKind,
    tag_basic: Option<BasicType>,
    cimtype: Option<String>,
    offset: Option<u32>,
) -> Result<VariableType> {
    match kind {
        VariableKind::Basic | VariableKind::BasicArray => {
            let basic = tag_basic.expect("Basic/BasicArray kind implies a recognized type code");
            if let Some(s) = cimtype {
                let cim_basic = BasicType::from_cimtype_name(&s).ok_or_else(|| {
                    BmfError::invalid_type(function, offset, format!("unknown CIMTYPE basic type {s:?}"))
                })?;
                if cim_basic != basic {
                    return Err(BmfError::semantic_mismatch(
                        function,
                        offset,
                        format!("CIMTYPE {s:?} disagrees with type-tag-derived basic type"),
                    ));
                }
            }
            Ok(VariableType::Basic(basic))
        }
        VariableKind::Object | VariableKind::ObjectArray => {
            let s = cimtype.ok_or_else(|| {
                BmfError::semantic_mismatch(function, offset, "object variable is missing its CIMTYPE qualifier")
            })?;
            let class_name = s.strip_prefix("object:").ok_or_else(|| {
                BmfError::semantic_mismatch(function, offset, format!("CIMTYPE {s:?} missing object: prefix"))
            })?;
            Ok(VariableType::Object(class_name.to_string()))
        }
        VariableKind::Unknown => Ok(VariableType::Unknown),
    }
}

fn decode_class_attr(buf: &[u8], record_offset: Option<u32>) -> Result<ClassAttr> {
    const FUNCTION: &str = "decode_class_attr";
    let mut r = Reader::new(buf, record_offset);
    let _record_len = r.read_u32(FUNCTION)?;
    let type_tag = r.read_u32(FUNCTION)?;
    let reserved = r.read_u32(FUNCTION)?;
    if reserved != 0 {
        return Err(BmfError::invalid_unknown(
            FUNCTION,
            r.abs_offset(),
            "pseudo-property header[2] must be 0",
        ));
    }
    let name_len = r.read_u32(FUNCTION)?;
    let sentinel = r.read_u32(FUNCTION)?;
    if sentinel != PSEUDO_PROPERTY_SENTINEL {
        return Err(BmfError::invalid_unknown(
            FUNCTION,
            r.abs_offset(),
            "pseudo-property header[4] must be 0xFFFFFFFF",
        ));
    }

    let name_offset = r.abs_offset();
    let name_bytes = r.take(name_len, FUNCTION)?;
    let name = decode_utf16le(name_bytes, name_offset)?;

    let value_offset = r.abs_offset();
    let value_bytes = r.rest();

    let attr = match type_tag {
        0x08 => {
            let value = decode_utf16le(value_bytes, value_offset)?;
            match name.as_str() {
                "__CLASS" => ClassAttr::Class(value),
                "__NAMESPACE" => ClassAttr::Namespace(value),
                "__SUPERCLASS" => ClassAttr::Superclass(value),
                other => {
                    tracing::warn!(name = other, "unrecognized string pseudo-property, discarding");
                    ClassAttr::Unknown
                }
            }
        }
        0x03 => {
            if value_bytes.len() != 4 {
                return Err(BmfError::invalid_size(
                    FUNCTION,
                    value_offset,
                    format!("Sint32 pseudo-property value region is {} bytes, expected 4", value_bytes.len()),
                ));
            }
            let value = i32::from_le_bytes(value_bytes.try_into().unwrap());
            match name.as_str() {
                "__CLASSFLAGS" => ClassAttr::ClassFlags(value),
                other => {
                    tracing::warn!(name = other, "unrecognized int pseudo-property, discarding");
                    ClassAttr::Unknown
                }
            }
        }
        other => {
            tracing::warn!(tag = format!("{other:#x}"), "unrecognized pseudo-property type tag");
            ClassAttr::Unknown
        }
    };

    Ok(attr)
}
