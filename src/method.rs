//! Method and parameters decoder, grounded on `bmfparse.c`'s `parse_class_method` and
//! `parse_class_method_parameters` — the parameter-ID reconciliation algorithm is the hardest
//! single piece of this decoder and has no teacher analogue; it follows the C source directly.

use crate::class::decode_class_data;
use crate::error::{BmfError, Result};
use crate::flavor::FlavorTable;
use crate::model::{Direction, Method, Qualifier, Variable};
use crate::qualifier::decode_qualifier;
use crate::reader::Reader;
use crate::strings::decode_utf16le;

const NO_PARAMETERS_SENTINEL: u32 = 0xFFFF_FFFF;

pub fn decode_method(
    buf: &[u8],
    record_offset: Option<u32>,
    mut flavor: Option<&mut FlavorTable>,
) -> Result<Method> {
    const FUNCTION: &str = "decode_method";
    let mut r = Reader::new(buf, record_offset);
    let _record_len = r.read_u32(FUNCTION)?;
    let type_word = r.read_u32(FUNCTION)?;
    if type_word != 0x0000 && type_word != 0x200D {
        return Err(BmfError::invalid_type(
            FUNCTION,
            r.abs_offset(),
            format!("unrecognized method type word {type_word:#06x}"),
        ));
    }
    let reserved = r.read_u32(FUNCTION)?;
    if reserved != 0 {
        return Err(BmfError::invalid_unknown(FUNCTION, r.abs_offset(), "method header[2] must be 0"));
    }
    let header3 = r.read_u32(FUNCTION)?;
    let header4 = r.read_u32(FUNCTION)?;

    let has_parameters = header3 != NO_PARAMETERS_SENTINEL;
    let (name_len, params_len) = if has_parameters {
        if header4 < header3 {
            return Err(BmfError::invalid_size(
                FUNCTION,
                r.abs_offset(),
                "method header[4] (name+parameters size) is smaller than header[3] (name length)",
            ));
        }
        (header3, header4 - header3)
    } else {
        (header4, 0)
    };

    let name_offset = r.abs_offset();
    let name_bytes = r.take(name_len, FUNCTION)?;
    let name = decode_utf16le(name_bytes, name_offset)?;

    let (parameters, parameters_direction, return_value) = if has_parameters {
        let params_offset = r.abs_offset();
        let params_bytes = r.take(params_len, FUNCTION)?;
        decode_parameters_blob(params_bytes, params_offset, flavor.as_deref_mut())?
    } else {
        (Vec::new(), Vec::new(), None)
    };

    let _qual_sublen = r.read_u32(FUNCTION)?;
    let qual_count = r.read_u32(FUNCTION)?;
    let mut qualifiers = Vec::with_capacity(qual_count as usize);
    for _ in 0..qual_count {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let qualifier_offset = child.abs_offset();
        qualifiers.push(decode_qualifier(child.bytes(), qualifier_offset, flavor.as_deref_mut())?);
    }

    r.finish(FUNCTION)?;

    Ok(Method {
        name,
        qualifiers,
        parameters,
        parameters_direction,
        return_value,
    })
}

/// Parses the four-word parameters-blob header and its `class_count` `__PARAMETERS` sub-classes,
/// then runs the ID-indexed reconciliation algorithm that merges `in`/`out` occurrences of the
/// same parameter ID and separates out the bare `ReturnValue` entry.
fn decode_parameters_blob(
    buf: &[u8],
    record_offset: Option<u32>,
    mut flavor: Option<&mut FlavorTable>,
) -> Result<(Vec<Variable>, Vec<Direction>, Option<Variable>)> {
    const FUNCTION: &str = "decode_parameters_blob";
    let mut r = Reader::new(buf, record_offset);
    let _total_len = r.read_u32(FUNCTION)?;
    let one = r.read_u32(FUNCTION)?;
    if one != 1 {
        return Err(BmfError::invalid_unknown(FUNCTION, r.abs_offset(), "parameters blob header[1] must be 1"));
    }
    let class_count = r.read_u32(FUNCTION)?;
    let payload_len = r.read_u32(FUNCTION)?;
    if payload_len != r.remaining() + 4 {
        return Err(BmfError::invalid_size(
            FUNCTION,
            r.abs_offset(),
            "parameters blob payload length does not match remaining bytes",
        ));
    }

    let mut all_vars = Vec::new();
    for _ in 0..class_count {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let class_offset = child.abs_offset();
        let data = decode_class_data(child.bytes(), class_offset, false, None, flavor.as_deref_mut())?;
        all_vars.extend(data.variables);
    }
    r.finish(FUNCTION)?;

    reconcile_parameters(FUNCTION, record_offset, all_vars)
}

struct Slot {
    variable: Variable,
    qualifiers: Vec<Qualifier>,
    direction: Option<Direction>,
}

fn reconcile_parameters(
    function: &'static str,
    offset: Option<u32>,
    all_vars: Vec<Variable>,
) -> Result<(Vec<Variable>, Vec<Direction>, Option<Variable>)> {
    let n = all_vars.len();
    let mut slots: Vec<Option<Slot>> = (0..n).map(|_| None).collect();
    let mut return_value: Option<Variable> = None;

    for var in all_vars {
        let id_count = var.qualifiers.iter().filter(|q| q.name == "ID").count();
        let is_return_value = var.name == "ReturnValue";

        match (id_count, is_return_value) {
            (1, false) => {
                let id_value = var
                    .qualifiers
                    .iter()
                    .find(|q| q.name == "ID")
                    .and_then(Qualifier::as_sint32)
                    .ok_or_else(|| BmfError::semantic_mismatch(function, offset, "ID qualifier is not Sint32"))?;
                if id_value < 0 || id_value as usize >= n {
                    return Err(BmfError::semantic_mismatch(
                        function,
                        offset,
                        format!("parameter ID {id_value} out of range [0, {n})"),
                    ));
                }
                let idx = id_value as usize;

                let mut in_seen = false;
                let mut out_seen = false;
                let mut other_qualifiers = Vec::new();
                let Variable {
                    name,
                    kind,
                    var_type,
                    array_max,
                    has_array_max,
                    qualifiers,
                } = var;
                for q in qualifiers {
                    match q.name.as_str() {
                        "ID" => {}
                        "in" => in_seen = true,
                        "out" => out_seen = true,
                        _ => other_qualifiers.push(q),
                    }
                }
                let bare_variable = Variable {
                    name,
                    kind,
                    var_type,
                    array_max,
                    has_array_max,
                    qualifiers: Vec::new(),
                };

                match &mut slots[idx] {
                    None => {
                        slots[idx] = Some(Slot {
                            variable: bare_variable,
                            qualifiers: other_qualifiers,
                            direction: merge_direction(None, in_seen, out_seen),
                        });
                    }
                    Some(slot) => {
                        if !slot.variable.structurally_eq(&bare_variable) {
                            return Err(BmfError::semantic_mismatch(
                                function,
                                offset,
                                format!("parameter ID {id_value} occurrences disagree structurally"),
                            ));
                        }
                        slot.direction = merge_direction(slot.direction, in_seen, out_seen);
                        for q in other_qualifiers {
                            if !slot.qualifiers.iter().any(|existing| existing.semantically_eq(&q)) {
                                slot.qualifiers.push(q);
                            }
                        }
                    }
                }
            }
            (0, true) => {
                if return_value.is_some() {
                    return Err(BmfError::semantic_mismatch(function, offset, "more than one ReturnValue"));
                }
                return_value = Some(var);
            }
            _ => {
                return Err(BmfError::semantic_mismatch(
                    function,
                    offset,
                    "parameter variable must have exactly one ID, or be named ReturnValue",
                ));
            }
        }
    }

    let params_count = slots.iter().position(Option::is_none).unwrap_or(n);
    if slots[params_count..].iter().any(Option::is_some) {
        return Err(BmfError::semantic_mismatch(function, offset, "some parameters are missing"));
    }

    let mut parameters = Vec::with_capacity(params_count);
    let mut directions = Vec::with_capacity(params_count);
    for slot in slots.into_iter().take(params_count) {
        let slot = slot.expect("dense prefix checked above");
        let direction = slot
            .direction
            .ok_or_else(|| BmfError::semantic_mismatch(function, offset, "parameter has neither in nor out"))?;
        let mut variable = slot.variable;
        variable.qualifiers = slot.qualifiers;
        parameters.push(variable);
        directions.push(direction);
    }

    Ok((parameters, directions, return_value))
}

fn merge_direction(current: Option<Direction>, in_seen: bool, out_seen: bool) -> Option<Direction> {
    let mut dir = current;
    if in_seen {
        dir = Some(match dir {
            None => Direction::In,
            Some(Direction::Out) => Direction::InOut,
            Some(d) => d,
        });
    }
    if out_seen {
        dir = Some(match dir {
            None => Direction::Out,
            Some(Direction::In) => Direction::InOut,
            Some(d) => d,
        });
    }
    dir
}
