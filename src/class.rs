//! Class-data decoder and class-record decoder, grounded on `bmfparse.c`'s `parse_class_data`
//! and `parse_class`.

use crate::error::{BmfError, Result};
use crate::flavor::FlavorTable;
use crate::method::decode_method;
use crate::model::Class;
use crate::model::{Qualifier, Variable};
use crate::qualifier::decode_qualifier;
use crate::reader::Reader;
use crate::variable::{decode_property, ClassAttr, PropertyRecord};

/// The parsed contents of a class-data block: qualifiers, properties, and whichever of the
/// `__CLASS`/`__NAMESPACE`/`__SUPERCLASS`/`__CLASSFLAGS` pseudo-properties were present. Used
/// both for a real class's own data and for each `__PARAMETERS` sub-class of a method.
pub(crate) struct ClassData {
    pub qualifiers: Vec<Qualifier>,
    pub variables: Vec<Variable>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub superclassname: Option<String>,
    pub classflags: i32,
}

/// `buf` is the whole class-data record. When `with_qualifiers` is set it begins with a two-word
/// header (qualifier-region length, qualifier count) and the first qualifier starts at byte 8;
/// when it is clear, `buf` begins directly at byte 0 with the `(var_len, var_count)` header — no
/// leading word is read or skipped first. When `expected_len` is given (the class header's inner
/// cross-check word), the qualifier-region length must agree with it or the record is rejected.
pub(crate) fn decode_class_data(
    buf: &[u8],
    record_offset: Option<u32>,
    with_qualifiers: bool,
    expected_len: Option<u32>,
    mut flavor: Option<&mut FlavorTable>,
) -> Result<ClassData> {
    const FUNCTION: &str = "decode_class_data";
    let mut r = Reader::new(buf, record_offset);

    let mut qualifiers = Vec::new();
    if with_qualifiers {
        let qual_region_len = r.read_u32(FUNCTION)?;
        if let Some(expected) = expected_len {
            if qual_region_len != expected {
                return Err(BmfError::invalid_unknown(
                    FUNCTION,
                    r.abs_offset(),
                    "class-data qualifier-region length disagrees with the class header's cross-check length",
                ));
            }
        }
        let qual_count = r.read_u32(FUNCTION)?;
        for _ in 0..qual_count {
            let rec_len = r.peek_u32(FUNCTION)?;
            let child = r.child(rec_len, FUNCTION)?;
            let qualifier_offset = child.abs_offset();
            qualifiers.push(decode_qualifier(child.bytes(), qualifier_offset, flavor.as_deref_mut())?);
        }
    }

    let _var_sublen = r.read_u32(FUNCTION)?;
    let var_count = r.read_u32(FUNCTION)?;

    let mut variables = Vec::new();
    let mut name = None;
    let mut namespace = None;
    let mut superclassname = None;
    let mut classflags = 0i32;

    for _ in 0..var_count {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let property_offset = child.abs_offset();
        let record = decode_property(child.bytes(), property_offset, flavor.as_deref_mut())?;
        apply_property(record, &mut variables, &mut name, &mut namespace, &mut superclassname, &mut classflags);
    }

    // Class-level pseudo-properties that follow the counted property list rather than being
    // part of it, running to the end of the class-data record.
    while r.remaining() > 0 {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let property_offset = child.abs_offset();
        let record = decode_property(child.bytes(), property_offset, flavor.as_deref_mut())?;
        apply_property(record, &mut variables, &mut name, &mut namespace, &mut superclassname, &mut classflags);
    }

    Ok(ClassData {
        qualifiers,
        variables,
        name,
        namespace,
        superclassname,
        classflags,
    })
}

fn apply_property(
    record: PropertyRecord,
    variables: &mut Vec<Variable>,
    name: &mut Option<String>,
    namespace: &mut Option<String>,
    superclassname: &mut Option<String>,
    classflags: &mut i32,
) {
    match record {
        PropertyRecord::Variable(v) => variables.push(v),
        PropertyRecord::Attr(ClassAttr::Class(s)) => *name = Some(s),
        PropertyRecord::Attr(ClassAttr::Namespace(s)) => *namespace = Some(s),
        PropertyRecord::Attr(ClassAttr::Superclass(s)) => *superclassname = Some(s),
        PropertyRecord::Attr(ClassAttr::ClassFlags(v)) => *classflags = v,
        PropertyRecord::Attr(ClassAttr::Unknown) => {}
    }
}

/// `buf` is the whole class record, its own leading length word included.
pub fn decode_class(buf: &[u8], record_offset: Option<u32>, mut flavor: Option<&mut FlavorTable>) -> Result<Class> {
    const FUNCTION: &str = "decode_class";
    let mut r = Reader::new(buf, record_offset);
    let _record_len = r.read_u32(FUNCTION)?;
    let reserved = r.read_u32(FUNCTION)?;
    if reserved != 0 {
        return Err(BmfError::invalid_unknown(FUNCTION, r.abs_offset(), "class header[1] must be 0"));
    }
    let cross_check_len = r.read_u32(FUNCTION)?;
    let classdata_len = r.read_u32(FUNCTION)?;
    let kind = r.read_u32(FUNCTION)?;

    if kind != 0 {
        if kind == 1 {
            tracing::warn!("instance definitions are not supported, skipping");
        } else {
            tracing::warn!(kind, "unrecognized class record kind, skipping");
        }
        r.rest();
        return Ok(Class::default());
    }

    let classdata_offset = r.abs_offset();
    let classdata_bytes = r.take(classdata_len, FUNCTION)?;
    let data = decode_class_data(classdata_bytes, classdata_offset, true, Some(cross_check_len), flavor.as_deref_mut())?;

    let _methods_sublen = r.read_u32(FUNCTION)?;
    let methods_count = r.read_u32(FUNCTION)?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        let rec_len = r.peek_u32(FUNCTION)?;
        let child = r.child(rec_len, FUNCTION)?;
        let method_offset = child.abs_offset();
        methods.push(decode_method(child.bytes(), method_offset, flavor.as_deref_mut())?);
    }

    r.finish(FUNCTION)?;

    Ok(Class {
        name: data.name,
        namespace: data.namespace,
        superclassname: data.superclassname,
        classflags: data.classflags,
        qualifiers: data.qualifiers,
        variables: data.variables,
        methods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BasicType, VariableKind, VariableType};

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).chain([0, 0]).collect()
    }

    fn build_class_attr(type_tag: u32, name: &str, value: &[u8]) -> Vec<u8> {
        let name_bytes = utf16le(name);
        let mut buf = Vec::new();
        let total = 20 + name_bytes.len() as u32 + value.len() as u32;
        buf.extend(total.to_le_bytes());
        buf.extend(type_tag.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend((name_bytes.len() as u32).to_le_bytes());
        buf.extend(0xFFFF_FFFFu32.to_le_bytes());
        buf.extend(&name_bytes);
        buf.extend(value);
        buf
    }

    fn build_variable_record(type_word: u32, name: &str) -> Vec<u8> {
        let name_bytes = utf16le(name);
        let mut body = Vec::new();
        body.extend(type_word.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.extend(0xFFFF_FFFFu32.to_le_bytes());
        body.extend((name_bytes.len() as u32).to_le_bytes());
        body.extend(&name_bytes);
        body.extend(0u32.to_le_bytes());
        body.extend(0u32.to_le_bytes()); // zero qualifiers
        let mut buf = Vec::new();
        let total = 4 + body.len() as u32;
        buf.extend(total.to_le_bytes());
        buf.extend(body);
        buf
    }

    fn build_class_data(with_qualifiers: bool, props: &[Vec<u8>]) -> Vec<u8> {
        let props_bytes: Vec<u8> = props.iter().flatten().copied().collect();
        let mut var_block = Vec::new();
        var_block.extend(0u32.to_le_bytes()); // variable-region length (unused by the decoder)
        var_block.extend((props.len() as u32).to_le_bytes());
        var_block.extend(props_bytes);

        if with_qualifiers {
            let total = 8 + var_block.len() as u32;
            let mut buf = Vec::new();
            buf.extend(total.to_le_bytes()); // qualifier-region length (cross-check)
            buf.extend(0u32.to_le_bytes()); // qualifier count
            buf.extend(var_block);
            buf
        } else {
            var_block
        }
    }

    fn build_class(class_data: &[u8], methods: &[Vec<u8>], kind: u32) -> Vec<u8> {
        let methods_bytes: Vec<u8> = methods.iter().flatten().copied().collect();
        let mut body = Vec::new();
        body.extend(0u32.to_le_bytes()); // reserved header[1]
        body.extend((class_data.len() as u32).to_le_bytes()); // cross-check == class_data's own length word
        body.extend((class_data.len() as u32).to_le_bytes()); // classdata_len
        body.extend(kind.to_le_bytes());
        body.extend(class_data);
        body.extend(0u32.to_le_bytes());
        body.extend((methods.len() as u32).to_le_bytes());
        body.extend(methods_bytes);

        let mut buf = Vec::new();
        let total = 4 + body.len() as u32;
        buf.extend(total.to_le_bytes());
        buf.extend(body);
        buf
    }

    #[test]
    fn absorbs_class_attrs_and_one_variable() {
        let class_attr = build_class_attr(0x08, "__CLASS", &utf16le("Foo"));
        let variable = build_variable_record(0x0003, "x");
        let data = build_class_data(true, &[class_attr, variable]);
        let result = decode_class_data(&data, None, true, None, None).unwrap();
        assert_eq!(result.name.as_deref(), Some("Foo"));
        assert_eq!(result.variables.len(), 1);
        assert_eq!(result.variables[0].var_type, VariableType::Basic(BasicType::Sint32));
    }

    #[test]
    fn full_class_roundtrips_through_decode_class() {
        let class_attr = build_class_attr(0x08, "__CLASS", &utf16le("Foo"));
        let variable = build_variable_record(0x0003, "x");
        let class_data = build_class_data(true, &[class_attr, variable]);
        let class_buf = build_class(&class_data, &[], 0);
        let class = decode_class(&class_buf, None, None).unwrap();
        assert_eq!(class.name.as_deref(), Some("Foo"));
        assert_eq!(class.variables.len(), 1);
        assert_eq!(class.variables[0].kind, VariableKind::Basic);
        assert!(class.methods.is_empty());
    }

    #[test]
    fn instance_kind_returns_empty_class() {
        let class_data = build_class_data(true, &[]);
        let class_buf = build_class(&class_data, &[], 1);
        let class = decode_class(&class_buf, None, None).unwrap();
        assert_eq!(class, Class::default());
    }

    #[test]
    fn class_data_header_is_exactly_two_words_with_qualifiers() {
        // Hand-built to the reference layout (bmfparse.c:687-705) rather than through
        // build_class_data: word0 = qualifier-region length, word1 = qualifier count, first
        // qualifier at byte 8. A class-data decoder that expects a three-word header (as if
        // the block carried its own leading record-length word before the qualifier region)
        // would misread word1 as a sub-length and word2 as the count, and fail this.
        let key_qualifier = {
            let name = utf16le("Key");
            let mut q = Vec::new();
            q.extend((16u32 + name.len() as u32).to_le_bytes()); // qualifier record length
            q.extend(0x0Bu32.to_le_bytes()); // type tag: boolean
            q.extend(0u32.to_le_bytes()); // reserved
            q.extend((name.len() as u32).to_le_bytes());
            q.extend(&name);
            q
        };

        let mut var_block = Vec::new();
        var_block.extend(0u32.to_le_bytes()); // variable-region length, unused
        var_block.extend(0u32.to_le_bytes()); // zero properties

        let mut buf = Vec::new();
        let qual_region_len = 8 + key_qualifier.len() as u32 + var_block.len() as u32;
        buf.extend(qual_region_len.to_le_bytes());
        buf.extend(1u32.to_le_bytes()); // qualifier count
        buf.extend(&key_qualifier);
        buf.extend(&var_block);

        let result = decode_class_data(&buf, None, true, Some(qual_region_len), None).unwrap();
        assert_eq!(result.qualifiers.len(), 1);
        assert_eq!(result.qualifiers[0].name, "Key");
        assert!(result.variables.is_empty());
    }

    #[test]
    fn cross_check_mismatch_is_fatal() {
        let class_data = build_class_data(true, &[]);
        let mut class_buf = build_class(&class_data, &[], 0);
        // corrupt the cross-check word (header[2], bytes 8..12) so it no longer matches
        // class_data's own leading length word.
        class_buf[8] ^= 0xFF;
        let err = decode_class(&class_buf, None, None).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidUnknown);
    }
}
