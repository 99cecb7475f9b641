//! Hand-built BMF wire fixtures shared by the integration tests. Each builder mirrors one TLV
//! shape from the wire format and documents its bytes inline rather than hiding them behind a
//! generic encoder, matching the style of a hand-authored test vector.

pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).chain([0, 0]).collect()
}

pub fn qualifier(type_tag: u32, name: &str, value: &[u8]) -> Vec<u8> {
    let name_bytes = utf16le(name);
    let mut buf = Vec::new();
    let total = 16 + name_bytes.len() as u32 + value.len() as u32;
    buf.extend(total.to_le_bytes()); // record length
    buf.extend(type_tag.to_le_bytes()); // qualifier type tag
    buf.extend(0u32.to_le_bytes()); // reserved
    buf.extend((name_bytes.len() as u32).to_le_bytes()); // name length
    buf.extend(&name_bytes);
    buf.extend(value);
    buf
}

pub fn variable(type_word: u32, name: &str, qualifiers: &[Vec<u8>]) -> Vec<u8> {
    let name_bytes = utf16le(name);
    let qual_bytes: Vec<u8> = qualifiers.iter().flatten().copied().collect();
    let mut body = Vec::new();
    body.extend(type_word.to_le_bytes());
    body.extend(0u32.to_le_bytes()); // reserved
    body.extend(0xFFFF_FFFFu32.to_le_bytes()); // slen: no inline default value
    body.extend((name_bytes.len() as u32).to_le_bytes());
    body.extend(&name_bytes);
    body.extend(0u32.to_le_bytes()); // qualifier sub-length (unused by the decoder)
    body.extend((qualifiers.len() as u32).to_le_bytes());
    body.extend(&qual_bytes);

    let mut buf = Vec::new();
    buf.extend((4 + body.len() as u32).to_le_bytes());
    buf.extend(body);
    buf
}

pub fn class_attr(type_tag: u32, name: &str, value: &[u8]) -> Vec<u8> {
    let name_bytes = utf16le(name);
    let mut buf = Vec::new();
    let total = 20 + name_bytes.len() as u32 + value.len() as u32;
    buf.extend(total.to_le_bytes());
    buf.extend(type_tag.to_le_bytes());
    buf.extend(0u32.to_le_bytes());
    buf.extend((name_bytes.len() as u32).to_le_bytes());
    buf.extend(0xFFFF_FFFFu32.to_le_bytes()); // pseudo-property sentinel
    buf.extend(&name_bytes);
    buf.extend(value);
    buf
}

/// Builds a class-data block. When `with_qualifiers` is set, the block begins with a two-word
/// header (qualifier-region length, which doubles as the class header's cross-check value, and
/// qualifier count) and the first qualifier starts at byte 8; otherwise the block begins directly
/// with the `(var_len, var_count)` header at byte 0, matching the `__PARAMETERS` sub-class layout.
pub fn class_data(with_qualifiers: bool, qualifiers: &[Vec<u8>], props: &[Vec<u8>]) -> Vec<u8> {
    let props_bytes: Vec<u8> = props.iter().flatten().copied().collect();
    let mut var_block = Vec::new();
    var_block.extend(0u32.to_le_bytes()); // variable-region length (unused by the decoder)
    var_block.extend((props.len() as u32).to_le_bytes());
    var_block.extend(props_bytes);

    if with_qualifiers {
        let qual_bytes: Vec<u8> = qualifiers.iter().flatten().copied().collect();
        let total = 8 + qual_bytes.len() as u32 + var_block.len() as u32;
        let mut buf = Vec::new();
        buf.extend(total.to_le_bytes()); // qualifier-region length (cross-check)
        buf.extend((qualifiers.len() as u32).to_le_bytes());
        buf.extend(qual_bytes);
        buf.extend(var_block);
        buf
    } else {
        var_block
    }
}

pub fn class_record(class_data: &[u8], methods: &[Vec<u8>], kind: u32) -> Vec<u8> {
    let methods_bytes: Vec<u8> = methods.iter().flatten().copied().collect();
    let mut body = Vec::new();
    body.extend(0u32.to_le_bytes()); // reserved header[1]
    body.extend((class_data.len() as u32).to_le_bytes()); // cross-check length
    body.extend((class_data.len() as u32).to_le_bytes()); // class-data payload length
    body.extend(kind.to_le_bytes());
    body.extend(class_data);
    body.extend(0u32.to_le_bytes());
    body.extend((methods.len() as u32).to_le_bytes());
    body.extend(methods_bytes);

    let mut buf = Vec::new();
    buf.extend((4 + body.len() as u32).to_le_bytes());
    buf.extend(body);
    buf
}

/// A `__PARAMETERS` sub-class variable: a basic-typed parameter carrying whichever of
/// `ID`/`in`/`out` the reconciliation algorithm needs, or a bare `ReturnValue`.
pub fn param_variable(name: &str, id: Option<i32>, in_: bool, out: bool) -> Vec<u8> {
    let mut qualifiers = vec![qualifier(0x08, "CIMTYPE", &utf16le("uint32"))];
    if let Some(id) = id {
        qualifiers.push(qualifier(0x03, "ID", &id.to_le_bytes()));
    }
    if in_ {
        qualifiers.push(qualifier(0x0B, "in", &[]));
    }
    if out {
        qualifiers.push(qualifier(0x0B, "out", &[]));
    }
    variable(0x0013, name, &qualifiers) // 0x13 = Uint32, scalar
}

pub fn params_blob(sub_classes: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = sub_classes.iter().flatten().copied().collect();
    let mut buf = Vec::new();
    buf.extend((16 + payload.len() as u32).to_le_bytes()); // total_len
    buf.extend(1u32.to_le_bytes());
    buf.extend((sub_classes.len() as u32).to_le_bytes());
    buf.extend((4 + payload.len() as u32).to_le_bytes()); // payload_len counts from its own word
    buf.extend(payload);
    buf
}

pub fn method(name: &str, params: Option<&[u8]>, qualifiers: &[Vec<u8>]) -> Vec<u8> {
    let name_bytes = utf16le(name);
    let qual_bytes: Vec<u8> = qualifiers.iter().flatten().copied().collect();
    let mut body = Vec::new();
    body.extend(0u32.to_le_bytes()); // type word: scalar void/object
    body.extend(0u32.to_le_bytes()); // reserved
    match params {
        Some(params) => {
            body.extend((name_bytes.len() as u32).to_le_bytes()); // header[3]: name length
            body.extend(((name_bytes.len() + params.len()) as u32).to_le_bytes()); // header[4]
            body.extend(&name_bytes);
            body.extend(params);
        }
        None => {
            body.extend(0xFFFF_FFFFu32.to_le_bytes()); // header[3]: no parameters
            body.extend((name_bytes.len() as u32).to_le_bytes()); // header[4]: name length
            body.extend(&name_bytes);
        }
    }
    body.extend(0u32.to_le_bytes()); // qualifier sub-length (unused)
    body.extend((qualifiers.len() as u32).to_le_bytes());
    body.extend(qual_bytes);

    let mut buf = Vec::new();
    buf.extend((4 + body.len() as u32).to_le_bytes());
    buf.extend(body);
    buf
}

pub fn bmf_file(classes: &[Vec<u8>]) -> Vec<u8> {
    let classes_bytes: Vec<u8> = classes.iter().flatten().copied().collect();
    let mut root = Vec::new();
    root.extend(1u32.to_le_bytes());
    root.extend(1u32.to_le_bytes());
    root.extend((classes.len() as u32).to_le_bytes());
    root.extend(classes_bytes);

    let mut file = Vec::new();
    file.extend(0x424D4F46u32.to_le_bytes()); // "BMOF" magic, read as little-endian u32
    file.extend((8 + root.len() as u32).to_le_bytes()); // inner_len
    file.extend(root);
    file
}
