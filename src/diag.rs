//! Small formatting helper shared by the warn-and-skip diagnostic paths that need a hex dump of
//! unparsed bytes.

pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
