//! Top-level container decode, grounded on `bmfparse.c`'s `parse_bmf`/`parse_root`.
//!
//! This is the only module that understands the outer file envelope: the `BMOF` magic, the
//! inner root payload, and the optional `BMOFQUALFLAVOR11` secondary flavor table. Everything
//! below it works in terms of a plain byte slice and an optional absolute-offset base.

use crate::class::decode_class;
use crate::error::{BmfError, Result};
use crate::flavor::FlavorTable;
use crate::model::{Class, ClassModel};
use crate::reader::{fits, Reader};

const BMOF_MAGIC: u32 = 0x424D_4F46;
const FLAVOR_MAGIC: &[u8; 16] = b"BMOFQUALFLAVOR11";

/// Decodes a complete BMF byte buffer into a [`ClassModel`].
pub fn parse(bytes: &[u8]) -> Result<ClassModel> {
    const FUNCTION: &str = "parse";
    let size = u32::try_from(bytes.len())
        .map_err(|_| BmfError::invalid_size(FUNCTION, None, "input larger than 4 GiB"))?;

    let mut header = Reader::new(bytes, None);
    let magic = header.read_u32(FUNCTION)?;
    if magic != BMOF_MAGIC {
        return Err(BmfError::invalid_magic(FUNCTION, Some(0), "missing BMOF magic header"));
    }
    let inner_len = header.read_u32(FUNCTION)?;
    if inner_len > size {
        return Err(BmfError::invalid_size(FUNCTION, Some(4), "inner_len exceeds total file size"));
    }

    let has_flavor_table = inner_len < size;
    let mut flavor_table = has_flavor_table
        .then(|| parse_flavor_table(bytes, inner_len, size))
        .transpose()?;

    let root_offset = inner_len
        .checked_sub(8)
        .ok_or_else(|| BmfError::invalid_size(FUNCTION, Some(4), "inner_len smaller than the file header"))?;
    let root_bytes = &bytes[8..8 + root_offset as usize];
    let root_base = has_flavor_table.then_some(8);
    let classes = decode_root(root_bytes, root_base, flavor_table.as_mut())?;

    if let Some(table) = &flavor_table {
        table.check_fully_consumed()?;
    }

    Ok(ClassModel { classes })
}

/// `release` exists for API parity with the two back-ends' expectations: freeing a [`ClassModel`]
/// is ordinary `Drop`, since every entity in the tree is owned outright with no sharing.
pub fn release(model: ClassModel) {
    drop(model);
}

fn parse_flavor_table(bytes: &[u8], inner_len: u32, size: u32) -> Result<FlavorTable> {
    const FUNCTION: &str = "parse_flavor_table";
    if !fits(20, inner_len, size) {
        return Err(BmfError::invalid_size(FUNCTION, Some(inner_len), "no room for a secondary header"));
    }
    let magic_start = inner_len as usize;
    let magic_bytes = &bytes[magic_start..magic_start + 16];
    if magic_bytes != FLAVOR_MAGIC {
        return Err(BmfError::invalid_magic(FUNCTION, Some(inner_len), "missing BMOFQUALFLAVOR11 magic"));
    }
    let count_bytes = &bytes[magic_start + 16..magic_start + 20];
    let count = u32::from_le_bytes(count_bytes.try_into().unwrap());

    let remaining = size - inner_len - 20;
    let expected = count
        .checked_mul(8)
        .ok_or_else(|| BmfError::invalid_size(FUNCTION, Some(inner_len), "flavor table entry count overflows"))?;
    if expected != remaining {
        return Err(BmfError::invalid_size(
            FUNCTION,
            Some(inner_len),
            "flavor table entry count disagrees with remaining file size",
        ));
    }

    let entries_start = magic_start + 20;
    let mut pairs = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let entry = &bytes[entries_start + i * 8..entries_start + i * 8 + 8];
        let offset = u32::from_le_bytes(entry[0..4].try_into().unwrap());
        let type_tag = u32::from_le_bytes(entry[4..8].try_into().unwrap());
        pairs.push((offset, type_tag));
    }
    FlavorTable::new(pairs)
}

/// `buf` is the root payload (header and class records), not including the outer file header.
fn decode_root(buf: &[u8], base: Option<u32>, mut flavor: Option<&mut FlavorTable>) -> Result<Vec<Class>> {
    const FUNCTION: &str = "decode_root";
    let mut r = Reader::new(buf, base);
    let one_a = r.read_u32(FUNCTION)?;
    let one_b = r.read_u32(FUNCTION)?;
    if one_a != 1 || one_b != 1 {
        return Err(BmfError::invalid_unknown(FUNCTION, r.abs_offset(), "root header[0..2] must both be 1"));
    }
    let count = r.read_u32(FUNCTION)?;

    let mut classes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let rec_len = r.peek_u32(FUNCTION)?;
        if rec_len == 0 {
            return Err(BmfError::invalid_size(FUNCTION, r.abs_offset(), "class record length is zero"));
        }
        let child = r.child(rec_len, FUNCTION)?;
        let class_offset = child.abs_offset();
        tracing::debug!(index = classes.len(), "decoding class record");
        classes.push(decode_class(child.bytes(), class_offset, flavor.as_deref_mut())?);
    }
    r.finish(FUNCTION)?;

    Ok(classes)
}
