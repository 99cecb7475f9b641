//! The secondary "qualifier flavor" side-table and its offset-consume reconciliation against
//! qualifiers decoded from the primary stream.
//!
//! The C source matches a qualifier to a flavor-table entry by absolute byte offset and zeros
//! the entry's offset field in place once consumed. Any bijection that preserves encounter order
//! and the exactly-once-consumption invariant would do; this is the simplest one, a linear scan
//! over a small `Vec` with entries zeroed on consumption.

use crate::error::{BmfError, Result};
use crate::model::FlavorFlags;

#[derive(Debug, Clone, Copy)]
struct FlavorEntry {
    offset: u32,
    type_tag: u32,
}

/// A secondary-table entry, after it's been matched to the qualifier it annotates.
#[derive(Debug, Clone, Copy)]
pub struct FlavorMatch {
    pub type_tag: u32,
}

pub struct FlavorTable {
    entries: Vec<FlavorEntry>,
}

impl FlavorTable {
    pub fn new(pairs: Vec<(u32, u32)>) -> Result<Self> {
        for (offset, _) in &pairs {
            if *offset == 0 {
                return Err(BmfError::invalid_size(
                    "FlavorTable::new",
                    None,
                    "flavor-table entry has a zero offset at parse start",
                ));
            }
        }
        Ok(Self {
            entries: pairs
                .into_iter()
                .map(|(offset, type_tag)| FlavorEntry { offset, type_tag })
                .collect(),
        })
    }

    /// Looks up and consumes (zeros) the entry at `abs_offset`, if any. A qualifier with no
    /// matching entry is not itself an error — not every qualifier is annotated.
    pub fn consume(&mut self, abs_offset: u32) -> Option<FlavorMatch> {
        for entry in self.entries.iter_mut() {
            if entry.offset == abs_offset {
                entry.offset = 0;
                return Some(FlavorMatch {
                    type_tag: entry.type_tag,
                });
            }
        }
        None
    }

    /// Every entry must have been consumed by the time the primary parse finishes.
    pub fn check_fully_consumed(&self) -> Result<()> {
        if self.entries.iter().any(|e| e.offset != 0) {
            return Err(BmfError::leftover_flavor(
                "FlavorTable::check_fully_consumed",
                None,
                "a flavor-table entry was never consumed",
            ));
        }
        Ok(())
    }
}

/// Applies a flavor-table match to a qualifier's flags, per the expected type/name sanity rules
/// the flavor tags carry. Returns an error on a semantic mismatch between the expected and
/// actual tag/name.
pub fn apply_flavor_match(
    flags: &mut FlavorFlags,
    m: FlavorMatch,
    qualifier_name: &str,
    qualifier_kind: &'static str,
) -> Result<()> {
    const FUNCTION: &str = "apply_flavor_match";
    match m.type_tag {
        0x01 => {
            if qualifier_kind != "Boolean" || !qualifier_name.eq_ignore_ascii_case("Dynamic") {
                return Err(BmfError::semantic_mismatch(
                    FUNCTION,
                    None,
                    "flavor tag 0x01 expects a Boolean qualifier named Dynamic",
                ));
            }
        }
        0x02 => {
            flags.tosubclass = true;
        }
        0x03 => {
            if qualifier_kind != "String" || qualifier_name != "CIMTYPE" {
                return Err(BmfError::semantic_mismatch(
                    FUNCTION,
                    None,
                    "flavor tag 0x03 expects a String qualifier named CIMTYPE",
                ));
            }
        }
        0x11 => {
            if qualifier_kind != "Sint32" || qualifier_name != "ID" {
                return Err(BmfError::semantic_mismatch(
                    FUNCTION,
                    None,
                    "flavor tag 0x11 expects a Sint32 qualifier named ID",
                ));
            }
        }
        other => {
            tracing::warn!(tag = other, qualifier = qualifier_name, "unrecognized flavor tag, ignoring");
        }
    }
    Ok(())
}
