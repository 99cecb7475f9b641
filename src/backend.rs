//! Text back-ends that consume a built [`crate::model::ClassModel`] and write plain text.
//!
//! Neither back-end does any parsing or validation of its own; they only traverse a
//! fully-built tree and format it. The parser has already decided whether the input was valid.

pub mod dump;
pub mod mof;
