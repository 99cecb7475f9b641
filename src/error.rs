//! Structured error type for the BMF decoder.
//!
//! Every fatal failure carries a [`ErrorKind`], the name of the function that raised it, and a
//! byte offset when one is meaningful. Recognized-but-unsupported conditions never produce a
//! `BmfError` at all — they are diagnostic events logged via `tracing` and handled by continuing
//! the parse.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSize,
    InvalidMagic,
    InvalidUnknown,
    InvalidType,
    SemanticMismatch,
    LeftoverFlavor,
}

#[derive(Debug, Error)]
#[error("{kind:?} in {function}{}: {message}", offset.map(|o| format!(" at offset {o}")).unwrap_or_default())]
pub struct BmfError {
    pub kind: ErrorKind,
    pub function: &'static str,
    pub offset: Option<u32>,
    pub message: String,
}

impl BmfError {
    pub fn new(
        kind: ErrorKind,
        function: &'static str,
        offset: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            function,
            offset,
            message: message.into(),
        }
    }

    pub fn invalid_size(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSize, function, offset, message)
    }

    pub fn invalid_magic(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMagic, function, offset, message)
    }

    pub fn invalid_unknown(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidUnknown, function, offset, message)
    }

    pub fn invalid_type(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidType, function, offset, message)
    }

    pub fn semantic_mismatch(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SemanticMismatch, function, offset, message)
    }

    pub fn leftover_flavor(function: &'static str, offset: Option<u32>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LeftoverFlavor, function, offset, message)
    }
}

pub type Result<T> = std::result::Result<T, BmfError>;
