//! Error types (spec §4.5 Facade, §7 Error Handling Design).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The ABI-facing domain error enumeration the public Facade returns.
/// Parse errors inside the VTE itself are never surfaced this way (§7):
/// malformed input is recovered from locally and logged at DEBUG.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// An argument was out of range (e.g. a resize to zero columns, a
    /// column/row index past the screen bounds).
    #[error("invalid argument")]
    InvalidArgument,

    /// Kept for ABI-surface parity with the original header; never
    /// constructed under Rust's global allocator, which aborts the
    /// process rather than returning an allocation failure on the paths
    /// this crate exercises (see SPEC_FULL §7).
    #[error("out of memory")]
    OutOfMemory,

    /// A lookup (e.g. a named palette, a resolved symbol) found nothing.
    #[error("not found")]
    NotFound,

    /// An operation that requires the absence of an existing resource
    /// found one already present (e.g. installing a custom palette twice
    /// without resetting first, where the API models that as an error).
    #[error("already exists")]
    AlreadyExists,

    /// `selection_copy` was called with no active selection.
    #[error("no selection")]
    NoSelection,
}
