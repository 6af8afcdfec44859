//! Errors surfaced across the netlist crates.
//!
//! The core analysis treats almost every failure mode as either an internal
//! invariant (abort via `assert!`) or a silent skip (see spec §7); this type
//! exists for the small handful of call sites that report a recoverable
//! failure back to a caller, such as removing an edge that does not exist.

/// Convenience wrapper, mirroring `calyx_utils::CalyxResult`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Clone, Debug)]
enum ErrorKind {
    /// `remove_edge`/`remove_node` was asked to remove something absent.
    NotFound(String),
    /// A driver-store handle no longer refers to a live slot.
    StaleHandle(String),
}

impl Error {
    pub fn not_found<S: ToString>(what: S) -> Self {
        Error {
            kind: ErrorKind::NotFound(what.to_string()),
        }
    }

    pub fn stale_handle<S: ToString>(what: S) -> Self {
        Error {
            kind: ErrorKind::StaleHandle(what.to_string()),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NotFound(what) => write!(f, "not found: {what}"),
            ErrorKind::StaleHandle(what) => write!(f, "stale handle: {what}"),
        }
    }
}

impl std::error::Error for Error {}
