//! Crate-wide error taxonomy.
use crate::calendar::CalendarDateTime;
use std::fmt;

/// Every documented failure mode of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `loadBytes`/`loadRegistry` reported no such zone, or the id is unknown.
    ZoneNotFound { id: String },
    /// Bytes, registry fields, or text do not satisfy the format's invariants.
    InvalidZone { detail: String },
    /// A collaborator reported a permission error.
    SecurityError { detail: String },
    /// `convert` was asked to convert a wall time that falls in a DST invalid
    /// window, with `no_throw_on_invalid_time` unset.
    InvalidTime { at: CalendarDateTime },
    /// `getAmbiguousOffsets` was called with a non-ambiguous time.
    NotAmbiguous { at: CalendarDateTime },
    /// The textual codec could not round-trip a value.
    SerializationError { detail: String },
    /// `convert` received a wall/absolute time whose tag disagrees with its
    /// source zone's designation.
    TagMismatch { detail: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZoneNotFound { id } => write!(f, "zone not found: {id}"),
            Error::InvalidZone { detail } => write!(f, "invalid zone data: {detail}"),
            Error::SecurityError { detail } => write!(f, "security error: {detail}"),
            Error::InvalidTime { at } => write!(f, "invalid local time: {at}"),
            Error::NotAmbiguous { at } => write!(f, "time is not ambiguous: {at}"),
            Error::SerializationError { detail } => write!(f, "serialization error: {detail}"),
            Error::TagMismatch { detail } => write!(f, "tag mismatch: {detail}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
