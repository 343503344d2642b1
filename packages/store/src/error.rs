//! Error types for the document layer.
//!
//! Every error here is `Clone + PartialEq` so callers can keep the last one
//! around (e.g. in a notification slot) and tests can compare them directly.

use thiserror::Error;

use crate::models::LinkType;
use crate::repo::Resource;

/// A link payload could not be built from its stored parts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown link type `{0}`")]
    UnknownLinkType(String),

    #[error("invalid {link_type} payload: {message}")]
    InvalidPayload { link_type: LinkType, message: String },
}

/// A mutation was rejected before touching the document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("a link with id `{0}` already exists")]
    DuplicateId(String),

    #[error("index {index} is out of range for {len} links")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

/// A failure reported by a [`crate::PageStore`] backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("corrupt {resource} row: {message}")]
    Corrupt { resource: Resource, message: String },

    #[error("i/o error: {0}")]
    Io(String),

    #[error("invalid user id `{0}`")]
    InvalidUserId(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// A save stopped part way through the three resource writes.
///
/// `written` lists the resources that were durably stored before `failed`
/// was attempted; those writes are not rolled back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("saving {failed} failed after writing {written:?}: {source}")]
pub struct SaveError {
    pub failed: Resource,
    pub written: Vec<Resource>,
    pub source: StoreError,
}

impl SaveError {
    /// True when at least one resource was written before the failure.
    pub fn is_partial(&self) -> bool {
        !self.written.is_empty()
    }
}

/// The synchronizer operation that is already running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Load,
    Save,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Load => f.write_str("load"),
            Operation::Save => f.write_str("save"),
        }
    }
}

/// Errors from [`crate::Synchronizer`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("a {0} is already in progress")]
    Busy(Operation),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Save(#[from] SaveError),

    /// The session was reset while the load was in flight; its result was dropped.
    #[error("load superseded by a newer session")]
    Superseded,
}

/// A poll vote or form submission was rejected. The document is unchanged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    #[error("no link with id `{0}`")]
    LinkNotFound(String),

    #[error("link `{id}` is a {found}, not a {expected}")]
    WrongLinkType {
        id: String,
        expected: LinkType,
        found: LinkType,
    },

    #[error("poll has ended")]
    PollClosed,

    #[error("poll has no option `{0}`")]
    UnknownOption(String),

    #[error("poll does not allow multiple selections")]
    MultipleNotAllowed,

    #[error("no options selected")]
    NothingSelected,

    #[error("form has no field `{0}`")]
    UnknownField(String),

    #[error("`{0}` is required")]
    MissingRequired(String),

    #[error("`{value}` is not a valid choice for `{label}`")]
    InvalidChoice { label: String, value: String },

    #[error(transparent)]
    Edit(#[from] EditError),
}
