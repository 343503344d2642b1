//! Errors surfaced by the session layer.
//!
//! [`AppError`] wraps every lower-level error and sorts it into one of four
//! [`ErrorKind`]s. The kind decides how a caller reacts: validation errors are
//! returned and nothing else happens, the other three are recorded in the
//! controller's last-error slot and shown as a notification.

use store::{EditError, InteractionError, SyncError};
use thiserror::Error;

/// Failures reported by an [`crate::AuthProvider`] or the credential checks.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Distinct from a bad password: the caller should offer to resend the
    /// confirmation email.
    #[error("please check your email to confirm your account before signing in")]
    EmailNotConfirmed,

    #[error("an account with this email already exists")]
    AlreadyRegistered,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("not signed in")]
    NoSession,

    #[error("auth provider error: {0}")]
    Provider(String),
}

/// The four classes of error a caller has to handle differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; rejected before any state changed.
    Validation,
    /// Credential rejection, unconfirmed account, lost session.
    Auth,
    /// Persistence failure; the document stays usable and dirty.
    Store,
    /// A save wrote some resources and then failed.
    PartialWrite,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AppError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The page was never loaded for this session, so saving it would
    /// overwrite the stored page with defaults.
    #[error("page has not been loaded; reload before saving")]
    NotLoaded,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Edit(_) | AppError::Interaction(_) => {
                ErrorKind::Validation
            }
            AppError::Auth(AuthError::InvalidEmail | AuthError::WeakPassword { .. }) => {
                ErrorKind::Validation
            }
            AppError::Auth(_) => ErrorKind::Auth,
            AppError::Sync(SyncError::Busy(_)) => ErrorKind::Validation,
            AppError::Sync(SyncError::Save(e)) if e.is_partial() => ErrorKind::PartialWrite,
            AppError::Sync(_) | AppError::NotLoaded => ErrorKind::Store,
        }
    }
}
