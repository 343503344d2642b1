//! # API crate: the session layer of a link page editor
//!
//! Sits between a presentation layer and the `store` crate: it authenticates
//! the user, loads and saves their page through a [`store::Synchronizer`], and
//! turns every failure into an [`AppError`] with an [`ErrorKind`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | `AuthProvider` boundary, sessions and push events, credential rules, in-memory provider |
//! | [`controller`] | `SessionController`: the session state machine, last-error slot, save/vote/form/import entry points |
//! | [`import`] | Shopify and WooCommerce product import |
//! | [`settings`] | Layered configuration and the file-backed store it opens |
//! | [`activity_log`] | User-facing notifications |
//! | [`models`] | `UserInfo` |

pub mod activity_log;
pub mod auth;
pub mod controller;
pub mod error;
pub mod import;
pub mod models;
pub mod settings;

pub use activity_log::{ActivityLog, LogEntry, LogLevel};
pub use auth::{AuthEvent, AuthProvider, AuthSession, AuthSubscription, MemoryAuth};
pub use controller::{SessionController, SessionState, SignUpOutcome};
pub use error::{AppError, AuthError, ErrorKind};
pub use import::ProductImporter;
pub use models::UserInfo;
pub use settings::{open_store, Settings};
