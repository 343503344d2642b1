pub mod document;
pub mod error;
pub mod interactions;
pub mod models;
pub mod repo;
pub mod sync;

mod file_store;
mod memory;
pub use file_store::FileStore;
pub use memory::MemoryStore;

pub use document::{Document, Editor};
pub use error::{
    EditError, InteractionError, ModelError, Operation, SaveError, StoreError, SyncError,
};
pub use interactions::{FieldValue, FormDraft, FormSubmission};
pub use models::{
    ButtonStyle, LinkData, LinkItem, LinkType, LinkUpdate, Product, Profile, ProfileUpdate,
    Theme, ThemeUpdate,
};
pub use repo::{Loaded, PageStore, Repository, Resource};
pub use sync::{SaveOutcome, Synchronizer};
