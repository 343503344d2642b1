//! # Synchronizer: the active document plus its load and save operations
//!
//! [`Synchronizer`] owns the session's [`Editor`] and a [`Repository`]. Edits
//! are synchronous closures run under a short-lived lock ([`Synchronizer::edit`]);
//! the lock is never held across an `.await`.
//!
//! ## In-flight guards
//!
//! `load` and `save` share one state word (idle, loading or saving), claimed
//! with a single compare-and-swap for the whole duration of the call. A second
//! call while either one is running is rejected with [`SyncError::Busy`]
//! naming the running operation. The state is exposed as
//! [`Synchronizer::is_loading`] and [`Synchronizer::is_saving`].
//!
//! ## Save and concurrent edits
//!
//! `save` snapshots the document together with its revision, writes the
//! snapshot, and on success clears the dirty flag only if the revision is
//! unchanged. Edits made while the save was pending stay dirty and are reported
//! as [`SaveOutcome::SavedWithPendingChanges`]. Any failure leaves the flag set.
//!
//! ## Superseded loads
//!
//! [`Synchronizer::reset`] (sign-out) bumps an epoch. A load that started in an
//! older epoch drops its result with [`SyncError::Superseded`] instead of
//! repopulating the document of a session that no longer exists.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::document::{Document, Editor};
use crate::error::{Operation, SyncError};
use crate::repo::{Loaded, PageStore, Repository};

/// Result of a successful [`Synchronizer::save`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing to write; the document was already clean.
    Clean,
    /// Written, and the document is clean.
    Saved,
    /// Written, but the document was edited meanwhile and is still dirty.
    SavedWithPendingChanges,
}

const IDLE: u8 = 0;
const LOADING: u8 = 1;
const SAVING: u8 = 2;

fn state_of(operation: Operation) -> u8 {
    match operation {
        Operation::Load => LOADING,
        Operation::Save => SAVING,
    }
}

/// Holds the in-flight state for as long as it lives.
struct InFlight<'a>(&'a AtomicU8);

impl<'a> InFlight<'a> {
    fn acquire(state: &'a AtomicU8, operation: Operation) -> Result<Self, SyncError> {
        state
            .compare_exchange(IDLE, state_of(operation), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(state))
            .map_err(|running| {
                SyncError::Busy(if running == LOADING {
                    Operation::Load
                } else {
                    Operation::Save
                })
            })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

/// The session's document and the repository it is persisted to.
pub struct Synchronizer<S: PageStore> {
    repo: Repository<S>,
    editor: Mutex<Editor>,
    in_flight: AtomicU8,
    epoch: AtomicU64,
}

impl<S: PageStore> Synchronizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            repo: Repository::new(store),
            editor: Mutex::new(Editor::new()),
            in_flight: AtomicU8::new(IDLE),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    fn editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation against the active document.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        f(&mut self.editor())
    }

    /// Read the active document.
    pub fn read<R>(&self, f: impl FnOnce(&Editor) -> R) -> R {
        f(&self.editor())
    }

    pub fn document(&self) -> Document {
        self.read(|editor| editor.document().clone())
    }

    pub fn is_dirty(&self) -> bool {
        self.read(Editor::is_dirty)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == LOADING
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) == SAVING
    }

    /// Replace the active document with the user's stored page.
    ///
    /// Rejected while a save is running, so a stale snapshot cannot overwrite
    /// what is being loaded.
    pub async fn load(&self, user_id: &str) -> Result<Loaded, SyncError> {
        let _guard = InFlight::acquire(&self.in_flight, Operation::Load)?;
        let epoch = self.epoch.load(Ordering::Acquire);

        debug!(user_id, "loading page");
        let loaded = self.repo.load(user_id).await.inspect_err(|e| {
            warn!(user_id, error = %e, "page load failed");
        })?;

        if self.epoch.load(Ordering::Acquire) != epoch {
            info!(user_id, "discarding load for an ended session");
            return Err(SyncError::Superseded);
        }
        self.editor().replace(loaded.document.clone());
        Ok(loaded)
    }

    /// Write the active document if it is dirty.
    pub async fn save(&self, user_id: &str) -> Result<SaveOutcome, SyncError> {
        let _guard = InFlight::acquire(&self.in_flight, Operation::Save)?;

        let (document, revision) = {
            let editor = self.editor();
            if !editor.is_dirty() {
                return Ok(SaveOutcome::Clean);
            }
            (editor.document().clone(), editor.revision())
        };

        debug!(user_id, revision, "saving page");
        if let Err(e) = self.repo.save(user_id, &document).await {
            warn!(
                user_id,
                failed = %e.failed,
                written = ?e.written,
                error = %e.source,
                "page save failed"
            );
            return Err(e.into());
        }

        if self.editor().mark_saved(revision) {
            info!(user_id, "page saved");
            Ok(SaveOutcome::Saved)
        } else {
            info!(user_id, "page saved, newer edits pending");
            Ok(SaveOutcome::SavedWithPendingChanges)
        }
    }

    /// Drop the active document and start a new epoch. Any load still running
    /// will discard its result.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.editor().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryStore;
    use crate::models::{LinkData, LinkItem, LinkPayload, ProfileUpdate};
    use crate::repo::{LinkRow, ProfileRow, Resource, ThemeRow};

    /// Yields to the executor before every call so `join!` can interleave.
    #[derive(Clone, Default)]
    struct YieldingStore(MemoryStore);

    impl PageStore for YieldingStore {
        async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
            tokio::task::yield_now().await;
            self.0.get_profile(user_id).await
        }

        async fn get_theme(&self, user_id: &str) -> Result<Option<ThemeRow>, StoreError> {
            tokio::task::yield_now().await;
            self.0.get_theme(user_id).await
        }

        async fn list_links(&self, user_id: &str) -> Result<Vec<LinkRow>, StoreError> {
            tokio::task::yield_now().await;
            self.0.list_links(user_id).await
        }

        async fn upsert_profile(&self, row: ProfileRow) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.0.upsert_profile(row).await
        }

        async fn upsert_theme(&self, row: ThemeRow) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.0.upsert_theme(row).await
        }

        async fn upsert_links(&self, user_id: &str, rows: Vec<LinkRow>) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.0.upsert_links(user_id, rows).await
        }

        async fn prune_links(&self, user_id: &str, keep: &[String]) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.0.prune_links(user_id, keep).await
        }
    }

    fn add_home(sync: &Synchronizer<impl PageStore>) {
        sync.edit(|e| {
            e.add_link(LinkItem::new(LinkData::Link(LinkPayload::new(
                "Home",
                "https://ada.example",
            ))))
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_save_clean_document_is_noop() {
        let store = MemoryStore::new();
        store.fail_on(Resource::Profile);
        let sync = Synchronizer::new(store);
        assert_eq!(sync.save("u1").await, Ok(SaveOutcome::Clean));
    }

    #[tokio::test]
    async fn test_save_clears_dirty_and_load_restores() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        add_home(&sync);
        sync.edit(|e| e.update_profile(ProfileUpdate::default().name("Ada")));
        assert!(sync.is_dirty());

        assert_eq!(sync.save("u1").await, Ok(SaveOutcome::Saved));
        assert!(!sync.is_dirty());

        let other = Synchronizer::new(store);
        other.load("u1").await.unwrap();
        assert_eq!(other.document(), sync.document());
        assert!(!other.is_dirty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_dirty() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        add_home(&sync);
        store.fail_on(Resource::Theme);

        let err = sync.save("u1").await.unwrap_err();
        match err {
            SyncError::Save(e) => {
                assert_eq!(e.failed, Resource::Theme);
                assert_eq!(e.written, vec![Resource::Profile]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sync.is_dirty());
        assert!(!sync.is_saving());

        // Retry writes all three again.
        store.clear_failures();
        assert_eq!(sync.save("u1").await, Ok(SaveOutcome::Saved));
    }

    #[tokio::test]
    async fn test_second_save_while_in_flight_is_rejected() {
        let sync = Synchronizer::new(YieldingStore::default());
        add_home(&sync);

        let (first, second) = tokio::join!(sync.save("u1"), async {
            tokio::task::yield_now().await;
            sync.save("u1").await
        });
        assert_eq!(first, Ok(SaveOutcome::Saved));
        assert_eq!(second, Err(SyncError::Busy(Operation::Save)));
        assert!(!sync.is_saving());
    }

    #[tokio::test]
    async fn test_load_rejected_while_saving() {
        let sync = Synchronizer::new(YieldingStore::default());
        add_home(&sync);

        let (saved, loaded) = tokio::join!(sync.save("u1"), async {
            tokio::task::yield_now().await;
            sync.load("u1").await
        });
        assert!(saved.is_ok());
        assert_eq!(loaded, Err(SyncError::Busy(Operation::Save)));
    }

    #[tokio::test]
    async fn test_edit_during_save_stays_dirty() {
        let sync = Synchronizer::new(YieldingStore::default());
        add_home(&sync);

        let (saved, ()) = tokio::join!(sync.save("u1"), async {
            tokio::task::yield_now().await;
            sync.edit(|e| e.update_profile(ProfileUpdate::default().bio("later")));
        });
        assert_eq!(saved, Ok(SaveOutcome::SavedWithPendingChanges));
        assert!(sync.is_dirty());

        assert_eq!(sync.save("u1").await, Ok(SaveOutcome::Saved));
        assert!(!sync.is_dirty());
    }

    #[tokio::test]
    async fn test_reset_supersedes_running_load() {
        let store = YieldingStore::default();
        let writer = Synchronizer::new(store.clone());
        add_home(&writer);
        writer.save("u1").await.unwrap();

        let sync = Synchronizer::new(store);
        let (loaded, ()) = tokio::join!(sync.load("u1"), async {
            tokio::task::yield_now().await;
            sync.reset();
        });
        assert_eq!(loaded, Err(SyncError::Superseded));
        assert!(sync.document().links.is_empty());
        assert!(!sync.is_loading());
    }

    #[tokio::test]
    async fn test_links_failure_fails_load_and_keeps_document() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        add_home(&sync);
        store.fail_on(Resource::Links);

        let err = sync.load("u1").await.unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
        assert_eq!(sync.document().links.len(), 1);
        assert!(sync.is_dirty());
    }

    #[test]
    fn test_in_flight_state_admits_one_operation_across_threads() {
        let state = AtomicU8::new(IDLE);
        let barrier = std::sync::Barrier::new(8);
        let claimed = std::sync::atomic::AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for i in 0..8 {
                let (state, barrier, claimed) = (&state, &barrier, &claimed);
                scope.spawn(move || {
                    let operation = if i % 2 == 0 { Operation::Load } else { Operation::Save };
                    let guard = InFlight::acquire(state, operation);
                    if guard.is_ok() {
                        claimed.fetch_add(1, Ordering::SeqCst);
                    }
                    // Every thread tries before any guard is released.
                    barrier.wait();
                    drop(guard);
                });
            }
        });
        assert_eq!(claimed.load(Ordering::SeqCst), 1);
        assert_eq!(state.load(Ordering::SeqCst), IDLE);

        let _load = InFlight::acquire(&state, Operation::Load).unwrap();
        assert!(matches!(
            InFlight::acquire(&state, Operation::Save),
            Err(SyncError::Busy(Operation::Load))
        ));
    }
}
