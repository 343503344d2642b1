//! # The editable page document and its mutation API
//!
//! [`Document`] is the whole state of one user's page. [`Editor`] owns a
//! document and is the only way to change it: every mutation goes through a
//! method here, which keeps the dirty flag and the revision counter in step.
//!
//! ## Dirty tracking
//!
//! - Any mutation sets `dirty` and bumps `revision`, even when the target id is
//!   absent (`remove_link`/`update_link` on an unknown id are no-ops on the list).
//! - Rejected mutations ([`EditError`]) leave the document, the flag and the
//!   revision untouched. A link whose payload fails [`crate::LinkData::validate`] is
//!   rejected, so nothing that could not be loaded back is ever saved.
//! - Only the synchronizer clears the flag: after a full load (`replace`) or a
//!   successful save of the current revision (`mark_saved`).

use tracing::debug;

use crate::error::EditError;
use crate::models::{LinkItem, LinkUpdate, Profile, ProfileUpdate, Theme, ThemeUpdate};

/// Profile, theme and ordered links of one page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub profile: Profile,
    pub theme: Theme,
    /// Display order; persisted as each item's position.
    pub links: Vec<LinkItem>,
}

impl Document {
    pub fn link(&self, id: &str) -> Option<&LinkItem> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.links.iter().position(|l| l.id == id)
    }
}

/// Owner of the active [`Document`].
#[derive(Clone, Debug, Default)]
pub struct Editor {
    document: Document,
    dirty: bool,
    revision: u64,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted document (clean).
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            dirty: false,
            revision: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn profile(&self) -> &Profile {
        &self.document.profile
    }

    pub fn theme(&self) -> &Theme {
        &self.document.theme
    }

    pub fn links(&self) -> &[LinkItem] {
        &self.document.links
    }

    pub fn link(&self, id: &str) -> Option<&LinkItem> {
        self.document.link(id)
    }

    /// True when the document may differ from what was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Monotonic counter bumped by every state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    /// Append a link to the end of the list.
    pub fn add_link(&mut self, item: LinkItem) -> Result<(), EditError> {
        if self.document.link(&item.id).is_some() {
            return Err(EditError::DuplicateId(item.id));
        }
        item.data.validate()?;
        debug!(id = %item.id, kind = %item.link_type(), "add link");
        self.document.links.push(item);
        self.touch();
        Ok(())
    }

    /// Remove the link with `id`, returning it if it was present.
    pub fn remove_link(&mut self, id: &str) -> Option<LinkItem> {
        let removed = self
            .document
            .position(id)
            .map(|index| self.document.links.remove(index));
        self.touch();
        removed
    }

    /// Merge `update` into the link with `id`. Returns false if there is no
    /// such link.
    pub fn update_link(&mut self, id: &str, update: LinkUpdate) -> Result<bool, EditError> {
        if let Some(data) = &update.data {
            data.validate()?;
        }
        let found = match self.document.links.iter_mut().find(|l| l.id == id) {
            Some(item) => {
                if let Some(data) = update.data {
                    item.data = data;
                }
                true
            }
            None => false,
        };
        self.touch();
        Ok(found)
    }

    /// Move the link at `old_index` to `new_index`, shifting the ones between.
    pub fn reorder_links(&mut self, old_index: usize, new_index: usize) -> Result<(), EditError> {
        let len = self.document.links.len();
        for index in [old_index, new_index] {
            if index >= len {
                return Err(EditError::IndexOutOfRange { index, len });
            }
        }
        let item = self.document.links.remove(old_index);
        self.document.links.insert(new_index, item);
        self.touch();
        Ok(())
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) {
        self.document.profile.apply(update);
        self.touch();
    }

    pub fn update_theme(&mut self, update: ThemeUpdate) {
        self.document.theme.apply(update);
        self.touch();
    }

    /// Swap in a freshly loaded document; the result is clean.
    pub(crate) fn replace(&mut self, document: Document) {
        self.document = document;
        self.dirty = false;
        self.revision += 1;
    }

    /// Back to the empty default page, clean.
    pub(crate) fn reset(&mut self) {
        self.replace(Document::default());
    }

    /// Clear the dirty flag if nothing changed since `revision` was snapshotted.
    pub(crate) fn mark_saved(&mut self, revision: u64) -> bool {
        if self.revision == revision {
            self.dirty = false;
            true
        } else {
            false
        }
    }
}
