//! # Filesystem-backed page store
//!
//! [`FileStore`] is a [`PageStore`] implementation that keeps each user's page
//! as three JSON files. It is used on desktop and mobile platforms, where there
//! is no hosted database, to retain the page across app restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! └── <user_id>/
//!     ├── profile.json    # ProfileRow
//!     ├── theme.json      # ThemeRow
//!     └── links.json      # [LinkRow], any order
//! ```
//!
//! Each file is written to a sibling `.tmp` file first and then renamed over the
//! target, so a crash mid-write leaves either the old or the new row set.
//!
//! A user id must be a single plain path component; anything else (`..`,
//! separators, an empty id) is refused with [`StoreError::InvalidUserId`].

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::repo::{LinkRow, PageStore, ProfileRow, Resource, ThemeRow};

/// Filesystem-backed PageStore for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        let mut components = Path::new(user_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == user_id => Ok(self.base.join(name)),
            _ => Err(StoreError::InvalidUserId(user_id.to_string())),
        }
    }

    fn path(&self, user_id: &str, resource: Resource) -> Result<PathBuf, StoreError> {
        Ok(self.user_dir(user_id)?.join(format!("{resource}.json")))
    }

    fn read<T: DeserializeOwned>(&self, user_id: &str, resource: Resource) -> Result<Option<T>, StoreError> {
        let raw = match std::fs::read(self.path(user_id, resource)?) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                resource,
                message: e.to_string(),
            })
    }

    fn write<T: Serialize>(&self, user_id: &str, resource: Resource, value: &T) -> Result<(), StoreError> {
        let path = self.path(user_id, resource)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
            resource,
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }

    fn links(&self, user_id: &str) -> Result<Vec<LinkRow>, StoreError> {
        Ok(self.read(user_id, Resource::Links)?.unwrap_or_default())
    }
}

impl PageStore for FileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
        self.read(user_id, Resource::Profile)
    }

    async fn get_theme(&self, user_id: &str) -> Result<Option<ThemeRow>, StoreError> {
        self.read(user_id, Resource::Theme)
    }

    async fn list_links(&self, user_id: &str) -> Result<Vec<LinkRow>, StoreError> {
        let mut rows = self.links(user_id)?;
        rows.sort_by_key(|row| row.position);
        Ok(rows)
    }

    async fn upsert_profile(&self, row: ProfileRow) -> Result<(), StoreError> {
        let user_id = row.user_id.clone();
        self.write(&user_id, Resource::Profile, &row)
    }

    async fn upsert_theme(&self, row: ThemeRow) -> Result<(), StoreError> {
        let user_id = row.user_id.clone();
        self.write(&user_id, Resource::Theme, &row)
    }

    async fn upsert_links(&self, user_id: &str, rows: Vec<LinkRow>) -> Result<(), StoreError> {
        let mut stored = self.links(user_id)?;
        for mut row in rows {
            row.user_id = user_id.to_string();
            match stored.iter_mut().find(|existing| existing.id == row.id) {
                Some(existing) => *existing = row,
                None => stored.push(row),
            }
        }
        self.write(user_id, Resource::Links, &stored)
    }

    async fn prune_links(&self, user_id: &str, keep: &[String]) -> Result<(), StoreError> {
        let mut stored = self.links(user_id)?;
        let before = stored.len();
        stored.retain(|row| keep.contains(&row.id));
        if stored.len() == before {
            return Ok(());
        }
        self.write(user_id, Resource::Links, &stored)
    }
}
