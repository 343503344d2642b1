//! # Repository: mapping a [`Document`] onto three stored resources
//!
//! A page is persisted as three independent resources keyed by user id:
//!
//! | Resource | Rows per user | Row type |
//! |----------|---------------|----------|
//! | `profiles` | one | [`ProfileRow`] |
//! | `themes` | one | [`ThemeRow`] |
//! | `links` | many, ordered by `position` | [`LinkRow`] |
//!
//! All reads and writes go through the [`PageStore`] trait, so the same logic
//! works against the in-memory store used in tests ([`crate::MemoryStore`]), the
//! JSON files used on desktop ([`crate::FileStore`]), or a hosted database.
//!
//! ## Read path
//!
//! [`Repository::load`] fetches the three resources independently. Profile and
//! theme are soft: a missing row (first-time user) or a failed fetch falls back
//! to the defaults and is reported in [`Loaded::defaulted`]. Links are hard: a
//! failed fetch or an undecodable row fails the whole load.
//!
//! ## Write path
//!
//! [`Repository::save`] upserts profile, theme and links in that order. The
//! three writes are not a transaction: if the theme write fails, the profile
//! write already happened. The returned [`SaveError`] names the failed resource
//! and the ones already written so the caller can decide how to retry. The
//! links step stamps each row with its current index as `position` and then
//! prunes stored rows that are no longer in the document.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::Document;
use crate::error::{ModelError, SaveError, StoreError};
use crate::models::{ButtonStyle, LinkData, LinkItem, LinkType, Profile, Theme};

/// One of the three persisted resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Profile,
    Theme,
    Links,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Profile => f.write_str("profile"),
            Resource::Theme => f.write_str("theme"),
            Resource::Links => f.write_str("links"),
        }
    }
}

/// Row of the `profiles` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

/// Row of the `themes` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeRow {
    pub user_id: String,
    pub background_color: String,
    pub button_color: String,
    pub text_color: String,
    pub font_family: String,
    pub button_style: String,
}

/// Row of the `links` resource. `data` is the payload as an opaque JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub data: serde_json::Value,
    pub position: u32,
}

impl ProfileRow {
    pub fn from_profile(user_id: &str, profile: &Profile) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: Some(profile.name.clone()),
            bio: Some(profile.bio.clone()),
            avatar: profile.avatar.clone(),
        }
    }

    pub fn into_profile(self) -> Profile {
        Profile {
            name: self.name.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            avatar: self.avatar.filter(|a| !a.is_empty()),
        }
    }
}

impl ThemeRow {
    pub fn from_theme(user_id: &str, theme: &Theme) -> Self {
        Self {
            user_id: user_id.to_string(),
            background_color: theme.background_color.clone(),
            button_color: theme.button_color.clone(),
            text_color: theme.text_color.clone(),
            font_family: theme.font_family.clone(),
            button_style: theme.button_style.as_str().to_string(),
        }
    }

    pub fn into_theme(self) -> Result<Theme, StoreError> {
        let button_style = self
            .button_style
            .parse::<ButtonStyle>()
            .map_err(|message| StoreError::Corrupt {
                resource: Resource::Theme,
                message,
            })?;
        Ok(Theme {
            background_color: self.background_color,
            button_color: self.button_color,
            text_color: self.text_color,
            font_family: self.font_family,
            button_style,
        })
    }
}

impl LinkRow {
    /// Encode an item for storage. A payload that would not decode again is
    /// refused here rather than written.
    pub fn from_item(user_id: &str, position: u32, item: &LinkItem) -> Result<Self, StoreError> {
        let corrupt = |e: ModelError| StoreError::Corrupt {
            resource: Resource::Links,
            message: format!("{}: {e}", item.id),
        };
        item.data.validate().map_err(corrupt)?;
        let data = item.data.to_value().map_err(corrupt)?;
        Ok(Self {
            id: item.id.clone(),
            user_id: user_id.to_string(),
            link_type: item.link_type().as_str().to_string(),
            data,
            position,
        })
    }

    pub fn into_item(self) -> Result<LinkItem, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            resource: Resource::Links,
            message,
        };
        let link_type = self
            .link_type
            .parse::<LinkType>()
            .map_err(|e| corrupt(format!("{}: {e}", self.id)))?;
        let data = LinkData::from_parts(link_type, self.data)
            .map_err(|e| corrupt(format!("{}: {e}", self.id)))?;
        Ok(LinkItem { id: self.id, data })
    }
}

/// Async interface to the three-resource backing store.
///
/// Upserts replace the whole row keyed by user id (profile, theme) or by link
/// id (links).
pub trait PageStore {
    fn get_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ProfileRow>, StoreError>>;
    fn get_theme(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ThemeRow>, StoreError>>;
    /// All link rows of a user, sorted by `position`.
    fn list_links(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<LinkRow>, StoreError>>;
    fn upsert_profile(
        &self,
        row: ProfileRow,
    ) -> impl Future<Output = Result<(), StoreError>>;
    fn upsert_theme(
        &self,
        row: ThemeRow,
    ) -> impl Future<Output = Result<(), StoreError>>;
    fn upsert_links(
        &self,
        user_id: &str,
        rows: Vec<LinkRow>,
    ) -> impl Future<Output = Result<(), StoreError>>;
    /// Delete every link row of `user_id` whose id is not in `keep`.
    fn prune_links(
        &self,
        user_id: &str,
        keep: &[String],
    ) -> impl Future<Output = Result<(), StoreError>>;
}

fn failed_at(failed: Resource, written: &[Resource]) -> impl FnOnce(StoreError) -> SaveError {
    let written = written.to_vec();
    move |source| SaveError {
        failed,
        written,
        source,
    }
}

/// Result of [`Repository::load`].
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded {
    pub document: Document,
    /// Resources that were replaced by defaults (absent or unreadable).
    pub defaulted: Vec<Resource>,
}

/// A page repository backed by a [`PageStore`].
pub struct Repository<S: PageStore> {
    store: S,
}

impl<S: PageStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a user's page.
    pub async fn load(&self, user_id: &str) -> Result<Loaded, StoreError> {
        let mut defaulted = Vec::new();

        let profile = match self.store.get_profile(user_id).await {
            Ok(Some(row)) => row.into_profile(),
            Ok(None) => {
                defaulted.push(Resource::Profile);
                Profile::default()
            }
            Err(e) => {
                warn!(user_id, error = %e, "profile fetch failed, using defaults");
                defaulted.push(Resource::Profile);
                Profile::default()
            }
        };

        let theme = self
            .store
            .get_theme(user_id)
            .await
            .and_then(|row| row.map(ThemeRow::into_theme).transpose());
        let theme = match theme {
            Ok(Some(theme)) => theme,
            Ok(None) => {
                defaulted.push(Resource::Theme);
                Theme::default()
            }
            Err(e) => {
                warn!(user_id, error = %e, "theme fetch failed, using defaults");
                defaulted.push(Resource::Theme);
                Theme::default()
            }
        };

        let mut rows = self.store.list_links(user_id).await?;
        rows.sort_by_key(|row| row.position);
        let links = rows
            .into_iter()
            .map(LinkRow::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(user_id, links = links.len(), ?defaulted, "page loaded");
        Ok(Loaded {
            document: Document {
                profile,
                theme,
                links,
            },
            defaulted,
        })
    }

    /// Write a user's page: profile, then theme, then links.
    pub async fn save(&self, user_id: &str, document: &Document) -> Result<(), SaveError> {
        let mut written = Vec::new();

        self.store
            .upsert_profile(ProfileRow::from_profile(user_id, &document.profile))
            .await
            .map_err(failed_at(Resource::Profile, &written))?;
        written.push(Resource::Profile);

        self.store
            .upsert_theme(ThemeRow::from_theme(user_id, &document.theme))
            .await
            .map_err(failed_at(Resource::Theme, &written))?;
        written.push(Resource::Theme);

        let rows = document
            .links
            .iter()
            .enumerate()
            .map(|(index, item)| LinkRow::from_item(user_id, index as u32, item))
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed_at(Resource::Links, &written))?;
        let keep: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        self.store
            .upsert_links(user_id, rows)
            .await
            .map_err(failed_at(Resource::Links, &written))?;
        self.store
            .prune_links(user_id, &keep)
            .await
            .map_err(failed_at(Resource::Links, &written))?;

        debug!(user_id, links = keep.len(), "page saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::{
        FieldType, FolderEntry, FolderPayload, FormField, FormPayload, ImagePayload, LinkPayload,
        MediaPayload, Platform, PollPayload, Product, ProfileUpdate, ThemeUpdate,
    };
    use crate::Editor;
    use chrono::{TimeZone, Utc};

    fn sample_document() -> Document {
        let mut editor = Editor::new();
        editor.update_profile(ProfileUpdate::default().name("Ada").bio("Engines"));
        editor.update_theme(ThemeUpdate::default().button_style(ButtonStyle::Square));
        editor
            .add_link(LinkItem::new(LinkData::Link(LinkPayload::new(
                "Blog",
                "https://ada.example",
            ))))
            .unwrap();
        editor
            .add_link(LinkItem::new(LinkData::Poll(PollPayload::new(
                "Tabs or spaces?",
                ["Tabs", "Spaces"],
            ))))
            .unwrap();
        editor
            .add_link(LinkItem::new(LinkData::Form(FormPayload {
                title: "Contact".to_string(),
                description: None,
                form_fields: vec![FormField::new("Email", FieldType::Email).required()],
            })))
            .unwrap();
        editor.document().clone()
    }

    #[tokio::test]
    async fn test_load_new_user_gets_defaults() {
        let repo = Repository::new(MemoryStore::new());
        let loaded = repo.load("u1").await.unwrap();
        assert_eq!(loaded.document, Document::default());
        assert_eq!(loaded.defaulted, vec![Resource::Profile, Resource::Theme]);
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let repo = Repository::new(MemoryStore::new());
        let document = sample_document();

        repo.save("u1", &document).await.unwrap();
        let loaded = repo.load("u1").await.unwrap();

        assert_eq!(loaded.document, document);
        assert!(loaded.defaulted.is_empty());
    }

    #[tokio::test]
    async fn test_save_stamps_positions_and_prunes_removed() {
        let store = MemoryStore::new();
        let repo = Repository::new(store.clone());
        let mut document = sample_document();
        repo.save("u1", &document).await.unwrap();

        let removed = document.links.remove(0);
        document.links.reverse();
        repo.save("u1", &document).await.unwrap();

        let rows = store.list_links("u1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.id != removed.id));
        assert_eq!(rows[0].id, document.links[0].id);
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[1].position, 1);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let repo = Repository::new(MemoryStore::new());
        repo.save("u1", &sample_document()).await.unwrap();

        let other = repo.load("u2").await.unwrap();
        assert!(other.document.links.is_empty());
    }

    #[tokio::test]
    async fn test_theme_failure_is_partial_write() {
        let store = MemoryStore::new();
        store.fail_on(Resource::Theme);
        let repo = Repository::new(store.clone());
        let document = sample_document();

        let err = repo.save("u1", &document).await.unwrap_err();
        assert_eq!(err.failed, Resource::Theme);
        assert_eq!(err.written, vec![Resource::Profile]);
        assert!(err.is_partial());

        // The profile write is durable, nothing else is.
        store.clear_failures();
        let loaded = repo.load("u1").await.unwrap();
        assert_eq!(loaded.document.profile, document.profile);
        assert_eq!(loaded.document.theme, Theme::default());
        assert!(loaded.document.links.is_empty());
    }

    #[tokio::test]
    async fn test_soft_profile_failure_falls_back() {
        let store = MemoryStore::new();
        let repo = Repository::new(store.clone());
        repo.save("u1", &sample_document()).await.unwrap();

        store.fail_on(Resource::Profile);
        let loaded = repo.load("u1").await.unwrap();
        assert_eq!(loaded.document.profile, Profile::default());
        assert_eq!(loaded.defaulted, vec![Resource::Profile]);
        assert_eq!(loaded.document.links.len(), 3);
    }

    #[tokio::test]
    async fn test_links_failure_fails_load() {
        let store = MemoryStore::new();
        store.fail_on(Resource::Links);
        let repo = Repository::new(store);
        assert!(matches!(
            repo.load("u1").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_link_row_fails_load() {
        let store = MemoryStore::new();
        store
            .upsert_links(
                "u1",
                vec![LinkRow {
                    id: "bad".to_string(),
                    user_id: "u1".to_string(),
                    link_type: "poll".to_string(),
                    data: serde_json::json!({"title": "no question"}),
                    position: 0,
                }],
            )
            .await
            .unwrap();
        let repo = Repository::new(store);
        let err = repo.load("u1").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Corrupt {
                resource: Resource::Links,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_every_link_kind_roundtrips() {
        let mut poll = PollPayload::new("Lunch?", ["Soup", "Salad"]);
        poll.allow_multiple = true;
        poll.options[1].votes = 4;
        poll.end_date = Some(Utc.with_ymd_and_hms(2030, 1, 1, 12, 30, 0).unwrap());

        let mut video = MediaPayload::new("Talk", "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        video.duration = Some("12:01".to_string());

        let kinds = vec![
            LinkData::Product(Product {
                id: "632910392".to_string(),
                title: "Mug".to_string(),
                price: 12.5,
                image: Some("https://cdn.example/mug.png".to_string()),
                platform: Platform::Shopify,
                url: "https://shop.example/products/mug".to_string(),
            }),
            LinkData::Link(LinkPayload::new("Blog", "https://ada.example")),
            LinkData::Form(FormPayload {
                title: "Contact".to_string(),
                description: Some("Say hi".to_string()),
                form_fields: vec![FormField::new("Email", FieldType::Email).required()],
            }),
            LinkData::Folder(FolderPayload {
                title: "Reading".to_string(),
                description: None,
                links: vec![FolderEntry {
                    id: "f1".to_string(),
                    title: "Notes".to_string(),
                    url: "https://notes.example".to_string(),
                }],
            }),
            LinkData::Image(ImagePayload {
                title: "Cat".to_string(),
                url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
                description: None,
            }),
            LinkData::Video(video),
            LinkData::Podcast(MediaPayload::new("Episode 1", "https://pod.example/1.mp3")),
            LinkData::Social(LinkPayload::new("Mastodon", "https://social.example/@ada")),
            LinkData::Poll(poll),
        ];

        let mut editor = Editor::new();
        for data in kinds {
            editor.add_link(LinkItem::new(data)).unwrap();
        }
        let document = editor.document().clone();
        let mut seen: Vec<LinkType> = document.links.iter().map(LinkItem::link_type).collect();
        seen.dedup();
        assert_eq!(seen, LinkType::ALL);

        let repo = Repository::new(MemoryStore::new());
        repo.save("u1", &document).await.unwrap();
        let loaded = repo.load("u1").await.unwrap();
        assert_eq!(loaded.document, document);
    }

    #[tokio::test]
    async fn test_save_refuses_payload_that_would_not_load() {
        let store = MemoryStore::new();
        let repo = Repository::new(store.clone());
        let mut document = sample_document();
        repo.save("u1", &document).await.unwrap();

        document.links.push(LinkItem::with_id(
            "blank",
            LinkData::Link(LinkPayload::new("Blank", "")),
        ));
        let err = repo.save("u1", &document).await.unwrap_err();
        assert_eq!(err.failed, Resource::Links);
        assert!(matches!(err.source, StoreError::Corrupt { .. }));

        // The stored links are the last good set and still load.
        let loaded = repo.load("u1").await.unwrap();
        assert_eq!(loaded.document.links.len(), 3);
    }
}
