use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;
use crate::repo::{LinkRow, PageStore, ProfileRow, Resource, ThemeRow};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<String, ProfileRow>,
    themes: HashMap<String, ThemeRow>,
    /// Keyed by link id, like the hosted table.
    links: HashMap<String, LinkRow>,
    failing: HashSet<Resource>,
}

/// In-memory PageStore for testing and offline use.
///
/// Clones share the same tables. [`MemoryStore::fail_on`] makes every read and
/// write of a resource fail until [`MemoryStore::clear_failures`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_on(&self, resource: Resource) {
        self.tables().failing.insert(resource);
    }

    pub fn clear_failures(&self) {
        self.tables().failing.clear();
    }

    fn check(tables: &Tables, resource: Resource) -> Result<(), StoreError> {
        if tables.failing.contains(&resource) {
            Err(StoreError::Unavailable(format!("{resource} table offline")))
        } else {
            Ok(())
        }
    }
}

impl PageStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StoreError> {
        let tables = self.tables();
        Self::check(&tables, Resource::Profile)?;
        Ok(tables.profiles.get(user_id).cloned())
    }

    async fn get_theme(&self, user_id: &str) -> Result<Option<ThemeRow>, StoreError> {
        let tables = self.tables();
        Self::check(&tables, Resource::Theme)?;
        Ok(tables.themes.get(user_id).cloned())
    }

    async fn list_links(&self, user_id: &str) -> Result<Vec<LinkRow>, StoreError> {
        let tables = self.tables();
        Self::check(&tables, Resource::Links)?;
        let mut rows: Vec<LinkRow> = tables
            .links
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.position);
        Ok(rows)
    }

    async fn upsert_profile(&self, row: ProfileRow) -> Result<(), StoreError> {
        let mut tables = self.tables();
        Self::check(&tables, Resource::Profile)?;
        tables.profiles.insert(row.user_id.clone(), row);
        Ok(())
    }

    async fn upsert_theme(&self, row: ThemeRow) -> Result<(), StoreError> {
        let mut tables = self.tables();
        Self::check(&tables, Resource::Theme)?;
        tables.themes.insert(row.user_id.clone(), row);
        Ok(())
    }

    async fn upsert_links(&self, user_id: &str, rows: Vec<LinkRow>) -> Result<(), StoreError> {
        let mut tables = self.tables();
        Self::check(&tables, Resource::Links)?;
        for mut row in rows {
            row.user_id = user_id.to_string();
            tables.links.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn prune_links(&self, user_id: &str, keep: &[String]) -> Result<(), StoreError> {
        let mut tables = self.tables();
        Self::check(&tables, Resource::Links)?;
        tables
            .links
            .retain(|id, row| row.user_id != user_id || keep.contains(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_row(id: &str, user_id: &str, position: u32) -> LinkRow {
        LinkRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            link_type: "link".to_string(),
            data: serde_json::json!({"title": id, "url": "https://example.com"}),
            position,
        }
    }

    #[tokio::test]
    async fn test_list_links_sorted_by_position() {
        let store = MemoryStore::new();
        store
            .upsert_links(
                "u1",
                vec![link_row("c", "u1", 2), link_row("a", "u1", 0), link_row("b", "u1", 1)],
            )
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_links("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_position() {
        let store = MemoryStore::new();
        store.upsert_links("u1", vec![link_row("a", "u1", 0)]).await.unwrap();
        store.upsert_links("u1", vec![link_row("a", "u1", 5)]).await.unwrap();

        let rows = store.list_links("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, 5);
    }

    #[tokio::test]
    async fn test_prune_only_touches_own_rows() {
        let store = MemoryStore::new();
        store
            .upsert_links("u1", vec![link_row("a", "u1", 0), link_row("b", "u1", 1)])
            .await
            .unwrap();
        store.upsert_links("u2", vec![link_row("z", "u2", 0)]).await.unwrap();

        store.prune_links("u1", &["b".to_string()]).await.unwrap();

        assert_eq!(store.list_links("u1").await.unwrap().len(), 1);
        assert_eq!(store.list_links("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_resource() {
        let store = MemoryStore::new();
        store.fail_on(Resource::Theme);
        assert!(store.get_theme("u1").await.is_err());
        assert!(store.get_profile("u1").await.is_ok());

        store.clear_failures();
        assert!(store.get_theme("u1").await.is_ok());
    }
}
