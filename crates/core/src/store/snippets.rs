//! Snippets pinned for offline viewing.
//!
//! Records exist only because a user explicitly saved them. Nothing in this
//! module evicts records on its own.

use super::connection::{Database, TransactionMode};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Object store holding pinned snippets.
pub const SNIPPETS_STORE: &str = "snippets";

/// A snippet saved for offline viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSnippet {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Populated on first save when omitted.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SavedSnippet {
    pub fn new(id: impl Into<String>, title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            code: code.into(),
            language: String::new(),
            description: None,
            note: None,
            creator_name: None,
            tags: Vec::new(),
            saved_at: None,
        }
    }
}

/// A partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// `Some(None)` clears the stored value; `None` keeps it.
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SnippetPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// Apply onto a stored record. The id and `saved_at` never change.
    fn apply(self, record: &mut SavedSnippet) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(code) = self.code {
            record.code = code;
        }
        if let Some(language) = self.language {
            record.language = language;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(note) = self.note {
            record.note = note;
        }
        if let Some(creator_name) = self.creator_name {
            record.creator_name = creator_name;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
    }
}

/// Deserialize a nullable field so that an explicit `null` is told apart from
/// an absent one. Pair with `#[serde(default)]`: absent stays `None`, `null`
/// becomes `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Result of looking up a snippet for offline viewing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineView {
    Saved(SavedSnippet),
    NotSaved,
}

/// Snippet operations on the offline database.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    db: Database,
}

impl OfflineStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Save a snippet for offline viewing, replacing any previous copy.
    ///
    /// Returns the stored record with `saved_at` populated.
    pub async fn add(&self, mut record: SavedSnippet) -> Result<SavedSnippet, Error> {
        if record.id.is_empty() {
            return Err(Error::InvalidInput("snippet id cannot be empty".into()));
        }
        record.saved_at.get_or_insert_with(Utc::now);

        let stored = record.clone();
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadWrite, move |store| {
                store.put(&serde_json::to_value(&stored)?)?;
                Ok(())
            })
            .await?;

        tracing::debug!(id = %record.id, "saved snippet for offline");
        Ok(record)
    }

    /// Merge a partial update into an existing record.
    ///
    /// Read and write happen in one transaction. Returns `None` without
    /// writing anything when no record exists for the id.
    pub async fn update(&self, patch: SnippetPatch) -> Result<Option<SavedSnippet>, Error> {
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadWrite, move |store| {
                let Some(existing) = store.get(&patch.id)? else {
                    return Ok(None);
                };
                let mut record: SavedSnippet = serde_json::from_value(existing)?;
                patch.apply(&mut record);
                store.put(&serde_json::to_value(&record)?)?;
                Ok(Some(record))
            })
            .await
    }

    /// Remove a pinned snippet. Removing an absent id is a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), Error> {
        let id = id.to_string();
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadWrite, move |store| store.delete(&id))
            .await
    }

    /// Remove every pinned snippet, returning how many were removed.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadWrite, |store| store.clear())
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<SavedSnippet>, Error> {
        let id = id.to_string();
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadOnly, move |store| {
                store
                    .get(&id)?
                    .map(|value| serde_json::from_value(value).map_err(Error::from))
                    .transpose()
            })
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<SavedSnippet>, Error> {
        self.db
            .with_store(SNIPPETS_STORE, TransactionMode::ReadOnly, |store| {
                store
                    .get_all()?
                    .into_iter()
                    .map(|value| serde_json::from_value(value).map_err(Error::from))
                    .collect()
            })
            .await
    }

    pub async fn contains(&self, id: &str) -> Result<bool, Error> {
        Ok(self.get(id).await?.is_some())
    }

    /// Look up a snippet for offline viewing.
    pub async fn view(&self, id: &str) -> Result<OfflineView, Error> {
        Ok(match self.get(id).await? {
            Some(record) => OfflineView::Saved(record),
            None => OfflineView::NotSaved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(dir: &tempfile::TempDir) -> OfflineStore {
        OfflineStore::new(Database::new(dir.path().join("offline.sqlite"), 1))
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let mut record = SavedSnippet::new("snip-1", "Quick sort", "def qs()...");
        record.language = "python".into();
        record.tags = vec!["sorting".into()];

        let stored = store.add(record.clone()).await.unwrap();
        assert!(stored.saved_at.is_some());

        let fetched = store.get("snip-1").await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.title, record.title);
        assert_eq!(fetched.tags, record.tags);
    }

    #[tokio::test]
    async fn test_add_keeps_supplied_saved_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let saved_at = "2026-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();

        let mut record = SavedSnippet::new("a", "T", "C");
        record.saved_at = Some(saved_at);
        store.add(record).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().unwrap().saved_at, Some(saved_at));
    }

    #[tokio::test]
    async fn test_add_rejects_empty_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let result = store.add(SavedSnippet::new("", "T", "C")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_partial_update_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let original = store.add(SavedSnippet::new("a", "T", "C")).await.unwrap();

        let patch = SnippetPatch { title: Some("T2".into()), ..SnippetPatch::new("a") };
        let updated = store.update(patch).await.unwrap().unwrap();

        assert_eq!(updated.id, "a");
        assert_eq!(updated.title, "T2");
        assert_eq!(updated.code, "C");
        assert_eq!(updated.saved_at, original.saved_at);
        assert_eq!(store.get("a").await.unwrap().unwrap(), updated);
    }

    #[test]
    fn test_patch_tells_null_from_absent() {
        let patch: SnippetPatch = serde_json::from_str(r#"{"id":"a","description":null,"note":"n"}"#).unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.note, Some(Some("n".to_string())));
        assert_eq!(patch.creator_name, None);

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"id": "a", "description": null, "note": "n"}));
    }

    #[tokio::test]
    async fn test_update_clears_nulled_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let mut record = SavedSnippet::new("a", "T", "C");
        record.description = Some("old description".into());
        record.note = Some("keep me".into());
        store.add(record).await.unwrap();

        let patch: SnippetPatch = serde_json::from_str(r#"{"id":"a","description":null}"#).unwrap();
        let updated = store.update(patch).await.unwrap().unwrap();

        assert_eq!(updated.description, None);
        assert_eq!(updated.note.as_deref(), Some("keep me"));
    }

    #[tokio::test]
    async fn test_update_absent_record_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        let patch = SnippetPatch { title: Some("T2".into()), ..SnippetPatch::new("missing") };
        assert!(store.update(patch).await.unwrap().is_none());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.add(SavedSnippet::new("a", "T", "C")).await.unwrap();

        store.remove("missing").await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);

        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.add(SavedSnippet::new("a", "T", "C")).await.unwrap();

        assert!(matches!(store.view("a").await.unwrap(), OfflineView::Saved(_)));
        assert_eq!(store.view("b").await.unwrap(), OfflineView::NotSaved);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        store.add(SavedSnippet::new("a", "T", "C")).await.unwrap();
        store.add(SavedSnippet::new("b", "T", "C")).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(!store.contains("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let store = OfflineStore::new(Database::new(dir.path(), 1));

        let err = store.add(SavedSnippet::new("a", "T", "C")).await.unwrap_err();
        assert!(err.is_storage());
    }
}
