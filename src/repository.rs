//! Data-access façade used by every front end.
//!
//! All writes that span more than one statement run inside a single store
//! transaction, and every commit feeds the live note projection. Store work
//! runs on the blocking pool so async callers are never stalled by SQLite.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::backup::{merge_into, BackupDocument, MergeReport};
use crate::entity::{
    now_millis, Category, Color, FullNote, Note, NoteCategoryLink, DEFAULT_COLOR_HEX,
};
use crate::error::{Result, TilError};
use crate::settings::Settings;
use crate::storage::{Dao, SqliteStore, Tables};
use crate::view::{with_store, LiveQuery, SharedStore};

pub struct TilRepository {
    store: SharedStore,
    all_notes: LiveQuery<Vec<FullNote>>,
}

impl TilRepository {
    /// Take ownership of the store and start the all-notes projection.
    /// Must be called from within a tokio runtime.
    pub async fn new(store: SqliteStore) -> Result<Self> {
        let store: SharedStore = Arc::new(Mutex::new(store));
        let all_notes =
            LiveQuery::start(store.clone(), Tables::FULL_NOTES, |dao| dao.get_full_notes())
                .await?;
        Ok(Self { store, all_notes })
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Every note with color and categories, most recently updated first.
    /// Re-emits after each commit touching notes, colors, links or categories.
    pub fn observe_all_notes(&self) -> watch::Receiver<Arc<Vec<FullNote>>> {
        self.all_notes.subscribe()
    }

    /// Live view of a single note; `None` while it does not exist
    pub async fn observe_note(&self, id: &str) -> Result<LiveQuery<Option<FullNote>>> {
        let id = id.to_string();
        LiveQuery::start(self.store.clone(), Tables::FULL_NOTES, move |dao| {
            dao.get_full_note(&id)
        })
        .await
    }

    /// Snapshot read straight from storage
    pub async fn all_notes(&self) -> Result<Vec<FullNote>> {
        with_store(&self.store, |store| store.run(|dao| dao.get_full_notes())).await
    }

    pub async fn get_note(&self, id: &str) -> Result<Option<FullNote>> {
        let id = id.to_string();
        with_store(&self.store, move |store| store.run(|dao| dao.get_full_note(&id))).await
    }

    /// Resolve a full id or a unique id prefix
    pub async fn resolve_note_id(&self, id_or_prefix: &str) -> Result<String> {
        let prefix = id_or_prefix.to_string();
        let ids = with_store(&self.store, move |store| {
            store.run(|dao| dao.find_note_ids_by_prefix(&prefix))
        })
        .await?;

        if ids.iter().any(|id| id == id_or_prefix) {
            return Ok(id_or_prefix.to_string());
        }
        match ids.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(TilError::NoteNotFound(id_or_prefix.to_string())),
            _ => Err(TilError::NoteNotFound(format!(
                "{} (ambiguous, matches {} notes)",
                id_or_prefix,
                ids.len()
            ))),
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        with_store(&self.store, |store| store.run(|dao| dao.get_all_categories())).await
    }

    pub async fn list_colors(&self) -> Result<Vec<Color>> {
        with_store(&self.store, |store| store.run(|dao| dao.get_all_colors())).await
    }

    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let name = name.to_string();
        with_store(&self.store, move |store| {
            store.run(|dao| dao.find_category_by_name(&name))
        })
        .await
    }

    // ------------------------------------------------------------------
    // Categories and colors
    // ------------------------------------------------------------------

    /// Insert a new category without checking for an existing name
    pub async fn add_category(&self, name: &str) -> Result<Category> {
        let category = Category::new(name.to_string());
        with_store(&self.store, move |store| {
            store.run(|dao| dao.insert_category(&category))?;
            Ok(category)
        })
        .await
    }

    /// Insert a new color without checking for an existing value
    pub async fn add_color(&self, value: i64) -> Result<Color> {
        let color = Color::new(value);
        with_store(&self.store, move |store| {
            store.run(|dao| dao.insert_color(&color))?;
            Ok(color)
        })
        .await
    }

    /// Return the category whose name matches ignoring case, creating it if
    /// there is none. The name is trimmed and must be 2 to 20 characters.
    pub async fn ensure_category(&self, name: &str) -> Result<Category> {
        let name = name.to_string();
        with_store(&self.store, move |store| {
            store.transaction(|dao| ensure_category_in(dao, &name))
        })
        .await
    }

    /// Return the color with exactly this value, creating it if there is none
    pub async fn ensure_color(&self, value: i64) -> Result<Color> {
        with_store(&self.store, move |store| {
            store.transaction(|dao| ensure_color_in(dao, value))
        })
        .await
    }

    /// Delete a category and every link pointing at it
    pub async fn delete_category(&self, category: &Category) -> Result<()> {
        let category = category.clone();
        with_store(&self.store, move |store| {
            store.transaction(|dao| {
                dao.delete_links_for_category(&category.id)?;
                dao.delete_category(&category)
            })
        })
        .await
    }

    /// Delete a color. Notes using it keep the dangling id and render uncolored.
    pub async fn delete_color(&self, color: &Color) -> Result<()> {
        let color = color.clone();
        with_store(&self.store, move |store| store.run(|dao| dao.delete_color(&color))).await
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    pub async fn upsert_note(&self, note: &Note) -> Result<()> {
        let note = note.clone();
        with_store(&self.store, move |store| store.run(|dao| dao.upsert_note(&note))).await
    }

    /// Replace the note's links with exactly `category_ids`
    pub async fn set_note_category_links(
        &self,
        note_id: &str,
        category_ids: &[String],
    ) -> Result<()> {
        let note_id = note_id.to_string();
        let category_ids = category_ids.to_vec();
        with_store(&self.store, move |store| {
            store.transaction(|dao| replace_links(dao, &note_id, &category_ids))
        })
        .await
    }

    /// Delete a note together with its links
    pub async fn delete_note(&self, note: &Note) -> Result<()> {
        let note = note.clone();
        with_store(&self.store, move |store| {
            store.transaction(|dao| {
                dao.delete_links_for_note(&note.id)?;
                dao.delete_note(&note)
            })
        })
        .await
    }

    /// Create (`id == None`) or update a note and replace its category links.
    ///
    /// `created_at` is kept from the stored note when it exists; `updated_at`
    /// is always moved past its previous value.
    pub async fn save_note(
        &self,
        id: Option<&str>,
        title: &str,
        content: &str,
        color_id: &str,
        category_ids: &[String],
    ) -> Result<Note> {
        let id = id.map(str::to_string);
        let title = title.to_string();
        let content = content.to_string();
        let color_id = color_id.to_string();
        let category_ids = category_ids.to_vec();
        with_store(&self.store, move |store| {
            store.transaction(|dao| {
                save_note_in(dao, id.as_deref(), &title, &content, &color_id, &category_ids)
            })
        })
        .await
    }

    /// Create or update a note from a color value and category names,
    /// resolving both in the same transaction as the save.
    ///
    /// `None` keeps what the stored note has: its title, content, color or
    /// categories. A new note falls back to empty text, the default color and
    /// no categories. A failure anywhere leaves no new category or color
    /// behind.
    pub async fn compose_note(
        &self,
        id: Option<&str>,
        title: Option<&str>,
        content: Option<&str>,
        color: Option<i64>,
        categories: Option<&[String]>,
    ) -> Result<Note> {
        let id = id.map(str::to_string);
        let title = title.map(str::to_string);
        let content = content.map(str::to_string);
        let categories = categories.map(<[String]>::to_vec);

        with_store(&self.store, move |store| {
            store.transaction(|dao| {
                let existing = match &id {
                    Some(id) => dao.get_full_note(id)?,
                    None => None,
                };

                let color_id = match (color, &existing) {
                    (Some(value), _) => ensure_color_in(dao, value)?.id,
                    (None, Some(full)) => full.note.color_id.clone(),
                    (None, None) => ensure_color_in(dao, Color::from_hex(DEFAULT_COLOR_HEX)?)?.id,
                };

                let category_ids = match (&categories, &existing) {
                    (Some(names), _) => names
                        .iter()
                        .map(|name| ensure_category_in(dao, name).map(|c| c.id))
                        .collect::<Result<Vec<_>>>()?,
                    (None, Some(full)) => full.categories.iter().map(|c| c.id.clone()).collect(),
                    (None, None) => Vec::new(),
                };

                let title = title
                    .or_else(|| existing.as_ref().map(|f| f.note.title.clone()))
                    .unwrap_or_default();
                let content = content
                    .or_else(|| existing.as_ref().map(|f| f.note.content.clone()))
                    .unwrap_or_default();

                save_note_in(dao, id.as_deref(), &title, &content, &color_id, &category_ids)
            })
        })
        .await
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Serialize the whole dataset as a pretty-printed backup document
    pub async fn export_backup(&self) -> Result<String> {
        let doc = with_store(&self.store, |store| {
            store.run(|dao| {
                let notes = dao.get_full_notes()?;
                let categories = dao.get_all_categories()?;
                let colors = dao.get_all_colors()?;
                Ok(BackupDocument::from_snapshot(&notes, &categories, &colors))
            })
        })
        .await?;

        tracing::info!(
            notes = doc.notes.len(),
            categories = doc.categories.len(),
            colors = doc.colors.len(),
            links = doc.links.len(),
            "exported backup"
        );
        doc.encode()
    }

    /// Merge a backup document into the existing data in one transaction
    pub async fn import_backup(&self, json_text: &str) -> Result<MergeReport> {
        let doc = BackupDocument::decode(json_text)?;
        if doc.is_empty() {
            tracing::info!("backup is empty, nothing to import");
            return Ok(MergeReport::default());
        }

        let report = with_store(&self.store, move |store| {
            store.transaction(|dao| merge_into(dao, &doc))
        })
        .await?;

        tracing::info!(?report, "imported backup");
        Ok(report)
    }

    /// Export to `path`, replacing it atomically
    pub async fn export_to_file(&self, path: &Path) -> Result<()> {
        let text = self.export_backup().await?;
        let tmp = temp_sibling(path);

        if let Err(e) = tokio::fs::write(&tmp, text.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn import_from_file(&self, path: &Path) -> Result<MergeReport> {
        let text = tokio::fs::read_to_string(path).await?;
        self.import_backup(&text).await
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn settings(&self) -> Result<Settings> {
        with_store(&self.store, |store| store.run(|dao| Settings::load(dao))).await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let settings = settings.clone();
        with_store(&self.store, move |store| {
            store.transaction(|dao| settings.save(dao))
        })
        .await
    }
}

fn ensure_category_in(dao: &Dao<'_>, name: &str) -> Result<Category> {
    let name = Category::validate_name(name)?;
    let key = Category::name_key(name);

    if let Some(existing) = dao
        .get_all_categories()?
        .into_iter()
        .find(|c| Category::name_key(&c.name) == key)
    {
        return Ok(existing);
    }
    let category = Category::new(name.to_string());
    dao.insert_category(&category)?;
    tracing::debug!(id = %category.id, name = %category.name, "created category");
    Ok(category)
}

fn ensure_color_in(dao: &Dao<'_>, value: i64) -> Result<Color> {
    if let Some(existing) = dao.find_color_by_value(value)? {
        return Ok(existing);
    }
    let color = Color::new(value);
    dao.insert_color(&color)?;
    tracing::debug!(id = %color.id, value = %Color::to_hex(value), "created color");
    Ok(color)
}

fn save_note_in(
    dao: &Dao<'_>,
    id: Option<&str>,
    title: &str,
    content: &str,
    color_id: &str,
    category_ids: &[String],
) -> Result<Note> {
    Note::validate(title, content)?;

    let now = now_millis();
    let existing = match id {
        Some(id) => dao.get_note(id)?,
        None => None,
    };

    let note = match existing {
        Some(previous) => Note {
            id: previous.id,
            title: title.to_string(),
            content: content.to_string(),
            color_id: color_id.to_string(),
            created_at: previous.created_at,
            updated_at: now.max(previous.updated_at + 1),
        },
        None => {
            let mut note = Note::new(title.to_string(), content.to_string(), color_id.to_string());
            if let Some(id) = id {
                note.id = id.to_string();
            }
            note
        }
    };

    dao.upsert_note(&note)?;
    replace_links(dao, &note.id, category_ids)?;
    tracing::debug!(id = %note.id, categories = category_ids.len(), "saved note");
    Ok(note)
}

fn replace_links(dao: &Dao<'_>, note_id: &str, category_ids: &[String]) -> Result<()> {
    dao.delete_links_for_note(note_id)?;
    let mut seen = HashSet::new();
    for category_id in category_ids {
        if seen.insert(category_id.as_str()) {
            dao.insert_link(&NoteCategoryLink::new(note_id, category_id.as_str()))?;
        }
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn repo() -> TilRepository {
        TilRepository::new(SqliteStore::open_in_memory().unwrap())
            .await
            .unwrap()
    }

    /// Notes, categories, colors and links described by content only
    async fn fingerprint(
        repo: &TilRepository,
    ) -> (
        BTreeSet<(String, String)>,
        BTreeSet<String>,
        BTreeSet<i64>,
        BTreeSet<(String, String)>,
    ) {
        let notes = repo.all_notes().await.unwrap();
        let note_set = notes
            .iter()
            .map(|n| (n.note.title.clone(), n.note.content.clone()))
            .collect();
        let link_set = notes
            .iter()
            .flat_map(|n| {
                n.categories
                    .iter()
                    .map(move |c| (n.note.title.clone(), c.name.clone()))
            })
            .collect();
        let categories = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        let colors = repo
            .list_colors()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.value)
            .collect();
        (note_set, categories, colors, link_set)
    }

    async fn seed(repo: &TilRepository) {
        let red = repo.ensure_color(Color::from_hex("#FF0000").unwrap()).await.unwrap();
        let blue = repo.ensure_color(Color::from_hex("#0000FF").unwrap()).await.unwrap();
        let rust = repo.ensure_category("Rust").await.unwrap();
        let go = repo.ensure_category("Go").await.unwrap();
        repo.ensure_category("Unused").await.unwrap();

        repo.save_note(
            None,
            "Borrowing",
            "One mutable or many shared",
            &red.id,
            &[rust.id.clone()],
        )
        .await
        .unwrap();
        repo.save_note(
            None,
            "Goroutines",
            "Cheap green threads",
            &blue.id,
            &[go.id.clone(), rust.id.clone()],
        )
        .await
        .unwrap();
        repo.save_note(None, "Plain", "No categories", &red.id, &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_round_trip_into_fresh_store() {
        let source = repo().await;
        seed(&source).await;
        let json = source.export_backup().await.unwrap();

        let target = repo().await;
        target.import_backup(&json).await.unwrap();

        assert_eq!(fingerprint(&source).await, fingerprint(&target).await);
    }

    #[tokio::test]
    async fn test_reimport_dedups_categories_and_colors() {
        let source = repo().await;
        seed(&source).await;
        let json = source.export_backup().await.unwrap();

        let target = repo().await;
        target.import_backup(&json).await.unwrap();
        let notes_once = target.all_notes().await.unwrap();
        let links_once: usize = notes_once.iter().map(|n| n.categories.len()).sum();
        let categories_once = target.list_categories().await.unwrap().len();
        let colors_once = target.list_colors().await.unwrap().len();

        let report = target.import_backup(&json).await.unwrap();
        assert_eq!(report.categories_inserted, 0);
        assert_eq!(report.colors_inserted, 0);

        let notes_twice = target.all_notes().await.unwrap();
        let links_twice: usize = notes_twice.iter().map(|n| n.categories.len()).sum();
        assert_eq!(target.list_categories().await.unwrap().len(), categories_once);
        assert_eq!(target.list_colors().await.unwrap().len(), colors_once);
        assert_eq!(notes_twice.len(), notes_once.len() * 2);
        assert_eq!(links_twice, links_once * 2);
    }

    #[tokio::test]
    async fn test_failed_import_leaves_data_untouched() {
        let repo = repo().await;
        seed(&repo).await;
        let before = fingerprint(&repo).await;
        let existing_color = repo.list_colors().await.unwrap().remove(0);

        let json = format!(
            r#"{{
                "tils": [ {{ "id": "n-new", "title": "Never", "content": "", "colorId": "{id}",
                             "createdAt": 1, "updatedAt": 1 }} ],
                "categories": [ {{ "id": "k-new", "name": "Brand New" }} ],
                "colors": [ {{ "id": "{id}", "value": 1 }} ],
                "crossRefs": [ {{ "tilId": "n-new", "categoryId": "k-new" }} ]
            }}"#,
            id = existing_color.id
        );

        let err = repo.import_backup(&json).await.unwrap_err();
        assert!(matches!(err, TilError::DuplicateKey { .. }));
        assert_eq!(fingerprint(&repo).await, before);
        assert!(repo.find_category_by_name("Brand New").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_backup_is_parse_error() {
        let repo = repo().await;
        seed(&repo).await;
        let before = fingerprint(&repo).await;

        let err = repo.import_backup(r#"{ "tils": 3 }"#).await.unwrap_err();
        assert!(matches!(err, TilError::Parse(_)));
        assert_eq!(fingerprint(&repo).await, before);
    }

    #[tokio::test]
    async fn test_import_remaps_to_existing_category() {
        let repo = repo().await;
        repo.store()
            .lock()
            .await
            .run(|dao| {
                dao.insert_category(&Category {
                    id: "A".to_string(),
                    name: "Go".to_string(),
                })
            })
            .unwrap();

        let json = r#"{
            "tils": [ { "id": "n1", "title": "Channels", "content": "", "colorId": "c1",
                        "createdAt": 1, "updatedAt": 1 } ],
            "categories": [ { "id": "B", "name": "Go" } ],
            "colors": [ { "id": "c1", "value": 4278190080 } ],
            "crossRefs": [ { "tilId": "n1", "categoryId": "B" } ]
        }"#;
        repo.import_backup(json).await.unwrap();

        let categories = repo.list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, "A");

        let note = repo.get_note("n1").await.unwrap().unwrap();
        assert_eq!(note.categories.len(), 1);
        assert_eq!(note.categories[0].id, "A");
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let repo = repo().await;
        let color = repo.ensure_color(0xFFAF_AFAF).await.unwrap();
        let a = repo.ensure_category("Alpha").await.unwrap();
        let b = repo.ensure_category("Beta").await.unwrap();
        let c = repo.ensure_category("Gamma").await.unwrap();

        let created = repo
            .save_note(None, "Title", "Body", &color.id, &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert!(!created.id.is_empty());

        tokio::time::sleep(Duration::from_millis(5)).await;
        let other = repo.ensure_color(0xFF00_0000).await.unwrap();
        let updated = repo
            .save_note(
                Some(created.id.as_str()),
                "New title",
                "New body",
                &other.id,
                &[b.id.clone(), c.id.clone()],
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let full = repo.get_note(&created.id).await.unwrap().unwrap();
        assert_eq!(full.note, updated);
        assert_eq!(full.color, Some(other));
        let ids: BTreeSet<String> = full.categories.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, BTreeSet::from([b.id.clone(), c.id.clone()]));
        assert!(!full.has_category(&a.id));
        assert_eq!(repo.all_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_with_unknown_id_creates_under_that_id() {
        let repo = repo().await;
        let note = repo
            .save_note(Some("fixed-id"), "T", "C", "c", &[])
            .await
            .unwrap();
        assert_eq!(note.id, "fixed-id");
        assert_eq!(note.created_at, note.updated_at);
    }

    #[tokio::test]
    async fn test_ensure_category_ignores_case() {
        let repo = repo().await;
        let first = repo.ensure_category("Rust").await.unwrap();
        let second = repo.ensure_category("  rust ").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.list_categories().await.unwrap().len(), 1);
        assert!(matches!(repo.ensure_category("   ").await, Err(TilError::Parse(_))));
    }

    #[tokio::test]
    async fn test_ensure_category_checks_length() {
        let repo = repo().await;
        assert!(matches!(repo.ensure_category("R").await, Err(TilError::Parse(_))));
        assert!(matches!(
            repo.ensure_category("a category name that is far too long").await,
            Err(TilError::Parse(_))
        ));
        assert!(repo.list_categories().await.unwrap().is_empty());
        assert_eq!(repo.ensure_category(" Go ").await.unwrap().name, "Go");
    }

    #[tokio::test]
    async fn test_save_note_checks_length() {
        let repo = repo().await;
        let long_title = "t".repeat(101);
        assert!(matches!(
            repo.save_note(None, &long_title, "", "c", &[]).await,
            Err(TilError::Parse(_))
        ));
        assert!(matches!(repo.save_note(None, "  ", "", "c", &[]).await, Err(TilError::Parse(_))));
        assert!(repo.all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compose_note_resolves_names_and_defaults() {
        let repo = repo().await;
        let names = vec!["Rust".to_string(), "rust".to_string(), "Async".to_string()];
        let note = repo
            .compose_note(None, Some("Pinning"), None, None, Some(names.as_slice()))
            .await
            .unwrap();

        let full = repo.get_note(&note.id).await.unwrap().unwrap();
        assert_eq!(full.note.content, "");
        assert_eq!(full.color.unwrap().hex(), DEFAULT_COLOR_HEX);
        let mut categories: Vec<String> = full.categories.into_iter().map(|c| c.name).collect();
        categories.sort();
        assert_eq!(categories, vec!["Async", "Rust"]);
        assert_eq!(repo.list_categories().await.unwrap().len(), 2);

        // only the color changes
        let red = Color::from_hex("#FF0000").unwrap();
        repo.compose_note(Some(note.id.as_str()), None, None, Some(red), None)
            .await
            .unwrap();
        let full = repo.get_note(&note.id).await.unwrap().unwrap();
        assert_eq!(full.note.title, "Pinning");
        assert_eq!(full.color.unwrap().value, red);
        assert_eq!(full.categories.len(), 2);

        // an empty list clears the categories
        let cleared: Vec<String> = Vec::new();
        repo.compose_note(Some(note.id.as_str()), None, None, None, Some(cleared.as_slice()))
            .await
            .unwrap();
        let full = repo.get_note(&note.id).await.unwrap().unwrap();
        assert!(full.categories.is_empty());
        assert_eq!(full.color.unwrap().value, red);
    }

    #[tokio::test]
    async fn test_failed_compose_leaves_no_category_or_color() {
        let repo = repo().await;
        let names = vec!["Fresh".to_string()];
        let long_content = "c".repeat(201);

        let result = repo
            .compose_note(
                None,
                Some("Title"),
                Some(long_content.as_str()),
                Some(0xFF12_3456),
                Some(names.as_slice()),
            )
            .await;
        assert!(matches!(result, Err(TilError::Parse(_))));
        assert!(repo.list_categories().await.unwrap().is_empty());
        assert!(repo.list_colors().await.unwrap().is_empty());

        let bad_names = vec!["Fresh".to_string(), "x".to_string()];
        let result = repo
            .compose_note(None, Some("Title"), None, None, Some(bad_names.as_slice()))
            .await;
        assert!(matches!(result, Err(TilError::Parse(_))));
        assert!(repo.list_categories().await.unwrap().is_empty());
        assert!(repo.all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_color_reuses_value() {
        let repo = repo().await;
        let first = repo.ensure_color(0xFF12_3456).await.unwrap();
        let second = repo.ensure_color(0xFF12_3456).await.unwrap();
        assert_eq!(first, second);

        // raw add does not deduplicate
        repo.add_color(0xFF12_3456).await.unwrap();
        assert_eq!(repo.list_colors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_category_removes_links() {
        let repo = repo().await;
        let rust = repo.ensure_category("Rust").await.unwrap();
        let note = repo
            .save_note(None, "T", "C", "c", &[rust.id.clone()])
            .await
            .unwrap();

        repo.delete_category(&rust).await.unwrap();
        let full = repo.get_note(&note.id).await.unwrap().unwrap();
        assert!(full.categories.is_empty());
        assert!(repo.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_note() {
        let repo = repo().await;
        let rust = repo.add_category("Rust").await.unwrap();
        let note = repo
            .save_note(None, "T", "C", "c", &[rust.id.clone()])
            .await
            .unwrap();

        repo.delete_note(&note).await.unwrap();
        assert!(repo.get_note(&note.id).await.unwrap().is_none());
        let links = repo
            .store()
            .lock()
            .await
            .run(|dao| dao.get_all_links())
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_observe_all_notes_follows_saves() {
        let repo = repo().await;
        let mut rx = repo.observe_all_notes();
        assert!(rx.borrow_and_update().is_empty());

        let first = repo.save_note(None, "First", "", "c", &[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        repo.save_note(None, "Second", "", "c", &[]).await.unwrap();

        let notes = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| n.len() == 2))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(notes[0].note.title, "Second");
        assert_eq!(notes[1].note.id, first.id);
    }

    #[tokio::test]
    async fn test_observe_all_notes_follows_import() {
        let source = repo().await;
        seed(&source).await;
        let json = source.export_backup().await.unwrap();

        let target = repo().await;
        let mut rx = target.observe_all_notes();
        assert!(rx.borrow_and_update().is_empty());

        target.import_backup(&json).await.unwrap();

        let notes = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| n.len() == 3))
            .await
            .unwrap()
            .unwrap()
            .clone();
        let borrowing = notes.iter().find(|n| n.note.title == "Borrowing").unwrap();
        assert_eq!(borrowing.categories[0].name, "Rust");
        assert_eq!(borrowing.color.as_ref().unwrap().hex(), "#FF0000");
    }

    #[tokio::test]
    async fn test_observe_all_notes_follows_link_and_color_changes() {
        let repo = repo().await;
        let color = repo.ensure_color(0xFF00_FF00).await.unwrap();
        let rust = repo.ensure_category("Rust").await.unwrap();
        let note = repo
            .save_note(None, "Traits", "", &color.id, &[])
            .await
            .unwrap();

        let mut rx = repo.observe_all_notes();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| n.len() == 1))
            .await
            .unwrap()
            .unwrap();

        // links only
        repo.set_note_category_links(&note.id, &[rust.id.clone()])
            .await
            .unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|n| n.first().is_some_and(|f| f.categories.len() == 1)),
        )
        .await
        .unwrap()
        .unwrap();

        // colors only
        repo.delete_color(&color).await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|n| n.first().is_some_and(|f| f.color.is_none())),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn test_observe_note() {
        let repo = repo().await;
        let live = repo.observe_note("later").await.unwrap();
        assert!(live.get().is_none());
        let mut rx = live.subscribe();

        repo.save_note(Some("later"), "Now here", "", "c", &[])
            .await
            .unwrap();

        let note = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| n.is_some()))
            .await
            .unwrap()
            .unwrap()
            .clone();
        let full = Option::as_ref(&note).unwrap();
        assert_eq!(full.note.title, "Now here");
    }

    #[tokio::test]
    async fn test_resolve_note_id() {
        let repo = repo().await;
        repo.save_note(Some("abc123"), "A", "", "c", &[]).await.unwrap();
        repo.save_note(Some("abd456"), "B", "", "c", &[]).await.unwrap();

        assert_eq!(repo.resolve_note_id("abc").await.unwrap(), "abc123");
        assert!(matches!(repo.resolve_note_id("ab").await, Err(TilError::NoteNotFound(_))));
        assert!(matches!(repo.resolve_note_id("zzz").await, Err(TilError::NoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_file_export_import() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("backup.json");

        let source = repo().await;
        seed(&source).await;
        source.export_to_file(&path).await.unwrap();
        assert!(path.exists());
        assert!(!tmp.path().join(".backup.json.tmp").exists());

        let target = repo().await;
        let report = target.import_from_file(&path).await.unwrap();
        assert_eq!(report.notes_written, 3);
        assert_eq!(fingerprint(&source).await, fingerprint(&target).await);
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing").join("backup.json");

        let repo = repo().await;
        assert!(matches!(repo.export_to_file(&path).await, Err(TilError::Io(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let repo = repo().await;
        let mut settings = repo.settings().await.unwrap();
        assert_eq!(settings, Settings::default());

        settings.dark_theme = true;
        repo.save_settings(&settings).await.unwrap();
        assert!(repo.settings().await.unwrap().dark_theme);
    }
}
