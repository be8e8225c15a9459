use std::collections::HashMap;

use serde::Serialize;

use super::BackupDocument;
use crate::entity::{new_id, Category, Color, Note, NoteCategoryLink};
use crate::error::Result;
use crate::storage::Dao;

/// What a merge did, for logging and CLI output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub categories_inserted: usize,
    pub categories_reused: usize,
    pub colors_inserted: usize,
    pub colors_reused: usize,
    pub notes_written: usize,
    /// Notes stored under a fresh id because their backup id was taken
    pub notes_renamed: usize,
    pub links_written: usize,
}

/// Merge `doc` into the tables behind `dao`.
///
/// Categories are reused by case-insensitive name and colors by exact value,
/// with references rewritten through per-merge remap tables. Notes are never
/// deduplicated: a note keeps its backup id unless that id is already taken
/// locally, in which case it is stored under a fresh id. Importing the same
/// document twice therefore duplicates notes and links but not categories or
/// colors.
///
/// Call inside a transaction so a failure leaves no partial merge.
pub fn merge_into(dao: &Dao<'_>, doc: &BackupDocument) -> Result<MergeReport> {
    let mut report = MergeReport::default();

    let mut categories_by_name: HashMap<String, Category> = dao
        .get_all_categories()?
        .into_iter()
        .map(|c| (Category::name_key(&c.name), c))
        .collect();
    let mut colors_by_value: HashMap<i64, Color> = HashMap::new();
    for color in dao.get_all_colors()? {
        // lowest id wins when storage already holds duplicates
        colors_by_value.entry(color.value).or_insert(color);
    }

    let mut category_ids: HashMap<&str, String> = HashMap::new();
    let mut color_ids: HashMap<&str, String> = HashMap::new();
    let mut note_ids: HashMap<&str, String> = HashMap::new();

    for dto in &doc.categories {
        let key = Category::name_key(&dto.name);
        match categories_by_name.get(&key) {
            Some(existing) => {
                category_ids.insert(dto.id.as_str(), existing.id.clone());
                report.categories_reused += 1;
            }
            None => {
                let category = Category::from(dto);
                dao.insert_category(&category)?;
                category_ids.insert(dto.id.as_str(), category.id.clone());
                categories_by_name.insert(key, category);
                report.categories_inserted += 1;
            }
        }
    }

    for dto in &doc.colors {
        match colors_by_value.get(&dto.value) {
            Some(existing) => {
                color_ids.insert(dto.id.as_str(), existing.id.clone());
                report.colors_reused += 1;
            }
            None => {
                let color = Color::from(dto);
                dao.insert_color(&color)?;
                color_ids.insert(dto.id.as_str(), color.id.clone());
                colors_by_value.insert(color.value, color);
                report.colors_inserted += 1;
            }
        }
    }

    for dto in &doc.notes {
        let mut note = Note::from(dto);
        note.id = match note_ids.get(dto.id.as_str()) {
            // repeated id inside the document: replace the earlier copy
            Some(id) => id.clone(),
            None if dao.get_note(&dto.id)?.is_some() => {
                report.notes_renamed += 1;
                new_id()
            }
            None => dto.id.clone(),
        };
        note_ids.insert(dto.id.as_str(), note.id.clone());

        if let Some(color_id) = color_ids.get(dto.color_id.as_str()) {
            note.color_id = color_id.clone();
        }
        dao.upsert_note(&note)?;
        // clears links orphaned under this id by earlier deletes
        dao.delete_links_for_note(&note.id)?;
        report.notes_written += 1;
    }

    for dto in &doc.links {
        let mut link = NoteCategoryLink::from(dto);
        if let Some(note_id) = note_ids.get(dto.note_id.as_str()) {
            link.note_id = note_id.clone();
        }
        if let Some(category_id) = category_ids.get(dto.category_id.as_str()) {
            link.category_id = category_id.clone();
        }
        dao.insert_link(&link)?;
        report.links_written += 1;
    }

    Ok(report)
}
