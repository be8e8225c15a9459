//! Portable JSON backup of the whole journal.
//!
//! Field names follow the existing backup format (`tils`, `crossRefs`, `tilId`)
//! so older backup files import unchanged.

mod merge;

pub use merge::{merge_into, MergeReport};

use serde::{Deserialize, Serialize};

use crate::entity::{Category, Color, FullNote, Note, NoteCategoryLink};
use crate::error::{Result, TilError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    pub id: String,
    pub title: String,
    pub content: String,
    pub color_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorDto {
    pub id: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDto {
    #[serde(rename = "tilId")]
    pub note_id: String,
    pub category_id: String,
}

/// The full dataset as written to and read from a backup file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(rename = "tils")]
    pub notes: Vec<NoteDto>,
    pub categories: Vec<CategoryDto>,
    pub colors: Vec<ColorDto>,
    #[serde(rename = "crossRefs")]
    pub links: Vec<LinkDto>,
}

impl BackupDocument {
    /// Build a document from a snapshot. Links are derived from each note's
    /// resolved categories.
    pub fn from_snapshot(notes: &[FullNote], categories: &[Category], colors: &[Color]) -> Self {
        let links = notes
            .iter()
            .flat_map(|full| {
                full.categories.iter().map(move |category| LinkDto {
                    note_id: full.note.id.clone(),
                    category_id: category.id.clone(),
                })
            })
            .collect();

        Self {
            notes: notes.iter().map(|full| NoteDto::from(&full.note)).collect(),
            categories: categories.iter().map(CategoryDto::from).collect(),
            colors: colors.iter().map(ColorDto::from).collect(),
            links,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
            && self.categories.is_empty()
            && self.colors.is_empty()
            && self.links.is_empty()
    }

    /// Pretty-printed JSON
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a backup. Missing fields or wrong types are `Parse` errors.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| TilError::Parse(format!("Invalid backup document: {}", e)))
    }
}

impl From<&Note> for NoteDto {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            color_id: note.color_id.clone(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl From<&NoteDto> for Note {
    fn from(dto: &NoteDto) -> Self {
        Self {
            id: dto.id.clone(),
            title: dto.title.clone(),
            content: dto.content.clone(),
            color_id: dto.color_id.clone(),
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        }
    }
}

impl From<&Category> for CategoryDto {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
        }
    }
}

impl From<&CategoryDto> for Category {
    fn from(dto: &CategoryDto) -> Self {
        Self {
            id: dto.id.clone(),
            name: dto.name.clone(),
        }
    }
}

impl From<&Color> for ColorDto {
    fn from(color: &Color) -> Self {
        Self {
            id: color.id.clone(),
            value: color.value,
        }
    }
}

impl From<&ColorDto> for Color {
    fn from(dto: &ColorDto) -> Self {
        Self {
            id: dto.id.clone(),
            value: dto.value,
        }
    }
}

impl From<&LinkDto> for NoteCategoryLink {
    fn from(dto: &LinkDto) -> Self {
        NoteCategoryLink::new(dto.note_id.clone(), dto.category_id.clone())
    }
}
