// src/entity/note.rs
use serde::{Deserialize, Serialize};

use super::{new_id, now_millis, Category, Color};
use crate::error::{Result, TilError};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_CONTENT_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    /// References `Color::id`; not validated against the colors table
    pub color_id: String,
    /// Epoch milliseconds, set once
    pub created_at: i64,
    /// Epoch milliseconds, refreshed on every save
    pub updated_at: i64,
}

impl Note {
    pub fn new(title: String, content: String, color_id: String) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            title,
            content,
            color_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check a title and body before saving. At least one must be non-blank
    /// and both must fit their length limits, counted in characters.
    pub fn validate(title: &str, content: &str) -> Result<()> {
        if title.trim().is_empty() && content.trim().is_empty() {
            return Err(TilError::Parse("A note needs a title or content".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(TilError::Parse(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(TilError::Parse(format!(
                "Content must be at most {} characters",
                MAX_CONTENT_LENGTH
            )));
        }
        Ok(())
    }
}

/// A note joined with its color and categories. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullNote {
    #[serde(flatten)]
    pub note: Note,
    pub color: Option<Color>,
    pub categories: Vec<Category>,
}

impl FullNote {
    pub fn has_category(&self, category_id: &str) -> bool {
        self.categories.iter().any(|c| c.id == category_id)
    }
}
