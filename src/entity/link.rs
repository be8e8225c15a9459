// src/entity/link.rs
use serde::{Deserialize, Serialize};

/// Many-to-many association between a note and a category.
/// Keyed by `(note_id, category_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteCategoryLink {
    pub note_id: String,
    pub category_id: String,
}

impl NoteCategoryLink {
    pub fn new(note_id: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            category_id: category_id.into(),
        }
    }
}
