use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{Result, TilError};

/// Length bounds for a category name entered by the user, after trimming
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(name: String) -> Self {
        Self { id: new_id(), name }
    }

    /// Key used for case-insensitive name deduplication.
    /// Whitespace is significant; callers trim user input first.
    pub fn name_key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Trim a user-entered name and check its length
    pub fn validate_name(name: &str) -> Result<&str> {
        let trimmed = name.trim();
        let len = trimmed.chars().count();
        if trimmed.is_empty() {
            return Err(TilError::Parse("Category name must not be empty".to_string()));
        }
        if len < MIN_NAME_LENGTH {
            return Err(TilError::Parse(format!(
                "Category name must be at least {} characters",
                MIN_NAME_LENGTH
            )));
        }
        if len > MAX_NAME_LENGTH {
            return Err(TilError::Parse(format!(
                "Category name must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
        Ok(trimmed)
    }
}
