//! Persisted user preferences, kept in the `meta` table.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TilError};
use crate::storage::Dao;

pub const DEFAULT_FONT: &str = "inter";

const FONT_KEY: &str = "font_key";
const DARK_THEME_KEY: &str = "dark_theme";

/// Keys accepted by [`Settings::get`] and [`Settings::set`]
pub const SETTING_KEYS: &[&str] = &[FONT_KEY, DARK_THEME_KEY];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub font_key: String,
    pub dark_theme: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_key: DEFAULT_FONT.to_string(),
            dark_theme: false,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults for missing or unreadable keys
    pub fn load(dao: &Dao<'_>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(font) = dao.get_meta(FONT_KEY)? {
            settings.font_key = font;
        }
        if let Some(dark) = dao.get_meta(DARK_THEME_KEY)? {
            match dark.parse() {
                Ok(dark) => settings.dark_theme = dark,
                Err(_) => tracing::warn!(value = %dark, "ignoring unreadable dark_theme setting"),
            }
        }

        Ok(settings)
    }

    pub fn save(&self, dao: &Dao<'_>) -> Result<()> {
        dao.set_meta(FONT_KEY, &self.font_key)?;
        dao.set_meta(DARK_THEME_KEY, &self.dark_theme.to_string())?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            FONT_KEY => Ok(self.font_key.clone()),
            DARK_THEME_KEY => Ok(self.dark_theme.to_string()),
            _ => Err(unknown_key(key)),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            FONT_KEY => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(TilError::Parse("font_key must not be empty".to_string()));
                }
                self.font_key = value.to_string();
            }
            DARK_THEME_KEY => {
                self.dark_theme = value.trim().parse().map_err(|_| {
                    TilError::Parse(format!("dark_theme must be true or false, got '{}'", value))
                })?;
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> TilError {
    TilError::Parse(format!(
        "Unknown setting '{}'. Valid keys: {}",
        key,
        SETTING_KEYS.join(", ")
    ))
}
