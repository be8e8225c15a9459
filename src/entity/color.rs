use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{Result, TilError};

/// Opaque alpha byte applied to six-digit colors
pub const ALPHA_MASK: i64 = 0xFF00_0000;

/// Color used when a note is saved without an explicit one
pub const DEFAULT_COLOR_HEX: &str = "#AFAFAF";

/// A palette entry. `value` is packed ARGB, alpha in the most significant byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: String,
    pub value: i64,
}

impl Color {
    pub fn new(value: i64) -> Self {
        Self { id: new_id(), value }
    }

    /// Parse `#RRGGBB` (forced opaque) or `#AARRGGBB` (alpha kept).
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Result<i64> {
        let clean = hex.trim();
        let clean = clean.strip_prefix('#').unwrap_or(clean);

        if !clean.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TilError::Parse(format!("Invalid hex color: {}", hex)));
        }

        let parsed = match clean.len() {
            6 | 8 => i64::from_str_radix(clean, 16)
                .map_err(|e| TilError::Parse(format!("Invalid hex color '{}': {}", hex, e)))?,
            _ => {
                return Err(TilError::Parse(format!(
                    "Hex color must have 6 or 8 digits: {}",
                    hex
                )))
            }
        };

        if clean.len() == 6 {
            Ok(ALPHA_MASK | (parsed & 0xFF_FFFF))
        } else {
            Ok(parsed & 0xFFFF_FFFF)
        }
    }

    /// Render the RGB part as `#RRGGBB`; alpha is dropped.
    pub fn to_hex(value: i64) -> String {
        format!("#{:06X}", value & 0xFF_FFFF)
    }

    pub fn alpha(value: i64) -> u8 {
        ((value >> 24) & 0xFF) as u8
    }

    pub fn hex(&self) -> String {
        Self::to_hex(self.value)
    }
}
