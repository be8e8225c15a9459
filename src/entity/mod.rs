mod category;
mod color;
mod link;
mod note;

pub use category::{Category, MAX_NAME_LENGTH, MIN_NAME_LENGTH};
pub use color::{Color, DEFAULT_COLOR_HEX};
pub use link::NoteCategoryLink;
pub use note::{FullNote, Note, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH};

use chrono::Utc;
use uuid::Uuid;

/// Fresh primary key for notes, categories and colors
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
