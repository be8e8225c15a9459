use thiserror::Error;

#[derive(Error, Debug)]
pub enum TilError {
    #[error("Not in a til journal. Run 'til init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .til/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Duplicate key in {table}: {id}")]
    DuplicateKey { table: &'static str, id: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TilError>;

impl From<rusqlite::Error> for TilError {
    fn from(e: rusqlite::Error) -> Self {
        TilError::Storage(format!("SQLite error: {}", e))
    }
}
