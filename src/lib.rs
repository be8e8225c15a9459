pub mod backup;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod query;
pub mod repository;
pub mod settings;
pub mod storage;
pub mod view;

pub use error::{Result, TilError};
pub use repository::TilRepository;
pub use storage::SqliteStore;
