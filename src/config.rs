use std::env;
use std::path::{Path, PathBuf};

use crate::storage::TIL_DIR;

/// Journal root: the explicit directory when given, otherwise the nearest
/// ancestor of the current directory holding `.til/`, otherwise the current
/// directory.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_journal_root(&cwd).unwrap_or(cwd)
}

/// Walk up from `start` looking for a `.til/` directory
pub fn find_journal_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(TIL_DIR).is_dir() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Default `RUST_LOG` directive for the binary
pub const DEFAULT_LOG_FILTER: &str = "til=info";
