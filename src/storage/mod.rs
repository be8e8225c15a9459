mod dao;
mod sqlite_store;

pub use dao::Dao;
pub use sqlite_store::{SqliteStore, TIL_DB, TIL_DIR};

/// Set of tables touched by a write, used for change notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tables(u8);

impl Tables {
    pub const NONE: Tables = Tables(0);
    pub const NOTES: Tables = Tables(1);
    pub const CATEGORIES: Tables = Tables(1 << 1);
    pub const COLORS: Tables = Tables(1 << 2);
    pub const LINKS: Tables = Tables(1 << 3);
    pub const META: Tables = Tables(1 << 4);

    /// Tables the joined note projection is resolved from
    pub const FULL_NOTES: Tables =
        Tables(Self::NOTES.0 | Self::COLORS.0 | Self::LINKS.0 | Self::CATEGORIES.0);

    pub fn union(self, other: Tables) -> Tables {
        Tables(self.0 | other.0)
    }

    pub fn intersects(self, other: Tables) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Per-table commit counters published after every committed write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions {
    pub notes: u64,
    pub categories: u64,
    pub colors: u64,
    pub links: u64,
    pub meta: u64,
}

impl TableVersions {
    pub(crate) fn bump(&mut self, tables: Tables) {
        if tables.intersects(Tables::NOTES) {
            self.notes += 1;
        }
        if tables.intersects(Tables::CATEGORIES) {
            self.categories += 1;
        }
        if tables.intersects(Tables::COLORS) {
            self.colors += 1;
        }
        if tables.intersects(Tables::LINKS) {
            self.links += 1;
        }
        if tables.intersects(Tables::META) {
            self.meta += 1;
        }
    }

    /// Tables whose counters differ between two snapshots
    pub fn changed_since(&self, earlier: &TableVersions) -> Tables {
        let mut changed = Tables::NONE;
        if self.notes != earlier.notes {
            changed = changed.union(Tables::NOTES);
        }
        if self.categories != earlier.categories {
            changed = changed.union(Tables::CATEGORIES);
        }
        if self.colors != earlier.colors {
            changed = changed.union(Tables::COLORS);
        }
        if self.links != earlier.links {
            changed = changed.union(Tables::LINKS);
        }
        if self.meta != earlier.meta {
            changed = changed.union(Tables::META);
        }
        changed
    }
}
