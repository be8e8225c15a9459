use std::cell::Cell;
use std::collections::HashMap;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::Tables;
use crate::entity::{Category, Color, FullNote, Note, NoteCategoryLink};
use crate::error::{Result, TilError};

const NOTE_COLUMNS: &str = "n.id, n.title, n.content, n.color_id, n.created_at, n.updated_at";

/// Table-level operations over one connection or transaction.
///
/// Categories and colors are inserted with abort semantics, notes and links
/// with replace semantics.
pub struct Dao<'c> {
    conn: &'c Connection,
    touched: Cell<Tables>,
}

impl<'c> Dao<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            touched: Cell::new(Tables::NONE),
        }
    }

    pub(crate) fn touched(&self) -> Tables {
        self.touched.get()
    }

    fn touch(&self, tables: Tables) {
        self.touched.set(self.touched.get().union(tables));
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// All categories ordered by name
    pub fn get_all_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name ASC")?;

        let results = stmt
            .query_map([], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    /// Exact, case-sensitive name lookup
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE name = ?1 LIMIT 1",
                [name],
                category_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Insert a category, failing with `DuplicateKey` if the id exists
    pub fn insert_category(&self, category: &Category) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO categories (id, name) VALUES (?1, ?2)",
                params![category.id, category.name],
            )
            .map_err(|e| duplicate_key(e, "categories", &category.id))?;
        self.touch(Tables::CATEGORIES);
        Ok(())
    }

    pub fn delete_category(&self, category: &Category) -> Result<()> {
        self.conn
            .execute("DELETE FROM categories WHERE id = ?1", [&category.id])?;
        self.touch(Tables::CATEGORIES);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Colors
    // ------------------------------------------------------------------

    /// All colors ordered by id
    pub fn get_all_colors(&self) -> Result<Vec<Color>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, value FROM colors ORDER BY id")?;

        let results = stmt
            .query_map([], color_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    pub fn find_color_by_value(&self, value: i64) -> Result<Option<Color>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, value FROM colors WHERE value = ?1 ORDER BY id LIMIT 1",
                [value],
                color_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Insert a color, failing with `DuplicateKey` if the id exists
    pub fn insert_color(&self, color: &Color) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO colors (id, value) VALUES (?1, ?2)",
                params![color.id, color.value],
            )
            .map_err(|e| duplicate_key(e, "colors", &color.id))?;
        self.touch(Tables::COLORS);
        Ok(())
    }

    pub fn delete_color(&self, color: &Color) -> Result<()> {
        self.conn
            .execute("DELETE FROM colors WHERE id = ?1", [&color.id])?;
        self.touch(Tables::COLORS);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Insert or overwrite a note by id
    pub fn upsert_note(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notes
             (id, title, content, color_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                note.id,
                note.title,
                note.content,
                note.color_id,
                note.created_at,
                note.updated_at,
            ],
        )?;
        self.touch(Tables::NOTES);
        Ok(())
    }

    pub fn get_note(&self, id: &str) -> Result<Option<Note>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {} FROM notes n WHERE n.id = ?1", NOTE_COLUMNS),
                [id],
                note_from_row,
            )
            .optional()?;
        Ok(result)
    }

    /// Note ids starting with `prefix`
    pub fn find_note_ids_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM notes WHERE substr(id, 1, length(?1)) = ?1 ORDER BY id")?;

        let results = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(results)
    }

    pub fn delete_note(&self, note: &Note) -> Result<()> {
        self.conn.execute("DELETE FROM notes WHERE id = ?1", [&note.id])?;
        self.touch(Tables::NOTES);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Insert or overwrite a link by its composite key
    pub fn insert_link(&self, link: &NoteCategoryLink) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO note_categories (note_id, category_id) VALUES (?1, ?2)",
            params![link.note_id, link.category_id],
        )?;
        self.touch(Tables::LINKS);
        Ok(())
    }

    /// Remove every link row for a note
    pub fn delete_links_for_note(&self, note_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM note_categories WHERE note_id = ?1", [note_id])?;
        self.touch(Tables::LINKS);
        Ok(())
    }

    /// Remove every link row pointing at a category
    pub fn delete_links_for_category(&self, category_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM note_categories WHERE category_id = ?1",
            [category_id],
        )?;
        self.touch(Tables::LINKS);
        Ok(())
    }

    pub fn get_all_links(&self) -> Result<Vec<NoteCategoryLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT note_id, category_id FROM note_categories ORDER BY note_id, category_id",
        )?;

        let results = stmt
            .query_map([], |row| {
                Ok(NoteCategoryLink {
                    note_id: row.get(0)?,
                    category_id: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(results)
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    pub fn count_notes(&self) -> Result<usize> {
        self.count("notes")
    }

    pub fn count_categories(&self) -> Result<usize> {
        self.count("categories")
    }

    pub fn count_colors(&self) -> Result<usize> {
        self.count("colors")
    }

    pub fn count_links(&self) -> Result<usize> {
        self.count("note_categories")
    }

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Joined projection
    // ------------------------------------------------------------------

    /// Every note with its color and categories, most recently updated first
    pub fn get_full_notes(&self) -> Result<Vec<FullNote>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {}, c.id, c.value
             FROM notes n
             LEFT JOIN colors c ON c.id = n.color_id
             ORDER BY n.updated_at DESC, n.id",
            NOTE_COLUMNS
        ))?;

        let notes = stmt
            .query_map([], note_with_color_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut categories_by_note = self.categories_by_note(None)?;

        Ok(notes
            .into_iter()
            .map(|(note, color)| {
                let categories = categories_by_note.remove(&note.id).unwrap_or_default();
                FullNote {
                    note,
                    color,
                    categories,
                }
            })
            .collect())
    }

    pub fn get_full_note(&self, id: &str) -> Result<Option<FullNote>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {}, c.id, c.value
                     FROM notes n
                     LEFT JOIN colors c ON c.id = n.color_id
                     WHERE n.id = ?1",
                    NOTE_COLUMNS
                ),
                [id],
                note_with_color_from_row,
            )
            .optional()?;

        let Some((note, color)) = row else {
            return Ok(None);
        };

        let categories = self
            .categories_by_note(Some(id))?
            .remove(id)
            .unwrap_or_default();

        Ok(Some(FullNote {
            note,
            color,
            categories,
        }))
    }

    /// Resolve categories through the link table, grouped by note id.
    /// Links whose category no longer exists are skipped.
    fn categories_by_note(&self, note_id: Option<&str>) -> Result<HashMap<String, Vec<Category>>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.note_id, c.id, c.name
             FROM note_categories l
             JOIN categories c ON c.id = l.category_id
             WHERE ?1 IS NULL OR l.note_id = ?1
             ORDER BY c.name ASC, c.id",
        )?;

        let rows = stmt.query_map([note_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                Category {
                    id: row.get(1)?,
                    name: row.get(2)?,
                },
            ))
        })?;

        let mut grouped: HashMap<String, Vec<Category>> = HashMap::new();
        for row in rows {
            let (note_id, category) = row?;
            grouped.entry(note_id).or_default().push(category);
        }
        Ok(grouped)
    }

    // ------------------------------------------------------------------
    // Meta
    // ------------------------------------------------------------------

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let result: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(result)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        self.touch(Tables::META);
        Ok(())
    }
}

fn duplicate_key(e: rusqlite::Error, table: &'static str, id: &str) -> TilError {
    if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        TilError::DuplicateKey {
            table,
            id: id.to_string(),
        }
    } else {
        e.into()
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn color_from_row(row: &Row<'_>) -> rusqlite::Result<Color> {
    Ok(Color {
        id: row.get(0)?,
        value: row.get(1)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        color_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn note_with_color_from_row(row: &Row<'_>) -> rusqlite::Result<(Note, Option<Color>)> {
    let note = note_from_row(row)?;
    let color_id: Option<String> = row.get(6)?;
    let color = match color_id {
        Some(id) => Some(Color {
            id,
            value: row.get(7)?,
        }),
        None => None,
    };
    Ok((note, color))
}
