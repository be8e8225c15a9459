use std::collections::HashSet;
use std::io::{self, Read};
use std::path::Path;

use crate::entity::{now_millis, Category, Color, FullNote};
use crate::error::{Result, TilError};
use crate::query::{
    categories_by_usage, category_usage, pick_random, sort_notes, NoteFilter, SortOrder, Stats,
    STREAK_DAYS,
};
use crate::repository::TilRepository;
use crate::settings::SETTING_KEYS;
use crate::storage::SqliteStore;

async fn open_repository(root: &Path) -> Result<TilRepository> {
    let store = SqliteStore::open(root)?;
    TilRepository::new(store).await
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn print_note_line(full: &FullNote) {
    let color = full
        .color
        .as_ref()
        .map(|c| c.hex())
        .unwrap_or_else(|| "-------".to_string());
    let categories: Vec<&str> = full.categories.iter().map(|c| c.name.as_str()).collect();

    if categories.is_empty() {
        println!("  {} {} {}", short_id(&full.note.id), color, full.note.title);
    } else {
        println!(
            "  {} {} {} [{}]",
            short_id(&full.note.id),
            color,
            full.note.title,
            categories.join(", ")
        );
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn print_full_note(full: &FullNote) {
    println!("{}", full.note.title);
    println!("  id:         {}", full.note.id);
    match &full.color {
        Some(color) => println!("  color:      {}", color.hex()),
        None => println!("  color:      (missing: {})", full.note.color_id),
    }
    if !full.categories.is_empty() {
        let names: Vec<&str> = full.categories.iter().map(|c| c.name.as_str()).collect();
        println!("  categories: {}", names.join(", "));
    }
    println!("  created:    {}", format_millis(full.note.created_at));
    println!("  updated:    {}", format_millis(full.note.updated_at));
    if !full.note.content.is_empty() {
        println!("\n{}", full.note.content);
    }
}

pub fn handle_init(root: &Path) -> Result<()> {
    let _store = SqliteStore::init(root)?;
    println!("Initialized til journal in {}", root.display());
    Ok(())
}

pub async fn handle_add(
    root: &Path,
    title: String,
    content: Option<String>,
    stdin: bool,
    color: Option<String>,
    categories: Vec<String>,
    json: bool,
) -> Result<()> {
    let repo = open_repository(root).await?;

    let content = if stdin { Some(read_stdin()?) } else { content };
    let color = color.as_deref().map(Color::from_hex).transpose()?;

    let note = repo
        .compose_note(
            None,
            Some(title.as_str()),
            content.as_deref(),
            color,
            Some(categories.as_slice()),
        )
        .await?;

    if json {
        match repo.get_note(&note.id).await? {
            Some(full) => println!("{}", serde_json::to_string_pretty(&full)?),
            None => return Err(TilError::NoteNotFound(note.id)),
        }
    } else {
        println!("Created note ({}) - {}", short_id(&note.id), note.title);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_edit(
    root: &Path,
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    color: Option<String>,
    categories: Vec<String>,
    clear_categories: bool,
    json: bool,
) -> Result<()> {
    let repo = open_repository(root).await?;
    let id = repo.resolve_note_id(&id).await?;

    let content = if stdin { Some(read_stdin()?) } else { content };
    let color = color.as_deref().map(Color::from_hex).transpose()?;
    let categories = if clear_categories {
        Some(&categories[..0])
    } else if categories.is_empty() {
        None
    } else {
        Some(categories.as_slice())
    };

    let note = repo
        .compose_note(
            Some(id.as_str()),
            title.as_deref(),
            content.as_deref(),
            color,
            categories,
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Updated note ({}) - {}", short_id(&note.id), note.title);
    }

    Ok(())
}

pub async fn handle_list(
    root: &Path,
    categories: Vec<String>,
    colors: Vec<String>,
    sort: SortOrder,
    json: bool,
) -> Result<()> {
    let repo = open_repository(root).await?;
    let notes = repo.observe_all_notes().borrow().clone();

    let mut filter = NoteFilter::default();
    if !categories.is_empty() {
        let known = repo.list_categories().await?;
        for name in &categories {
            let key = Category::name_key(name.trim());
            match known.iter().find(|c| Category::name_key(&c.name) == key) {
                Some(category) => {
                    filter.category_ids.insert(category.id.clone());
                }
                // an unknown category matches nothing
                None => {
                    filter.category_ids.insert(String::new());
                }
            }
        }
    }
    if !colors.is_empty() {
        let values = colors
            .iter()
            .map(|hex| Color::from_hex(hex))
            .collect::<Result<HashSet<i64>>>()?;
        filter.color_ids = repo
            .list_colors()
            .await?
            .into_iter()
            .filter(|c| values.contains(&c.value))
            .map(|c| c.id)
            .collect();
        if filter.color_ids.is_empty() {
            filter.color_ids.insert(String::new());
        }
    }

    let mut selected = filter.apply(&notes);
    sort_notes(&mut selected, sort);

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else if selected.is_empty() {
        println!("No notes found.");
    } else {
        println!("Notes:\n");
        for full in selected {
            print_note_line(full);
        }
    }

    Ok(())
}

pub async fn handle_show(root: &Path, id: String, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let id = repo.resolve_note_id(&id).await?;
    let full = repo
        .get_note(&id)
        .await?
        .ok_or_else(|| TilError::NoteNotFound(id.clone()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&full)?);
        return Ok(());
    }

    print_full_note(&full);
    Ok(())
}

pub async fn handle_delete(root: &Path, id: String) -> Result<()> {
    let repo = open_repository(root).await?;
    let id = repo.resolve_note_id(&id).await?;
    let full = repo
        .get_note(&id)
        .await?
        .ok_or_else(|| TilError::NoteNotFound(id.clone()))?;

    repo.delete_note(&full.note).await?;
    println!("Deleted note ({}) - {}", short_id(&id), full.note.title);
    Ok(())
}

pub async fn handle_categories(root: &Path, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let notes = repo.all_notes().await?;
    let categories = categories_by_usage(&repo.list_categories().await?, &notes);

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else if categories.is_empty() {
        println!("No categories found.");
    } else {
        let usage = category_usage(&notes);
        for category in categories {
            println!(
                "  {} {} ({})",
                short_id(&category.id),
                category.name,
                usage.get(&category.id).copied().unwrap_or(0)
            );
        }
    }
    Ok(())
}

pub async fn handle_colors(root: &Path, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let colors = repo.list_colors().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&colors)?);
    } else if colors.is_empty() {
        println!("No colors found.");
    } else {
        for color in colors {
            println!(
                "  {} {} alpha={:02X}",
                short_id(&color.id),
                color.hex(),
                Color::alpha(color.value)
            );
        }
    }
    Ok(())
}

pub async fn handle_stats(root: &Path, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let notes = repo.all_notes().await?;
    let categories = repo.list_categories().await?;
    let stats = Stats::compute(&notes, &categories, now_millis());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Total notes:       {}", stats.total);
        println!("Last 7 days:       {}", stats.last_7_days);
        println!("Categories:        {}", stats.categories);
        println!("Streak:            {}/{}", stats.streak, STREAK_DAYS);
    }
    Ok(())
}

pub async fn handle_random(root: &Path, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let notes = repo.all_notes().await?;
    let picked = pick_random(&notes, &mut rand::rng());

    if json {
        println!("{}", serde_json::to_string_pretty(&picked)?);
    } else {
        match picked {
            Some(full) => print_full_note(full),
            None => println!("No notes found."),
        }
    }
    Ok(())
}

pub async fn handle_export(root: &Path, file: &Path) -> Result<()> {
    let repo = open_repository(root).await?;
    repo.export_to_file(file).await?;
    println!("Exported backup to {}", file.display());
    Ok(())
}

pub async fn handle_import(root: &Path, file: &Path, json: bool) -> Result<()> {
    let repo = open_repository(root).await?;
    let report = repo.import_from_file(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Imported backup from {}", file.display());
        println!(
            "  notes: {}, links: {}",
            report.notes_written, report.links_written
        );
        println!(
            "  categories: {} new, {} reused",
            report.categories_inserted, report.categories_reused
        );
        println!(
            "  colors: {} new, {} reused",
            report.colors_inserted, report.colors_reused
        );
    }
    Ok(())
}

pub async fn handle_config_get(root: &Path, key: Option<String>) -> Result<()> {
    let repo = open_repository(root).await?;
    let settings = repo.settings().await?;

    match key {
        Some(key) => println!("{}", settings.get(&key)?),
        None => {
            for key in SETTING_KEYS {
                println!("{} = {}", key, settings.get(key)?);
            }
        }
    }
    Ok(())
}

pub async fn handle_config_set(root: &Path, key: String, value: String) -> Result<()> {
    let repo = open_repository(root).await?;
    let mut settings = repo.settings().await?;
    settings.set(&key, &value)?;
    repo.save_settings(&settings).await?;
    println!("{} = {}", key, settings.get(&key)?);
    Ok(())
}
