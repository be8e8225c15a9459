//! Filtering, sorting and summary helpers over joined notes.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::entity::{Category, FullNote};

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest `created_at` first
    #[default]
    Date,
    /// Ascending color value, uncolored notes first
    Color,
    /// Ascending name of the first category, uncategorized notes first
    Category,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Date => write!(f, "date"),
            SortOrder::Color => write!(f, "color"),
            SortOrder::Category => write!(f, "category"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortOrder::Date),
            "color" | "colour" => Ok(SortOrder::Color),
            "category" => Ok(SortOrder::Category),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

/// Selection of categories and colors a note must match.
/// An empty selection matches everything.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    /// The note must carry every one of these
    pub category_ids: HashSet<String>,
    /// The note's color must be one of these
    pub color_ids: HashSet<String>,
}

impl NoteFilter {
    pub fn matches(&self, note: &FullNote) -> bool {
        let categories_match = self
            .category_ids
            .iter()
            .all(|id| note.has_category(id));

        let color_matches = self.color_ids.is_empty()
            || note
                .color
                .as_ref()
                .is_some_and(|c| self.color_ids.contains(&c.id));

        categories_match && color_matches
    }

    pub fn apply<'a>(&self, notes: &'a [FullNote]) -> Vec<&'a FullNote> {
        notes.iter().filter(|n| self.matches(n)).collect()
    }
}

/// Stable sort of `notes` in place
pub fn sort_notes(notes: &mut [&FullNote], order: SortOrder) {
    match order {
        SortOrder::Date => notes.sort_by(|a, b| b.note.created_at.cmp(&a.note.created_at)),
        SortOrder::Color => notes.sort_by_key(|n| n.color.as_ref().map(|c| c.value)),
        SortOrder::Category => notes.sort_by(|a, b| first_category(a).cmp(first_category(b))),
    }
}

fn first_category(note: &FullNote) -> &str {
    note.categories
        .first()
        .map(|c| c.name.as_str())
        .unwrap_or("")
}

/// How many notes carry each category id
pub fn category_usage(notes: &[FullNote]) -> HashMap<String, usize> {
    let mut usage = HashMap::new();
    for category in notes.iter().flat_map(|n| &n.categories) {
        *usage.entry(category.id.clone()).or_insert(0) += 1;
    }
    usage
}

/// Categories ordered by usage, most used first; ties keep their input order
pub fn categories_by_usage(categories: &[Category], notes: &[FullNote]) -> Vec<Category> {
    let usage = category_usage(notes);
    let mut sorted = categories.to_vec();
    sorted.sort_by_key(|c| std::cmp::Reverse(usage.get(&c.id).copied().unwrap_or(0)));
    sorted
}

/// One note picked uniformly at random, `None` when there are no notes
pub fn pick_random<'a, R>(notes: &'a [FullNote], rng: &mut R) -> Option<&'a FullNote>
where
    R: Rng + ?Sized,
{
    notes.choose(rng)
}

/// Days shown on the streak card
pub const STREAK_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    pub total: usize,
    pub last_7_days: usize,
    pub categories: usize,
    /// Notes of the past week, capped at one per day of the week
    pub streak: usize,
}

impl Stats {
    /// Count notes, those created within the week before `now_millis`, and
    /// the known categories
    pub fn compute(notes: &[FullNote], categories: &[Category], now_millis: i64) -> Self {
        let week_ago = now_millis - WEEK_MILLIS;
        let last_7_days = notes
            .iter()
            .filter(|n| n.note.created_at >= week_ago)
            .count();
        Self {
            total: notes.len(),
            last_7_days,
            categories: categories.len(),
            streak: last_7_days.min(STREAK_DAYS),
        }
    }
}
