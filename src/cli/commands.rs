use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::query::SortOrder;

#[derive(Parser, Debug)]
#[command(name = "til")]
#[command(version, about = "Today I Learned: a local journal of short learning notes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Journal root (the directory holding .til/)
    #[arg(long, global = true, env = "TIL_DIR", value_name = "PATH")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new journal in the current directory
    Init,

    /// Record a new note
    Add {
        /// Note title
        title: String,

        /// Note body
        #[arg(long, conflicts_with = "stdin")]
        content: Option<String>,

        /// Read the body from stdin
        #[arg(long)]
        stdin: bool,

        /// Color as #RRGGBB or #AARRGGBB
        #[arg(long)]
        color: Option<String>,

        /// Category name, created on first use (can be specified multiple times)
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an existing note
    Edit {
        /// Note ID or unique prefix
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New body
        #[arg(long, conflicts_with = "stdin")]
        content: Option<String>,

        /// Read the new body from stdin
        #[arg(long)]
        stdin: bool,

        /// New color as #RRGGBB or #AARRGGBB
        #[arg(long)]
        color: Option<String>,

        /// Replace the categories with these (can be specified multiple times)
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Remove every category from the note
        #[arg(long, conflicts_with = "categories")]
        clear_categories: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes
    List {
        /// Only notes carrying all of these categories
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,

        /// Only notes with one of these colors
        #[arg(long = "color")]
        colors: Vec<String>,

        /// Sort order: date, color or category
        #[arg(long, default_value_t = SortOrder::Date)]
        sort: SortOrder,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Show {
        /// Note ID or unique prefix
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID or unique prefix
        id: String,
    },

    /// List categories, most used first
    Categories {
        #[arg(long)]
        json: bool,
    },

    /// List colors
    Colors {
        #[arg(long)]
        json: bool,
    },

    /// Show one note picked at random
    Random {
        #[arg(long)]
        json: bool,
    },

    /// Show note counts
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Write a JSON backup of the whole journal
    Export {
        /// Destination file
        file: PathBuf,
    },

    /// Merge a JSON backup into the journal
    Import {
        /// Backup file
        file: PathBuf,

        /// Output the merge report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read or change settings
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print one setting, or all of them
    Get {
        /// font_key or dark_theme
        key: Option<String>,
    },
    /// Change a setting
    Set {
        /// font_key or dark_theme
        key: String,
        value: String,
    },
}
