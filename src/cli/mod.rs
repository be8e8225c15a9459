mod commands;
mod handlers;

pub use commands::{Cli, Commands, ConfigAction, ConfigCommand};
pub use handlers::{
    handle_add, handle_categories, handle_colors, handle_config_get, handle_config_set,
    handle_delete, handle_edit, handle_export, handle_import, handle_init, handle_list,
    handle_random, handle_show, handle_stats,
};
