use clap::Parser;
use til::cli::{
    handle_add, handle_categories, handle_colors, handle_config_get, handle_config_set,
    handle_delete, handle_edit, handle_export, handle_import, handle_init, handle_list,
    handle_random, handle_show, handle_stats, Cli, Commands, ConfigAction,
};
use til::config::{resolve_root, DEFAULT_LOG_FILTER};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let root = match &cli.command {
        // init always targets the given or current directory, never an ancestor
        Commands::Init => cli
            .dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| ".".into()),
        _ => resolve_root(cli.dir.as_deref()),
    };

    let result = match cli.command {
        Commands::Init => handle_init(&root),
        Commands::Add {
            title,
            content,
            stdin,
            color,
            categories,
            json,
        } => handle_add(&root, title, content, stdin, color, categories, json).await,
        Commands::Edit {
            id,
            title,
            content,
            stdin,
            color,
            categories,
            clear_categories,
            json,
        } => {
            handle_edit(
                &root,
                id,
                title,
                content,
                stdin,
                color,
                categories,
                clear_categories,
                json,
            )
            .await
        }
        Commands::List {
            categories,
            colors,
            sort,
            json,
        } => handle_list(&root, categories, colors, sort, json).await,
        Commands::Show { id, json } => handle_show(&root, id, json).await,
        Commands::Delete { id } => handle_delete(&root, id).await,
        Commands::Categories { json } => handle_categories(&root, json).await,
        Commands::Colors { json } => handle_colors(&root, json).await,
        Commands::Random { json } => handle_random(&root, json).await,
        Commands::Stats { json } => handle_stats(&root, json).await,
        Commands::Export { file } => handle_export(&root, &file).await,
        Commands::Import { file, json } => handle_import(&root, &file, json).await,
        Commands::Config(config) => match config.action {
            ConfigAction::Get { key } => handle_config_get(&root, key).await,
            ConfigAction::Set { key, value } => handle_config_set(&root, key, value).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
