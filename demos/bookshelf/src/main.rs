//! # Bookshelf
//!
//! A small catalogue of books served with django-async class-based views:
//!
//! - **Models**: `Author` and `Book` over the in-memory backend
//! - **Views**: list, detail, create, update, delete and date archives
//! - **Access**: editing pages behind login and permission checks
//! - **Settings**: TOML file plus `DJANGO_*` environment overrides
//!
//! ## Running
//!
//! ```bash
//! cargo run --package bookshelf-demo -- serve --addr 127.0.0.1:8000
//! curl -H 'x-demo-user: editor' http://127.0.0.1:8000/books/4/edit/
//! ```

mod models;
mod templates;
mod views;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use django_async::core::logging::setup_logging;
use django_async::core::settings::Settings;
use django_async::core::settings_loader;
use django_async::core::SETTINGS;
use django_async::template::Engine;

use views::{build_app, Library};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Serve the bookshelf demo")]
struct Cli {
    /// TOML settings file. Environment overrides apply on top.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the site.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,
    },
    /// Print the URL patterns.
    Routes,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => settings_loader::from_toml_file_with_env(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(settings_loader::from_env()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref())?;
    setup_logging(&settings);

    let engine = Arc::new(Engine::from_settings(&settings.templates)?);
    templates::install(&engine)?;
    SETTINGS.configure(settings);

    let library = Library::new();
    library.seed().await?;
    let app = build_app(&library, &engine);

    match cli.command {
        Command::Routes => {
            for pattern in app.patterns() {
                println!("{pattern}");
            }
        }
        Command::Serve { addr } => {
            tracing::info!(%addr, "Starting bookshelf");
            app.run(&addr).await?;
        }
    }
    Ok(())
}
