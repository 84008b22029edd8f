//! Command-line interface for assetbank.
//!
//! Provides commands for creating libraries, banking content, listing and
//! searching entries, and removing them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::bank::BankContext;
use crate::config::{load_config, LibraryConfig, ResolvedConfig};
use crate::library::{Catalog, EntryId, Registry};
use crate::strategy::ContentHandle;

/// assetbank - Catalog reusable 3D content in flat-file libraries
#[derive(Parser, Debug)]
#[command(name = "assetbank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a library file if it does not exist
    Init {
        /// Library name from the config, or a path to a .json file
        library: String,
    },

    /// List configured libraries
    Libraries,

    /// List entries, sorted by content name
    List {
        /// Only list this library (name or path)
        #[arg(short, long)]
        library: Option<String>,

        /// Whitespace-separated terms that must all match
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Bank content into a library
    Bank {
        /// File holding the content
        source: PathBuf,

        /// Name of the content block inside the file
        #[arg(short, long)]
        name: String,

        /// Target library (name or path)
        #[arg(short, long)]
        library: String,

        /// Tags to apply (semicolon-separated)
        #[arg(short, long)]
        tags: Option<String>,

        /// Do not back up the library before writing
        #[arg(long)]
        no_backup: bool,
    },

    /// Show details of an entry
    Show {
        /// Entry ID (e.g. "Hero:hero_v2")
        id: String,

        /// Only look in this library (name or path)
        #[arg(short, long)]
        library: Option<String>,
    },

    /// Remove an entry from a library
    Remove {
        /// Entry ID
        id: String,

        /// Library to remove from (name or path)
        #[arg(short, long)]
        library: String,

        /// Do not back up the library before writing
        #[arg(long)]
        no_backup: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = load_config()?;

        match self.command {
            Commands::Init { library } => init_library(&config, &library),
            Commands::Libraries => list_libraries(&config),
            Commands::List { library, filter } => {
                list_entries(&config, library.as_deref(), filter.as_deref())
            }
            Commands::Bank {
                source,
                name,
                library,
                tags,
                no_backup,
            } => bank_content(&config, source, name, &library, tags, no_backup).await,
            Commands::Show { id, library } => show_entry(&config, &id, library.as_deref()),
            Commands::Remove {
                id,
                library,
                no_backup,
            } => remove_entry(&config, &id, &library, no_backup).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Split a `a; b ;c` tag list, dropping empty tags
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn registry(config: &ResolvedConfig) -> Registry {
    Registry::new(config.registry.write_mode)
}

fn selected_libraries(config: &ResolvedConfig, library: Option<&str>) -> Vec<LibraryConfig> {
    match library {
        Some(name) => {
            let mut lib = config.library(name);
            // An explicitly requested library is listed even when disabled
            lib.enabled = true;
            vec![lib]
        }
        None => config.enabled_libraries(),
    }
}

fn init_library(config: &ResolvedConfig, library: &str) -> Result<()> {
    let lib = config.library(library);
    registry(config)
        .ensure_library(&lib.path)
        .with_context(|| format!("Failed to initialize library '{}'", lib.name))?;

    println!("Library '{}' ready at {}", lib.name, lib.path.display());
    Ok(())
}

fn list_libraries(config: &ResolvedConfig) -> Result<()> {
    let registry = registry(config);

    println!("{:<20} {:<8} {:<9} {:<8} PATH", "NAME", "ENABLED", "READONLY", "ENTRIES");
    println!("{}", "-".repeat(80));

    for lib in &config.libraries {
        let count = match registry.list_entries(&lib.path) {
            Ok(entries) => entries.len().to_string(),
            Err(e) => format!("error ({:?})", e.kind()),
        };
        println!(
            "{:<20} {:<8} {:<9} {:<8} {}",
            lib.name,
            if lib.enabled { "yes" } else { "no" },
            if lib.readonly { "yes" } else { "no" },
            count,
            lib.path.display()
        );
    }

    Ok(())
}

fn list_entries(config: &ResolvedConfig, library: Option<&str>, filter: Option<&str>) -> Result<()> {
    let libraries = selected_libraries(config, library);
    let catalog = Catalog::load(&registry(config), &libraries);

    for error in &catalog.errors {
        eprintln!("Warning: library '{}' skipped: {}", error.library, error.message);
    }

    let items = catalog.search(filter.unwrap_or(""));
    if items.is_empty() {
        println!("No entries found");
        return Ok(());
    }

    println!("{:<24} {:<16} {:<32} TAGS", "CONTENT", "LIBRARY", "ID");
    println!("{}", "-".repeat(90));

    for item in items {
        println!(
            "{:<24} {:<16} {:<32} {}",
            item.entry.content_name,
            item.library,
            item.id,
            item.entry.tags().join(", ")
        );
    }

    Ok(())
}

async fn bank_content(
    config: &ResolvedConfig,
    source: PathBuf,
    name: String,
    library: &str,
    tags: Option<String>,
    no_backup: bool,
) -> Result<()> {
    let lib = config.library(library);
    let source = source
        .canonicalize()
        .with_context(|| format!("Source file not found: {}", source.display()))?;

    let mut content = ContentHandle::new(name, source);
    if let Some(tags) = tags {
        content = content.with_tags(parse_tags(&tags));
    }

    let context = BankContext::from_config(config)?.with_backup(config.registry.backup && !no_backup);
    let result = context.bank(&lib, &content).await;
    context.shutdown().await?;
    let outcome = result?;

    println!("Banked '{}' into '{}'", outcome.entry.content_name, lib.name);
    println!("  ID:        {}", outcome.id);
    println!("  File:      {}", outcome.entry.source_path);
    println!("  Thumbnail: {}", outcome.thumbnail_path);

    Ok(())
}

fn show_entry(config: &ResolvedConfig, id: &str, library: Option<&str>) -> Result<()> {
    let id = EntryId::new(id)?;
    let libraries = selected_libraries(config, library);
    let catalog = Catalog::load(&registry(config), &libraries);

    for error in &catalog.errors {
        eprintln!("Warning: library '{}' skipped: {}", error.library, error.message);
    }

    let items = catalog.find(&id);
    if items.is_empty() {
        anyhow::bail!("Entry not found: {}", id);
    }

    for item in items {
        let entry = &item.entry;
        println!("ID:        {}", item.id);
        println!("Library:   {}", item.library);
        println!("Content:   {}", entry.content_name);
        println!("File:      {}", entry.source_path);
        println!("Thumbnail: {}", entry.thumbnail_or_default().display());
        if !entry.tags().is_empty() {
            println!("Tags:      {}", entry.tags().join(", "));
        }
        if let Some(metadata) = &entry.metadata {
            println!("Metadata:  {}", serde_json::to_string_pretty(metadata)?);
        }
        println!();
    }

    Ok(())
}

async fn remove_entry(config: &ResolvedConfig, id: &str, library: &str, no_backup: bool) -> Result<()> {
    let lib = config.library(library);
    let id = EntryId::new(id)?;

    let context = BankContext::from_config(config)?.with_backup(config.registry.backup && !no_backup);
    let removed = context.remove(&lib, &id);
    context.shutdown().await?;

    if removed? {
        println!("Removed {} from '{}'", id, lib.name);
    } else {
        println!("No entry {} in '{}'", id, lib.name);
    }

    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("Home:        {}", config.home.display());
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Write mode:  {}", config.registry.write_mode);
    println!("Backup:      {}", config.registry.backup);
    println!("Id scheme:   {:?}", config.registry.id_scheme);
    println!("Strategy:    {}", config.bank.strategy);
    if !config.bank.command.is_empty() {
        println!("Command:     {}", config.bank.command.join(" "));
    }
    println!("Libraries:");
    for lib in &config.libraries {
        println!("  {} -> {}", lib.name, lib.path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rigged; biped;;  hero "), vec!["rigged", "biped", "hero"]);
        assert!(parse_tags(" ; ").is_empty());
    }

    #[test]
    fn test_cli_parses_bank() {
        let cli = Cli::try_parse_from([
            "assetbank", "bank", "scene.blend", "--name", "Hero", "--library", "Main", "--tags",
            "a;b", "--no-backup",
        ])
        .unwrap();

        match cli.command {
            Commands::Bank {
                name,
                library,
                tags,
                no_backup,
                ..
            } => {
                assert_eq!(name, "Hero");
                assert_eq!(library, "Main");
                assert_eq!(tags.as_deref(), Some("a;b"));
                assert!(no_backup);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_list_filter() {
        let cli = Cli::try_parse_from(["assetbank", "list", "--filter", "hero rig"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List { library: None, filter: Some(ref f) } if f == "hero rig"
        ));
    }
}
