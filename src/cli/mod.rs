//! Command-line interface for zotrag.
//!
//! Provides commands for listing collections, scanning a collection into
//! the metadata cache, inspecting single items and managing the cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::domain::{creator_index, Collection, Collections};
use crate::session::Session;

pub mod cache;

/// zotrag - Zotero PDF library scanner and metadata cache
#[derive(Parser, Debug)]
#[command(name = "zotrag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List collections in the library
    Collections,

    /// Scan a collection and populate the metadata cache
    Scan {
        /// Collection key or name (defaults to ZOTERO_DEFAULT_COLLECTION)
        collection: Option<String>,

        /// Destroy and recreate the cache before writing
        #[arg(long)]
        fresh: bool,

        /// Scan only, do not write the cache
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve a single PDF attachment by key
    Item {
        /// Attachment key
        key: String,
    },

    /// Manage the metadata cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },

    /// Show resolved configuration and validate provider selection
    Config,

    /// Count items per creator in a collection
    Creators {
        /// Collection key or name (defaults to ZOTERO_DEFAULT_COLLECTION)
        collection: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let session = Session::from_env()?;

        match self.command {
            Commands::Collections => list_collections(&session).await,
            Commands::Scan {
                collection,
                fresh,
                dry_run,
            } => scan_collection(&session, collection, fresh, dry_run).await,
            Commands::Item { key } => show_item(&session, &key).await,
            Commands::Cache { command } => cache::execute(session.store(), command),
            Commands::Config => show_config(&session),
            Commands::Creators { collection } => list_creators(&session, collection).await,
        }
    }
}

/// List collections
async fn list_collections(session: &Session) -> Result<()> {
    let collections = session
        .scanner()?
        .collections()
        .await
        .context("Failed to list collections")?;

    if collections.is_empty() {
        println!("No collections found.");
        return Ok(());
    }

    println!("{:<10} {:>7}  NAME", "KEY", "ITEMS");
    for collection in collections.iter() {
        println!(
            "{:<10} {:>7}  {}",
            collection.key, collection.number_of_items, collection.name
        );
    }
    println!();
    println!("{} collections", collections.len());

    Ok(())
}

/// Pick the collection to work on from an argument or the configured default
async fn select_collection(session: &Session, requested: Option<String>) -> Result<Collection> {
    let wanted = requested
        .or_else(|| session.config().default_collection().map(str::to_string))
        .context("No collection given and ZOTERO_DEFAULT_COLLECTION is not set")?;

    let collections: Collections = session
        .scanner()?
        .collections()
        .await
        .context("Failed to list collections")?;

    collections
        .by_key(&wanted)
        .or_else(|| collections.by_name(&wanted))
        .cloned()
        .with_context(|| format!("Collection not found: {}", wanted))
}

/// Scan a collection and write the cache
async fn scan_collection(
    session: &Session,
    requested: Option<String>,
    fresh: bool,
    dry_run: bool,
) -> Result<()> {
    let mut collection = select_collection(session, requested).await?;
    let scanner = session.scanner()?;

    println!(
        "Scanning {} ({}, {} items)...",
        collection.name, collection.key, collection.number_of_items
    );

    let report = scanner
        .scan_with_report(&collection.key)
        .await
        .with_context(|| format!("Failed to scan collection {}", collection.key))?;

    let orphaned = report.orphaned();
    let truncated = report.truncated;
    let started_at = report.started_at;
    let elapsed = report.elapsed;
    collection.add_items(report.items);

    println!();
    println!("Collection:      {}", collection.name);
    println!("Items reported:  {}", collection.number_of_items);
    println!("With PDF:        {}", collection.item_count());
    println!("Without PDF:     {}", collection.missing_pdf_count());
    println!("Without parent:  {}", orphaned);
    println!(
        "Started:         {}",
        started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Elapsed:         {:.2?}", elapsed);
    if truncated {
        println!("Warning: listing stopped at the page ceiling; results are incomplete");
    }

    if dry_run {
        println!();
        println!("Dry run: metadata cache not written");
        return Ok(());
    }

    let store = session.store();
    if fresh {
        store.destroy().context("Failed to destroy metadata cache")?;
    }
    store.create().context("Failed to create metadata cache")?;

    let written = store
        .upsert_many(&collection.items)
        .context("Failed to write metadata cache")?;

    println!();
    println!("Wrote {} items to {}", written, store.path().display());

    Ok(())
}

/// Resolve and print a single item
async fn show_item(session: &Session, key: &str) -> Result<()> {
    let item = session
        .scanner()?
        .resolve_single(key)
        .await
        .with_context(|| format!("Failed to resolve item {}", key))?;

    println!("{}", item);
    println!();
    println!("Title:     {}", item.title);
    println!("Creators:  {}", item.joined_creators());
    println!("Tags:      {}", item.joined_tags());
    println!("URL:       {}", item.url.as_deref().unwrap_or("-"));
    println!("PDF:       {}", item.pdf_path.display());
    println!("Added:     {}", item.date_added.as_deref().unwrap_or("-"));
    println!("Modified:  {}", item.date_modified.as_deref().unwrap_or("-"));

    if let Some(details) = &item.parent_details {
        println!();
        println!("Parent:    {}", details.key.as_deref().unwrap_or("-"));
        println!("Type:      {}", details.item_type.as_deref().unwrap_or("-"));
        println!("Date:      {}", details.date.as_deref().unwrap_or("-"));
        println!("DOI:       {}", details.doi.as_deref().unwrap_or("-"));
        if !details.collections.is_empty() {
            println!("In:        {}", details.collections.join(", "));
        }
        if let Some(abstract_note) = &details.abstract_note {
            println!();
            println!("{}", abstract_note);
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(session: &Session) -> Result<()> {
    let cfg = session.config();

    println!("zotrag configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Zotero:");
    println!(
        "  Library:            {} {}",
        cfg.zotero.library_type,
        cfg.zotero.library_id.as_deref().unwrap_or("(not set)")
    );
    println!("  API URL:            {}", cfg.zotero.api_url);
    println!(
        "  API key:            {}",
        if cfg.zotero.api_key.is_some() { "set" } else { "(not set)" }
    );
    println!("  Storage root:       {}", cfg.zotero.storage_root.display());
    println!(
        "  Default collection: {}",
        cfg.default_collection().unwrap_or("(not set)")
    );
    println!();
    println!("Metadata cache:       {}", cfg.cache_path.display());
    println!();
    println!("Scan:");
    println!("  Page size:          {}", cfg.scan.page_size);
    println!("  Max pages:          {}", cfg.scan.max_pages);
    println!("  Timeout:            {}s", cfg.scan.timeout_seconds);
    println!("  Retry attempts:     {}", cfg.scan.retry.max_attempts);
    println!();

    print!("Embeddings:           ");
    let embeddings = match cfg.embeddings_settings() {
        Ok(settings) => {
            println!("{} (dimension {})", settings.provider(), settings.dimension());
            Some(settings)
        }
        Err(e) => {
            println!("invalid: {}", e);
            None
        }
    };

    print!("Vector store:         ");
    match embeddings.as_ref().map(|e| cfg.vector_store_settings(e)) {
        Some(Ok(store)) => println!("{} ({})", store.type_name(), store.collection_name()),
        Some(Err(e)) => println!("invalid: {}", e),
        None => println!("(needs valid embeddings)"),
    }

    Ok(())
}

/// Print the creator index of a collection
async fn list_creators(session: &Session, requested: Option<String>) -> Result<()> {
    let collection = select_collection(session, requested).await?;
    let items = session
        .scanner()?
        .scan(&collection.key)
        .await
        .with_context(|| format!("Failed to scan collection {}", collection.key))?;

    let index = creator_index(&items);
    let mut ranked: Vec<_> = index.into_iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));

    for (creator, work) in &ranked {
        println!("{:>4}  {}  [{}]", work.count, creator, work.keys.join(", "));
    }
    println!();
    println!("{} creators across {} items", ranked.len(), items.len());

    Ok(())
}
