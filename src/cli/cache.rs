//! Metadata cache subcommands.

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use crate::metastore::{Listing, MetaStore};

/// Cache-related subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Create the cache database and table if missing
    Create,

    /// Delete the cache database and its directory
    Destroy {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// List cached items
    List {
        /// Print a table instead of one block per item
        #[arg(long)]
        table: bool,
    },

    /// List items not yet embedded
    Pending,

    /// Mark items as embedded
    Mark {
        /// Item keys
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

pub fn execute(store: &MetaStore, command: CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Create => {
            store.create().context("Failed to create metadata cache")?;
            println!("Metadata cache ready: {}", store.path().display());
        }
        CacheCommands::Destroy { yes } => {
            if !yes {
                bail!(
                    "Refusing to delete {} without --yes",
                    store.path().display()
                );
            }
            store.destroy().context("Failed to destroy metadata cache")?;
            println!("Removed {}", store.path().display());
        }
        CacheCommands::List { table } => list(store, table)?,
        CacheCommands::Pending => {
            let pending = store.pending().context("Failed to read metadata cache")?;
            if pending.is_empty() {
                println!("Nothing pending.");
            }
            for record in &pending {
                println!("{}  {}", record.key, record.title);
            }
        }
        CacheCommands::Mark { keys } => {
            let updated = store
                .mark_embedded(&keys)
                .context("Failed to update metadata cache")?;
            println!("Marked {} of {} keys as embedded", updated, keys.len());
        }
    }

    Ok(())
}

fn list(store: &MetaStore, as_table: bool) -> Result<()> {
    let listing = store
        .read_all(as_table)
        .context("Failed to read metadata cache")?;

    match listing {
        Listing::Table(table) => print!("{}", table.render()),
        Listing::Records(records) => {
            for record in &records {
                println!("{}", record.key);
                println!("  Title:    {}", record.title);
                println!("  Creators: {}", crate::domain::join_set(&record.creators));
                println!("  Tags:     {}", crate::domain::join_set(&record.tags));
                println!("  URL:      {}", record.url.as_deref().unwrap_or("-"));
                println!("  Path:     {}", record.path.display());
                println!("  Parent:   {}", if record.parent_item.is_some() { "yes" } else { "no" });
                println!("  Embedded: {}", record.embedded);
                println!();
            }
            println!("{} items", records.len());
        }
    }

    Ok(())
}
