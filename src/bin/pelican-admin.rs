use anyhow::Result;
use clap::{Parser, Subcommand};
use pelican::config::Config;
use pelican::humanize::format_bytes;
use pelican::storage::{SqliteStorage, Storage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pelican-admin")]
#[command(about = "Pelican upload management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored uploads
    List {
        /// Maximum number of rows to show
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Show aggregate statistics
    Stats,
    /// Delete an upload by short code
    Delete {
        /// The short code to remove
        short_code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> =
        Arc::new(SqliteStorage::new(&config.database.url, 5).await?);

    storage.init().await?;

    match cli.command {
        Commands::List { limit } => {
            let records = storage.list(limit, 0).await?;
            if records.is_empty() {
                println!("No uploads found.");
            } else {
                println!(
                    "{:<10} {:<32} {:<12} {:<8} {}",
                    "Code", "Original name", "Size", "Hits", "Uploaded"
                );
                println!("{}", "-".repeat(90));
                for record in records {
                    println!(
                        "{:<10} {:<32} {:<12} {:<8} {}",
                        record.short_code,
                        record.original_name,
                        format_bytes(record.size as u64),
                        record.access_count,
                        record.uploaded_at
                    );
                }
            }
        }
        Commands::Stats => {
            let stats = storage.aggregate_stats().await?;
            println!("Uploads:        {}", stats.count);
            println!("Total size:     {}", format_bytes(stats.total_size as u64));
            println!("Total accesses: {}", stats.total_access);
            println!("Average size:   {}", format_bytes(stats.average_size as u64));
        }
        Commands::Delete { short_code } => {
            let record = storage.find_by_code(&short_code).await?;
            let deleted = storage.delete(&short_code).await?;
            if deleted {
                if let Some(record) = record {
                    let path =
                        std::path::Path::new(&config.upload.dir).join(&record.filename);
                    if let Err(err) = tokio::fs::remove_file(&path).await {
                        eprintln!("⚠ Record removed but file unlink failed: {err}");
                    }
                }
                println!("✓ Deleted '{}'", short_code);
            } else {
                println!("⚠ No upload with short code '{}'", short_code);
            }
        }
    }

    Ok(())
}
