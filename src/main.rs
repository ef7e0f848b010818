use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

use fitment_import::application::use_cases::import_pipeline::{
    ImportPipeline, ImportPipelineConfig,
};
use fitment_import::application::{DictionaryImport, RangeDispatcher};
use fitment_import::domain::error::{AppError, Result};
use fitment_import::infrastructure::config::AppConfig;
use fitment_import::infrastructure::db::repository::CatalogRepository;
use fitment_import::infrastructure::queue::ChannelQueue;
use fitment_import::infrastructure::storage::{FileStorage, LocalFileStorage};

#[derive(Parser)]
#[command(
    name = "fitment-import",
    about = "Chunked vehicle/tyre fitment catalog import worker"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a catalog file into byte-range chunks and import them all
    Import {
        /// File name relative to the storage root, e.g. import/GDY_DE_DE.csv
        file: String,
    },
    /// Print the chunk ranges a file would be dispatched as
    Plan {
        file: String,
    },
    /// Seed the fuel/segment/format dictionary tables
    ImportDictionaries {
        #[arg(long, default_value = "dictionaries/fuel.csv")]
        fuel: String,
        #[arg(long, default_value = "dictionaries/vehicleSegment.csv")]
        segment: String,
        #[arg(long, default_value = "dictionaries/vehicleFormat.csv")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;
    let storage: Arc<dyn FileStorage> =
        Arc::new(LocalFileStorage::new(config.storage_root.clone()));

    match cli.command {
        Command::Plan { file } => {
            let (queue, _rx) = ChannelQueue::new();
            let dispatcher = RangeDispatcher::new(Arc::new(queue), config.chunk_size);
            let size = storage.file_size(&file).await?;
            for range in dispatcher.plan(&file, size) {
                println!("{} [{}, {}]", range.file_name, range.start, range.end);
            }
            Ok(())
        }
        Command::Import { file } => import_file(&config, storage, &file).await,
        Command::ImportDictionaries {
            fuel,
            segment,
            format,
        } => {
            let repository = Arc::new(
                CatalogRepository::connect(&config.database_url, config.max_connections).await?,
            );
            DictionaryImport::new(storage, repository)
                .import(&fuel, &segment, &format)
                .await
        }
    }
}

/// Dispatch the file's ranges onto the in-process queue and drain it with a
/// bounded pool of chunk workers. Chunks are independent: one failing is
/// logged and reported at the end without stopping the others, and re-running
/// the import converges because every write is idempotent.
async fn import_file(config: &AppConfig, storage: Arc<dyn FileStorage>, file: &str) -> Result<()> {
    if !storage.is_file(file).await? {
        return Err(AppError::NotFound(format!("Catalog file {} does not exist", file)));
    }

    let repository = Arc::new(
        CatalogRepository::connect(&config.database_url, config.max_connections).await?,
    );
    let pipeline = Arc::new(ImportPipeline::new(
        storage.clone(),
        repository.clone(),
        repository,
        ImportPipelineConfig {
            lookback_bytes: config.lookback_bytes,
            row_concurrency: config.row_concurrency,
            on_missing_reference: config.on_missing_reference,
        },
    ));

    let (queue, mut rx) = ChannelQueue::new();
    let dispatcher = RangeDispatcher::new(Arc::new(queue), config.chunk_size);
    let size = storage.file_size(file).await?;
    let chunks = dispatcher.dispatch(file, size).await?;
    // The dispatcher owns the only sender; dropping it closes the channel
    // once the workers have drained it.
    drop(dispatcher);

    let mut workers: JoinSet<bool> = JoinSet::new();
    let mut failed = 0usize;
    while let Some(range) = rx.recv().await {
        while workers.len() >= config.worker_concurrency {
            if let Some(joined) = workers.join_next().await {
                if !joined.unwrap_or(false) {
                    failed += 1;
                }
            }
        }
        let pipeline = pipeline.clone();
        workers.spawn(async move {
            match pipeline.process_chunk(&range).await {
                Ok(_) => true,
                Err(e) => {
                    error!(
                        file = %range.file_name,
                        start = range.start,
                        end = range.end,
                        "Chunk failed: {}",
                        e
                    );
                    false
                }
            }
        });
    }
    while let Some(joined) = workers.join_next().await {
        if !joined.unwrap_or(false) {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(AppError::Internal(format!(
            "{} of {} chunks failed, re-run the import to retry them",
            failed, chunks
        )));
    }
    info!(file, chunks, "Import finished");
    Ok(())
}
