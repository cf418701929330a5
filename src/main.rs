use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fillaridata::{
    Config, Datafile, FillariError, FmiClient, ListingError, Source, UpdateOptions,
    UpdatePipeline,
};
use log::warn;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fillaridata", version, about = "Maintains the Fillariennustin dataset")]
struct Cli {
    /// Data file holding the accumulated dataset.
    #[arg(long, global = true, default_value = "data.parquet")]
    file: PathBuf,

    /// Configuration file; defaults to ~/.fillaridata/main.conf.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch source files newer than the data file's last entry and append
    /// them, enriched with weather observations.
    Update {
        /// Source-file listing to read from.
        #[arg(long, default_value = "http://dev.hsl.fi/tmp/citybikes/")]
        source: String,

        /// Earliest source-file timestamp to include (RFC 3339).
        #[arg(long)]
        first: Option<DateTime<Utc>>,

        /// Stop after this many source files; 0 means no limit.
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Source files processed and persisted per batch.
        #[arg(long, default_value_t = 500)]
        batch: usize,
    },
    /// Print row count and time range of the data file.
    Info,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if exits_cleanly(&e) => {
            // A source with no recognizable filenames means there is nothing
            // to fetch, not that the run went wrong.
            println!("{e}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn exits_cleanly(e: &FillariError) -> bool {
    matches!(
        e,
        FillariError::Listing(ListingError::NoMatchingFilenames { .. })
    )
}

async fn run(cli: Cli) -> Result<(), FillariError> {
    let mut datafile = Datafile::new(&cli.file);

    match cli.command {
        Command::Update {
            source,
            first,
            limit,
            batch,
        } => {
            let source = Source::parse(&source)?;
            let api_key = load_api_key(cli.config.as_ref())?;
            if api_key.is_none() {
                warn!("no FMI API key configured, weather enrichment will fail");
            }
            let weather = FmiClient::new(api_key);

            let options = UpdateOptions::builder()
                .maybe_first(first)
                .limit(limit)
                .batch_size(batch)
                .build();

            let pipeline = UpdatePipeline::new();
            let summary = pipeline
                .run(&source, &mut datafile, &weather, &options)
                .await?;

            if summary.is_empty() {
                println!("No new data found.");
            } else {
                println!(
                    "Appended {} rows in {} batches ({} source files failed).",
                    summary.rows_appended, summary.batches, summary.files_failed
                );
            }
        }
        Command::Info => {
            let info = datafile.info()?;
            println!("file:  {}", datafile.path().display());
            println!("rows:  {}", info.rows);
            match (info.first, info.last) {
                (Some(first), Some(last)) => {
                    println!("first: {first}");
                    println!("last:  {last}");
                }
                _ => println!("the data file holds no rows yet"),
            }
        }
    }

    Ok(())
}

fn load_api_key(explicit: Option<&PathBuf>) -> Result<Option<String>, FillariError> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => match Config::default_path() {
            Some(path) => path,
            None => return Ok(None),
        },
    };
    let config = Config::open(&path)?;
    Ok(config.fmi_api_key())
}
