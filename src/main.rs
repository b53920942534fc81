use clap::{Parser, Subcommand};
use pixdrop::artifact::ArtifactGenerator;
use pixdrop::config::{self, Config};
use pixdrop::imaging::RustBackend;
use pixdrop::intake::{IntakeCoordinator, IntakeOutcome};
use pixdrop::ledger::Ledger;
use pixdrop::output;
use pixdrop::publish::{
    Announcer, ClipboardAnnouncer, LogAnnouncer, MemoryStore, ObjectStore, Publisher,
};
use pixdrop::s3::S3Store;
use pixdrop::watch::FolderWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that upload.
#[derive(clap::Args, Clone)]
struct UploadArgs {
    /// Keep uploads in memory and print URLs instead of touching the bucket,
    /// the clipboard or the ledger file
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
#[command(name = "pixdrop")]
#[command(about = "Watch a folder and publish new photos to an S3-compatible bucket")]
#[command(long_about = "\
Watch a folder and publish new photos to an S3-compatible bucket

Each new .jpg/.jpeg/.png is shrunk to fit 1920x1080, re-encoded as JPEG and
uploaded together with a copy carrying a QR code that links to it. The URL of
the QR copy is put on the clipboard.

  watch folder                       bucket
  └── IMG_0042.PNG   ──────▶   5f0c…4a97.jpg       (resized)
                               5f0c…4a97_qr.jpg    (resized + QR → 5f0c…4a97.jpg)

Already-uploaded files are listed in uploaded.json and skipped.

Storage credentials are read from the environment or a .env file:
  R2_ACCOUNT_ID  R2_BUCKET_NAME  R2_ACCESS_KEY_ID  R2_SECRET_ACCESS_KEY
  R2_PUBLIC_URL  R2_ENDPOINT (optional)  WATCH_FOLDER

Run 'pixdrop gen-config' to generate a documented pixdrop.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./pixdrop.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a folder and upload new images until Ctrl-C
    Watch {
        /// Folder to watch (overrides watch.folder / WATCH_FOLDER)
        folder: Option<PathBuf>,
        #[command(flatten)]
        upload: UploadArgs,
    },
    /// Upload the given images once, through the same steps as `watch`
    Process {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        upload: UploadArgs,
    },
    /// List everything recorded in the ledger
    Ledger,
    /// Print a stock pixdrop.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to read .env");
        }
    }

    let load = || config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Watch { folder, upload } => {
            let mut config = load()?;
            if let Some(folder) = folder {
                config.watch.folder = Some(folder);
            }
            let folder = config.watch.require_folder()?.to_path_buf();
            let coordinator = build_coordinator(&config, upload.dry_run)?;
            FolderWatcher::from_config(coordinator, &config.watch)
                .run(&folder)
                .await?;
        }
        Command::Process { files, upload } => {
            let config = load()?;
            let coordinator = build_coordinator(&config, upload.dry_run)?;
            let mut failed = 0;
            for file in &files {
                let outcome = coordinator.handle(file).await;
                if matches!(outcome, IntakeOutcome::Failed(_)) {
                    failed += 1;
                }
                output::print_outcome(file, &outcome);
            }
            if failed > 0 {
                return Err(format!("{} of {} files failed", failed, files.len()).into());
            }
        }
        Command::Ledger => {
            let config = load()?;
            let ledger = Ledger::load(&config.watch.ledger);
            output::print_ledger(&ledger.ids(), ledger.path());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pixdrop=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Wire ledger, generator and publisher from config.
///
/// A dry run keeps objects in memory, prints URLs instead of using the
/// clipboard and never writes the ledger.
fn build_coordinator(
    config: &Config,
    dry_run: bool,
) -> Result<IntakeCoordinator, Box<dyn std::error::Error>> {
    config.storage.validate(dry_run)?;

    let (store, announcer, ledger): (Arc<dyn ObjectStore>, Arc<dyn Announcer>, Ledger) =
        if dry_run {
            info!("dry run: nothing leaves this machine");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(LogAnnouncer),
                Ledger::load_read_only(&config.watch.ledger),
            )
        } else {
            let announcer: Arc<dyn Announcer> = if config.announce.clipboard {
                Arc::new(ClipboardAnnouncer::new())
            } else {
                Arc::new(LogAnnouncer)
            };
            (
                Arc::new(S3Store::from_config(&config.storage)?),
                announcer,
                Ledger::load(&config.watch.ledger),
            )
        };

    let generator = ArtifactGenerator::from_config(Arc::new(RustBackend::new()), config);
    let publisher = Publisher::new(store, announcer, config.storage.public_url.clone());
    Ok(IntakeCoordinator::new(
        Arc::new(ledger),
        Arc::new(generator),
        publisher,
    ))
}
