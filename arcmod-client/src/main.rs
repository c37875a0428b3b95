use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

use arc_patch::{PatchSession, SessionConfig, SlotStatus};

#[derive(Parser)]
#[command(
    name = "arcmod",
    about = "Batch installer for archive slot patches",
    version,
    long_about = "Overlays replacement assets onto fixed-size slots of a packed game \
                  archive, keeping a per-slot backup so every change can be reversed."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// The packed archive to patch in place
    #[arg(short, long, global = true, default_value = "data.arc")]
    archive: PathBuf,

    /// Directory for per-slot backup records
    #[arg(short, long, global = true, default_value = "backups")]
    backups: PathBuf,

    /// Offset database mapping asset paths to slot locations
    #[arg(short, long, global = true)]
    offsets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install every resolvable file under the given mod trees
    Install {
        /// Mod tree roots to walk
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Restore patched slots under the given mod trees from backup
    Uninstall {
        /// Mod tree roots to walk
        #[arg(required = true)]
        roots: Vec<PathBuf>,
    },
    /// Restore every slot with a backup record, ignoring mod trees
    RestoreAll,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .init();

    match run(cli) {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut session = PatchSession::open(SessionConfig {
        archive_path: cli.archive,
        backups_dir: cli.backups,
        offsets_path: cli.offsets,
    })?;

    let report = match cli.command {
        Commands::Install { roots } => session.install(&roots)?,
        Commands::Uninstall { roots } => session.uninstall(&roots)?,
        Commands::RestoreAll => session.restore_all()?,
    };

    for (path, status) in &report.outcomes {
        match status {
            SlotStatus::Installed { offset } => {
                println!("installed  {} -> {offset:#x}", path.display());
            }
            SlotStatus::Restored { offset } => {
                println!("restored   {offset:#x} ({})", path.display());
            }
            SlotStatus::Skipped => {
                println!("skipped    {} (no resolvable offset)", path.display());
            }
            SlotStatus::NoBackup { offset } => {
                println!("no backup  {offset:#x} ({})", path.display());
            }
            SlotStatus::Failed { error, .. } => {
                println!("failed     {}: {error}", path.display());
            }
        }
    }
    println!(
        "{} installed, {} restored, {} skipped, {} failed",
        report.installed(),
        report.restored(),
        report.skipped(),
        report.failed()
    );

    Ok(report.is_clean())
}
