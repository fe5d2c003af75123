use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use grid_core::constants::{DEFAULT_DATA_DIR, DEFAULT_EXPORT_FILE_NAME, DEFAULT_STORAGE_KEY};
use grid_core::{
    export, validate_str, Confirm, CoreConfig, GridSession, GridStore, Importer, LocalGridStore,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grid")]
#[command(about = "Census grid maker CLI")]
struct Cli {
    /// Directory holding the local grid document
    #[arg(long, env = "GRID_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,
    /// File stem of the local grid document
    #[arg(long, env = "GRID_STORAGE_KEY", default_value = DEFAULT_STORAGE_KEY, global = true)]
    storage_key: String,
    /// Name used for exported files
    #[arg(long, env = "GRID_EXPORT_NAME", default_value = DEFAULT_EXPORT_FILE_NAME, global = true)]
    export_name: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a grid file and print the warnings an import would log
    Validate {
        /// JSON file to check
        file: PathBuf,
    },
    /// Import a grid file, replacing the current grid and layout
    Import {
        /// JSON file to import; only the first is used
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Export the grid as canonical JSON
    Export {
        /// Output file, or a directory to write the configured export name into
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only export these locations (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,
    },
    /// Show filled and total locations, and patients per team
    Census,
    /// Edit the location layout
    Layout {
        #[command(subcommand)]
        command: LayoutCommands,
    },
    /// Delete the locally stored grid
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LayoutCommands {
    /// Add a location at the end of the layout
    Add { location: String },
    /// Remove a location and its data
    Remove {
        location: String,
        #[arg(long)]
        yes: bool,
    },
    /// Rename a location; the data it holds is cleared
    Rename {
        from: String,
        to: String,
        #[arg(long)]
        yes: bool,
    },
    /// Clear the data held at a location
    Clear {
        location: String,
        #[arg(long)]
        yes: bool,
    },
}

/// Asks on stdin unless `--yes` was given.
struct StdinConfirm {
    assume_yes: bool,
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grid_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::new(cli.data_dir, cli.storage_key, &cli.export_name)?;

    let Some(command) = cli.command else {
        println!("Use 'grid --help' for commands");
        return Ok(());
    };

    match command {
        Commands::Validate { file } => validate_file(&file),
        Commands::Import { files, yes } => import_files(&cfg, &files, yes).await,
        Commands::Export { out, locations } => export_grid(&cfg, out, &locations),
        Commands::Census => show_census(&cfg),
        Commands::Layout { command } => edit_layout(&cfg, command),
        Commands::Reset { yes } => reset(&cfg, yes),
    }
}

async fn import_files(cfg: &CoreConfig, files: &[PathBuf], yes: bool) -> anyhow::Result<()> {
    let local = LocalGridStore::open(cfg)?;
    let mut importer = Importer::new();
    if !importer.load(files).await {
        bail!(importer
            .user_message()
            .unwrap_or("Nothing was imported."));
    }
    let Some(staged) = importer.staged() else {
        bail!("Nothing was imported.");
    };
    let prompt = format!(
        "Replace the current grid with {} locations from {}?",
        staged.document.grid_data.len(),
        staged.source.display()
    );
    if !(StdinConfirm { assume_yes: yes }).confirm(&prompt) {
        importer.cancel();
        println!("Import cancelled.");
        return Ok(());
    }
    let committed = importer.confirm(&local)?;
    println!("Imported {} locations.", committed.len());
    Ok(())
}

fn export_grid(cfg: &CoreConfig, out: Option<PathBuf>, locations: &[String]) -> anyhow::Result<()> {
    let grid = LocalGridStore::open(cfg)?.read()?;
    let settings = grid.settings.as_ref();
    let elements = if locations.is_empty() {
        grid.grid_data
    } else {
        export::select(&grid.grid_data, locations)
    };
    let text = export::serialize_document(&elements, settings)?;
    match out {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(export::export_file_name(settings, cfg.export_file_name()).as_str())
            } else {
                path
            };
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported {} locations to {}", elements.len(), path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn show_census(cfg: &CoreConfig) -> anyhow::Result<()> {
    let census = LocalGridStore::open(cfg)?.read()?.census;
    println!("Filled: {}/{}", census.filled, census.total);
    for (team, count) in &census.teams {
        println!("  {team}: {count}");
    }
    Ok(())
}

fn edit_layout(cfg: &CoreConfig, command: LayoutCommands) -> anyhow::Result<()> {
    let mut session = GridSession::new(Arc::new(LocalGridStore::open(cfg)?));
    match command {
        LayoutCommands::Add { location } => {
            let element = session.add_location(&location)?;
            println!("Added location {}", element.location);
        }
        LayoutCommands::Remove { location, yes } => report(
            session.remove_location(&location, &mut StdinConfirm { assume_yes: yes })?,
            &format!("Removed location {location}"),
        ),
        LayoutCommands::Rename { from, to, yes } => report(
            session.rename_location(&from, &to, &mut StdinConfirm { assume_yes: yes })?,
            &format!("Renamed location {from} to {to}"),
        ),
        LayoutCommands::Clear { location, yes } => report(
            session.clear_location(&location, &mut StdinConfirm { assume_yes: yes })?,
            &format!("Cleared location {location}"),
        ),
    }
    Ok(())
}

fn reset(cfg: &CoreConfig, yes: bool) -> anyhow::Result<()> {
    let local = Arc::new(LocalGridStore::open(cfg)?);
    let mut session = GridSession::new(local.clone());
    report(
        session.clear_local_storage(&local, &mut StdinConfirm { assume_yes: yes })?,
        &format!("Removed {}", local.path().display()),
    );
    Ok(())
}

fn validate_file(file: &Path) -> anyhow::Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let validated = validate_str(&text)?;
    println!(
        "{}: {} locations, {} warnings",
        file.display(),
        validated.cleaned.grid_data.len(),
        validated.warnings.len()
    );
    for warning in &validated.warnings {
        println!("  {warning}");
    }
    Ok(())
}

fn report(done: bool, message: &str) {
    if done {
        println!("{message}");
    } else {
        println!("Cancelled.");
    }
}
