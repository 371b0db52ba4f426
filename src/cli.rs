//! The command line interface for the program.
use crate::input::load_dataset;
use crate::log;
use crate::report::DemandReport;
use crate::settings::Settings;
use crate::snapshot::DemandSnapshot;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for commands which read the catalog document
#[derive(Args, Default)]
pub struct DataOpts {
    /// Path to the catalog document (defaults to `data_file` in the settings file)
    #[arg(short, long)]
    pub data: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Report an asset's energy demand and how much of it is offset by its output.
    Report {
        /// Name of the asset (case-insensitive).
        name: String,
        /// Catalog options
        #[command(flatten)]
        opts: DataOpts,
    },
    /// Validate a catalog document.
    Validate {
        /// Catalog options
        #[command(flatten)]
        opts: DataOpts,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Report { name, opts } => handle_report_command(&name, &opts, None),
            Self::Validate { opts } => handle_validate_command(&opts, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ energy-offset --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided, and initialise the logger
fn load_settings_and_init_logger(settings: Option<Settings>) -> Result<Settings> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    log::init(&settings.log_level).context("Failed to initialise logging.")?;

    Ok(settings)
}

/// Work out which catalog document to use
fn get_data_path<'a>(opts: &'a DataOpts, settings: &'a Settings) -> Result<&'a Path> {
    opts.data
        .as_deref()
        .or(settings.data_file.as_deref())
        .context("No catalog document given. Pass --data or set data_file in the settings file.")
}

/// Load the catalog document and precompute demand for all assets
fn load_snapshot(data_path: &Path) -> Result<DemandSnapshot> {
    let dataset = load_dataset(data_path).context("Failed to load catalog.")?;
    Ok(DemandSnapshot::new(dataset))
}

/// Convert a report to JSON, keeping its field order
pub fn render_report(report: &DemandReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };

    Ok(json)
}

/// Handle the `report` command.
pub fn handle_report_command(
    name: &str,
    opts: &DataOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings_and_init_logger(settings)?;
    let snapshot = load_snapshot(get_data_path(opts, &settings)?)?;

    let report = snapshot.report(name)?;
    println!("{}", render_report(&report, settings.pretty)?);

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(opts: &DataOpts, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings_and_init_logger(settings)?;
    let data_path = get_data_path(opts, &settings)?;
    let snapshot = load_snapshot(data_path)?;

    let dataset = snapshot.dataset();
    info!(
        "Loaded {} assets, {} association records and {} output records from {}",
        dataset.assets.len(),
        dataset.associations.len(),
        dataset.output.len(),
        data_path.display()
    );
    info!("Catalog validation successful!");

    Ok(())
}
