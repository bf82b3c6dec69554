mod config;
mod database;
mod entities;
mod fixtures;
mod logging;
mod ports;
mod services;
mod slug;
#[cfg(test)]
mod test_utils;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    database::Database,
    fixtures::{
        format::FixtureFormat,
        importer::{DuplicatePolicy, ImportOptions, ImportStats},
        models::Category,
    },
    logging::setup_logging,
    services::{
        csv_sheets::CsvSheetSource, fixture_build::BuildService, fixture_export::ExportService,
        fixture_import::ImportService,
        slug_repair::SlugRepairService,
        workbook_sheets::{WorkbookSheetSource, is_workbook},
    },
};

const ERROR_PREVIEW: usize = 50;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "VGM_SOURCE_DB_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: warn)
    #[arg(long, default_value = "warn", global = true, env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug", global = true)]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "VGM_SOURCE_DB_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a spreadsheet workbook or CSV exports into fixture files
    Build {
        /// A workbook (.xlsx, .xls, .ods), a CSV file or a directory of CSV files
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the fixture files
        #[arg(short, long, default_value = "fixtures")]
        output_dir: PathBuf,

        #[arg(short, long, value_enum, default_value_t = FixtureFormat::Yaml)]
        format: FixtureFormat,
    },
    /// Load fixture files into the database
    Import {
        /// Directory holding the fixture files
        #[arg(long, default_value = "fixtures", conflicts_with = "file")]
        fixture_dir: PathBuf,

        /// Import a single fixture file instead of a directory
        #[arg(long)]
        file: Option<PathBuf>,

        /// What to do with records whose key already exists
        #[arg(long, value_enum, default_value_t = DuplicatePolicy::Skip)]
        duplicate_handling: DuplicatePolicy,

        /// 0 minimal, 1 errors, 2 duplicates and error preview, 3 everything
        #[arg(short, long, default_value_t = 1)]
        #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
        verbosity: u8,

        /// Write every import error to this file
        #[arg(long)]
        error_file: Option<PathBuf>,

        /// Parse and count records without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Dump the database to fixture files
    Export {
        #[arg(short, long, default_value = "fixtures")]
        output_dir: PathBuf,

        /// Only export one app's collections
        #[arg(long, value_enum)]
        app: Option<Category>,

        #[arg(short, long, value_enum, default_value_t = FixtureFormat::Yaml)]
        format: FixtureFormat,
    },
    /// Recompute game tag slugs from their names
    FixSlugs {
        /// Report the changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

async fn open_database(config: &Config) -> Result<Arc<Database>> {
    log::debug!("Opening database at: {}", config.database_path().display());
    let database = Database::open(&config.database_path()).await?;
    Ok(Arc::new(database))
}

fn print_stats(name: &str, stats: &ImportStats) {
    println!(
        "{}: {} total, {} created, {} updated, {} skipped, {} errors",
        name,
        stats.total,
        stats.created,
        stats.updated,
        stats.skipped,
        stats.errors.len()
    );
}

/// Error file contents: a count header, a rule, then one error per line
fn render_error_file(errors: &[String]) -> String {
    let mut text = format!(
        "Import Errors ({} total)\n{}\n\n",
        errors.len(),
        "=".repeat(80)
    );
    for error in errors {
        text.push_str(error);
        text.push('\n');
    }
    text
}

fn report_errors(
    out: &mut impl Write,
    errors: &[String],
    verbosity: u8,
    error_file: Option<&Path>,
) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    if verbosity >= 2 {
        writeln!(out, "\nErrors:")?;
        for error in errors.iter().take(ERROR_PREVIEW) {
            writeln!(out, "  {}", error)?;
        }
        if errors.len() > ERROR_PREVIEW {
            writeln!(out, "  ... and {} more", errors.len() - ERROR_PREVIEW)?;
        }
    }

    match error_file {
        Some(path) => {
            std::fs::write(path, render_error_file(errors))
                .with_context(|| format!("Failed to write error file: {}", path.display()))?;
            writeln!(
                out,
                "{} error(s) occurred. Details written to: {}",
                errors.len(),
                path.display()
            )?;
        }
        None if verbosity < 2 => writeln!(
            out,
            "{} error(s) occurred. \
             Use --verbosity 2 to see details or --error-file to save to file.",
            errors.len()
        )?,
        None => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let console_level = match &args.command {
        Commands::Import { verbosity, .. } if *verbosity >= 2 => {
            args.log_level.max(log::LevelFilter::Info)
        }
        _ => args.log_level,
    };
    setup_logging(console_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("vgm-source-db starting");
    log::debug!("Loading configuration");

    let config = {
        if let Some(config) = args.config {
            Config::from_file(&config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load vgm-source-db config")?;

    match args.command {
        Commands::Build {
            input,
            output_dir,
            format,
        } => {
            log::debug!("Building fixtures from: {}", input.display());
            let rules = config.classifier.clone();
            let summary = if is_workbook(&input) {
                let source = WorkbookSheetSource::new(input);
                BuildService::new(source, rules).run(&output_dir, format)?
            } else {
                let source = CsvSheetSource::new(input, rules.file_prefix.clone());
                BuildService::new(source, rules).run(&output_dir, format)?
            };

            for (kind, path, count) in &summary.written {
                println!("{}: {} entries -> {}", kind, count, path.display());
            }
            match &summary.skip_report {
                Some(path) => println!(
                    "Skipped {} rows, see {}",
                    summary.skipped,
                    path.display()
                ),
                None => println!("No rows skipped"),
            }
        }
        Commands::Import {
            fixture_dir,
            file,
            duplicate_handling,
            verbosity,
            error_file,
            dry_run,
        } => {
            let options = ImportOptions {
                policy: duplicate_handling,
                verbosity,
            };
            let service = ImportService::new(open_database(&config).await?);
            if dry_run {
                println!("Dry run, nothing will be written");
            }

            let results = match file {
                Some(path) => {
                    let stats = service.import_file(&path, options, dry_run).await?;
                    vec![(path, stats)]
                }
                None => {
                    service
                        .import_directory(&fixture_dir, options, dry_run)
                        .await?
                }
            };

            let mut totals = ImportStats::default();
            for (path, stats) in results {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                print_stats(&name, &stats);
                totals.merge(stats);
            }
            print_stats("Total", &totals);
            report_errors(
                &mut std::io::stdout(),
                &totals.errors,
                verbosity,
                error_file.as_deref(),
            )?;
        }
        Commands::Export {
            output_dir,
            app,
            format,
        } => {
            let service = ExportService::new(open_database(&config).await?);
            let written = service.export(&output_dir, app, format).await?;
            if written.is_empty() {
                println!("Nothing to export");
            }
            for file in written {
                println!(
                    "{}: {} entries -> {}",
                    file.model,
                    file.count,
                    file.path.display()
                );
            }
        }
        Commands::FixSlugs { dry_run } => {
            let service = SlugRepairService::new(open_database(&config).await?);
            let report = service.run(dry_run).await?;
            for change in &report.changes {
                println!("'{}': {} -> {}", change.name, change.old, change.new);
            }
            let verb = if dry_run { "Would update" } else { "Updated" };
            println!(
                "{} {} slugs, {} unchanged",
                verb, report.updated, report.unchanged
            );
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}
