mod error;
mod logging;
mod models;
mod provider;
mod report;
mod store;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use models::{Config, ReportRequest};
use provider::DataProvider;
use std::io;
use std::path::{Path, PathBuf};
use store::Store;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "credit-report.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("credit-report")
        .version("0.1")
        .about("Reports students who earned a minimum number of credits within a date range")
        .long_about(
            "Reads six lines from standard input: student PINs (comma-separated, may be empty), \
             minimum credit, start date, end date, output format (csv, html, anything else for both) \
             and output directory.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .value_name("URL")
                .help("Database URL, overrides the configuration file and DATABASE_URL"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .get_matches();

    dotenvy::dotenv().ok();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_FILE);

    let created_config = !Path::new(config_file).exists();
    let mut config = if created_config {
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        default_config
    } else {
        Config::load_from_file(config_file)?
    };
    config.apply_env();
    if let Some(url) = matches.get_one::<String>("database-url") {
        config.database_url = url.clone();
    }

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        config.log_level.as_str()
    };
    logging::init_logging(level)?;

    if created_config {
        info!(path = config_file, "Created default configuration file");
    } else {
        info!(path = config_file, "Loaded configuration");
    }

    let request = ReportRequest::read_from(io::stdin().lock())?;
    for path in run(&config, &request).await? {
        println!("{}", path.display());
    }

    Ok(())
}

/// One report run: query once, release the database, then write the requested reports.
async fn run(config: &Config, request: &ReportRequest) -> Result<Vec<PathBuf>> {
    let store = Store::connect(&config.database_url, config.run_migrations)
        .await
        .with_context(|| format!("Failed to open database: {}", config.database_url))?;

    let students = DataProvider::new(&store)
        .get_students(
            Some(request.pins.as_str()),
            request.minimum_credit,
            &request.start_date,
            &request.end_date,
        )
        .await;
    store.close().await;
    let students = students.context("Failed to select qualifying students")?;

    let mut written = Vec::new();
    for writer in report::writers_for(request.output_format) {
        let path = writer
            .write(&students, &request.output_directory)
            .with_context(|| {
                format!(
                    "Failed to write {} into {}",
                    writer.file_name(),
                    request.output_directory.display()
                )
            })?;
        info!(path = %path.display(), students = students.len(), "Report written");
        written.push(path);
    }

    Ok(written)
}
