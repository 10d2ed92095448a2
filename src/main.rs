use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod chat;
mod cli;
mod commands;
mod config;
mod persona;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chronopersona")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("chronopersona.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.level_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Init { force } => commands::init::run(force, &config),
        Commands::Session { user } => commands::session::run(&user, &config),
        Commands::Send { user, message } => commands::session::send(&user, &message.join(" "), &config),
        Commands::Prompt { user } => commands::prompt::run(&user, &config),
        Commands::Templates { format } => commands::templates::list(cli::OutputFormat::resolve(format), &config),
        Commands::Use { user, template } => commands::templates::select(&user, &template, &config),
        Commands::Traits { user, format } => commands::traits::show(&user, cli::OutputFormat::resolve(format), &config),
        Commands::Reset { user } => commands::traits::reset(&user, &config),
        Commands::Analyze { text, format } => {
            commands::analyze::run(&text.join(" "), cli::OutputFormat::resolve(format), &config)
        }
        Commands::Prune { max_age_days, dry_run } => commands::traits::prune(max_age_days, dry_run, &config),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level).context("Failed to setup logging")?;

    info!("Starting chronopersona with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
