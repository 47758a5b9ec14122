//! prepline - OSF preprints → OPS native-XML import pipeline
//!
//! Walks a provider's preprints through the OSF v2 API and produces, per
//! preprint, a native-XML import document, the downloaded files it points
//! at, and the post-import SQL side effects.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod config;
mod runner;

use config::Config;

#[derive(Parser)]
#[command(name = "prepline")]
#[command(about = "OSF preprints to OPS native-XML import pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ./prepline.toml or ~/.config/prepline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Import a provider's preprints
    Import(runner::ImportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = prepline_core::ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --verbose — the progress bar shows activity
    //   non-TTY: info unless --verbose         — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = cli.quiet || (is_tty && !cli.verbose);
    prepline_core::init_logging(quiet, cli.verbose, multi);

    // Load configuration
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    prepline_core::set_http_config(prepline_core::HttpConfig {
        connect_timeout: Duration::from_secs(config.http.connect_timeout),
        request_timeout: Duration::from_secs(config.http.request_timeout),
    });

    match cli.command {
        Command::Import(args) => runner::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["API base URL", &config.api.base_url]);
            table.add_row(vec![
                "API token",
                if config.api.token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec!["Locale", &config.import.locale]);
            table.add_row(vec!["Email template", &config.import.email_template]);
            table.add_row(vec!["Public id", &config.import.public_id.to_string()]);
            table.add_row(vec!["Context", &config.import.context]);
            table.add_row(vec![
                "Platform URL",
                if config.import.platform_url.is_empty() {
                    "not set"
                } else {
                    config.import.platform_url.as_str()
                },
            ]);
            table.add_row(vec![
                "Connect timeout",
                &format!("{}s", config.http.connect_timeout),
            ]);
            table.add_row(vec![
                "Request timeout",
                &format!("{}s", config.http.request_timeout),
            ]);
            table.add_row(vec!["Max attempts", &config.http.max_attempts.to_string()]);
            table.add_row(vec!["Sleep", &format!("{}s", config.http.sleep)]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
