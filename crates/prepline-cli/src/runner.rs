//! Import subcommand - the per-preprint run loop.
//!
//! Sequential by design: the upstream API is rate-limited and a run is
//! restartable anyway (already-written documents are skipped), so one
//! preprint at a time with a rest in between is the whole concurrency
//! story.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use prepline_core::{
    install_signal_handlers, is_shutdown_requested, run_with_retry, ProgressContext, RetryOutcome,
};
use prepline_native::{
    build_document, document_to_xml, IdentifierKind, ImportDocument, ImportSettings,
};
use prepline_osf::{FileDownload, JsonFetch, OsfClient, Page, PageIterator, Preprint, ResourceGraph};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Provider whose preprints to import (e.g. "engrxiv")
    #[arg(short, long)]
    pub provider: String,

    /// OSF API token (overrides the config file)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = "./out")]
    pub output: PathBuf,

    /// Uploader username; derived from the first author when omitted
    #[arg(short, long)]
    pub user: Option<String>,

    /// Locale stamped on localized fields
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Seconds to rest after each preprint
    #[arg(short, long)]
    pub sleep: Option<u64>,

    /// Retry budget per preprint
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Download supplementary-node files instead of linking to them
    #[arg(long)]
    pub save_supplementary: bool,

    /// Tag the first galley of the first version with the DOI
    #[arg(long)]
    pub galley_doi: bool,

    /// Do not emit the public identifier (breaks the SQL join key)
    #[arg(long)]
    pub no_public_id: bool,

    /// OPS context path the SQL statements target
    #[arg(long)]
    pub context: Option<String>,

    /// Public platform base URL, for the redirect statements
    #[arg(long)]
    pub platform_url: Option<String>,
}

#[derive(Debug, Default)]
struct RunStats {
    processed: u64,
    skipped: u64,
    failed: u64,
}

struct OutputPaths {
    xml: PathBuf,
    sql: PathBuf,
    submissions: PathBuf,
    commands: PathBuf,
}

impl OutputPaths {
    fn create(output: &Path) -> Result<Self> {
        let paths = Self {
            xml: output.join("xml"),
            sql: output.join("sql"),
            submissions: output.join("submissions"),
            commands: output.join("commands.sh"),
        };
        for dir in [&paths.xml, &paths.sql, &paths.submissions] {
            fs::create_dir_all(dir)
                .with_context(|| format!("create output directory {}", dir.display()))?;
        }
        Ok(paths)
    }

    fn xml_file(&self, slug: &str) -> PathBuf {
        self.xml.join(format!("{slug}.xml"))
    }
}

pub fn run(args: ImportArgs, config: &Config, progress: &ProgressContext) -> Result<ExitCode> {
    let token = args
        .token
        .clone()
        .or_else(|| config.api.token.clone())
        .context("no API token configured (use --token or the [api] token setting)")?;
    let client = OsfClient::new(&config.api.base_url, &token);
    let settings = ImportSettings {
        uploader: args.user.clone().filter(|u| !u.is_empty()),
        locale: args
            .locale
            .clone()
            .unwrap_or_else(|| config.import.locale.clone()),
        email_template: config.import.email_template.clone(),
        include_public_id: config.import.public_id && !args.no_public_id,
        save_supplementary: args.save_supplementary,
        galley_doi: args.galley_doi,
    };
    let context = args
        .context
        .clone()
        .unwrap_or_else(|| config.import.context.clone());
    let platform_url = args
        .platform_url
        .clone()
        .unwrap_or_else(|| config.import.platform_url.clone());
    let rest = Duration::from_secs(args.sleep.unwrap_or(config.http.sleep));
    let max_attempts = args.max_attempts.unwrap_or(config.http.max_attempts);

    let paths = OutputPaths::create(&args.output)?;
    install_signal_handlers().context("install signal handlers")?;

    // Page one is fetched eagerly so the total is known before iterating
    let listing_url = client.preprints_url(&args.provider)?;
    let first_page = client
        .get_value(&listing_url)
        .map_err(anyhow::Error::new)
        .context("fetch the initial preprint listing")?;
    let first_page: Page<Preprint> =
        serde_json::from_value(first_page).context("decode the initial preprint listing")?;
    let total = first_page.total().unwrap_or(first_page.data.len() as u64);
    log::info!(
        "importing {total} preprints from provider \"{}\"",
        args.provider
    );

    let bar = progress.run_bar(total);
    let mut stats = RunStats::default();
    for preprint in PageIterator::from_page(&client, first_page) {
        // Checked between preprints only; a preprint in flight finishes
        if is_shutdown_requested() {
            bar.abandon();
            log::warn!("shutdown requested, stopping");
            print_summary(progress, &stats);
            return Ok(ExitCode::from(130));
        }
        let preprint = preprint
            .map_err(anyhow::Error::new)
            .context("fetch the preprint listing")?;
        bar.set_message(preprint.id.clone());

        let outcome = import_preprint(
            &client,
            &preprint,
            &settings,
            &paths,
            max_attempts,
            &context,
            &platform_url,
        );
        match outcome {
            ImportOutcome::Skipped => {
                stats.skipped += 1;
                bar.inc(1);
                continue;
            }
            ImportOutcome::Processed(command) => {
                stats.processed += 1;
                if let Some(command) = command {
                    append_command(&paths.commands, &command)?;
                }
            }
            ImportOutcome::Failed => stats.failed += 1,
        }
        bar.inc(1);
        std::thread::sleep(rest);
    }
    bar.finish_and_clear();
    print_summary(progress, &stats);

    Ok(if stats.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

enum ImportOutcome {
    Skipped,
    Processed(Option<String>),
    Failed,
}

/// One preprint, end to end: an already-written document short-circuits
/// without touching the network, everything else goes through the retry
/// budget.
fn import_preprint<F: JsonFetch + FileDownload>(
    client: &F,
    preprint: &Preprint,
    settings: &ImportSettings,
    paths: &OutputPaths,
    max_attempts: u32,
    context: &str,
    platform_url: &str,
) -> ImportOutcome {
    let slug = sanitize_id(&preprint.id);
    if paths.xml_file(&slug).exists() {
        log::info!("preprint \"{}\" already imported, skipping", preprint.id);
        return ImportOutcome::Skipped;
    }

    let label = format!("preprint \"{}\"", preprint.id);
    let outcome = run_with_retry(&label, max_attempts, || {
        process_preprint(client, preprint, settings, paths, &slug, context, platform_url)
    });
    match outcome {
        RetryOutcome::Succeeded(command) => ImportOutcome::Processed(command),
        // Already logged by the retry machinery; the batch goes on
        RetryOutcome::Exhausted(_) | RetryOutcome::Fatal(_) => ImportOutcome::Failed,
    }
}

/// Fetch, transform and persist one preprint. Returns the replay command
/// for `commands.sh`, when the document has an author to run it as.
fn process_preprint<F: JsonFetch + FileDownload>(
    client: &F,
    preprint: &Preprint,
    settings: &ImportSettings,
    paths: &OutputPaths,
    slug: &str,
    context: &str,
    platform_url: &str,
) -> Result<Option<String>> {
    let graph = ResourceGraph::new(client, preprint).load(settings.save_supplementary)?;
    let document = build_document(preprint, &graph, settings)?;

    download_files(client, &document, &paths.submissions.join(slug))?;

    let sql_path = paths.sql.join(format!("{slug}.sql"));
    fs::write(
        &sql_path,
        side_effects(&document, &preprint.id, context, platform_url),
    )
    .with_context(|| format!("write {}", sql_path.display()))?;

    // Written last: its presence marks the preprint as done
    let xml_path = paths.xml_file(slug);
    let xml = document_to_xml(&document)?;
    fs::write(&xml_path, xml).with_context(|| format!("write {}", xml_path.display()))?;

    Ok(prepline_sql::import_command(&document, &xml_path, context))
}

/// Download every file node into the preprint's sink directory. Files
/// already on disk are kept, so a retried preprint does not re-download.
fn download_files<F: FileDownload>(client: &F, document: &ImportDocument, dir: &Path) -> Result<()> {
    if document.submission_files.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    for file in &document.submission_files {
        let Some(url) = &file.download_url else {
            log::debug!("file node {} has no download link", file.local_id);
            continue;
        };
        let dest = dir.join(&file.href_src);
        if dest.exists() {
            continue;
        }
        client
            .download(url, &dest)
            .map_err(anyhow::Error::new)
            .with_context(|| format!("download {}", dest.display()))?;
    }
    Ok(())
}

/// All SQL fragments for one preprint, in execution order.
fn side_effects(
    document: &ImportDocument,
    preprint_id: &str,
    context: &str,
    platform_url: &str,
) -> String {
    let today = chrono::Local::now().date_naive();
    let mut parts = prepline_sql::users(document, preprint_id, context);
    parts.push(prepline_sql::link_users(preprint_id));
    parts.extend(prepline_sql::download_statistics(
        document,
        preprint_id,
        today,
    ));
    if !platform_url.is_empty() {
        parts.push(prepline_sql::redirection(preprint_id, platform_url));
    }
    let doi = document
        .first_publication()
        .and_then(|p| p.identifiers.iter().find(|i| i.kind == IdentifierKind::Doi));
    if let Some(doi) = doi {
        parts.push(prepline_sql::publication_relation(preprint_id, &doi.value));
    }
    let mut sql = parts.join("\n\n");
    sql.push('\n');
    sql
}

fn append_command(path: &Path, command: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    writeln!(file, "{command}").with_context(|| format!("append to {}", path.display()))?;
    Ok(())
}

/// Filesystem-safe rendering of a preprint id.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn print_summary(progress: &ProgressContext, stats: &RunStats) {
    if progress.is_tty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Import").fg(Color::Cyan),
                Cell::new("Preprints").fg(Color::Cyan),
            ]);
        table.add_row(vec!["Processed", &stats.processed.to_string()]);
        table.add_row(vec!["Skipped", &stats.skipped.to_string()]);
        table.add_row(vec!["Failed", &stats.failed.to_string()]);
        eprintln!("\n{table}");
    } else {
        log::info!(
            "finished: {} processed, {} skipped, {} failed",
            stats.processed,
            stats.skipped,
            stats.failed
        );
    }
}
