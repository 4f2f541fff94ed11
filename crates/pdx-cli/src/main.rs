//! CLI entry point for pdfdex.
//!
//! Catalogs dated PDFs found on a network share and lists them.
//!
//! # Usage
//!
//! ```bash
//! pdfdex [OPTIONS] <COMMAND>
//!
//! # Incremental scan of the last two hours
//! pdfdex --root /mnt/pdfs scan --since 120
//!
//! # Preview today's documents without touching the catalog
//! pdfdex --root /mnt/pdfs scan --today --dry
//!
//! # Rescan on every PDF change
//! pdfdex --config pdfdex.json watch
//!
//! # Newest documents from January 2026 whose name contains "1254"
//! pdfdex list --year 2026 --month 1 --search 1254
//! ```
//!
//! A scan that finds another scan holding the lease exits with status 75
//! (`EX_TEMPFAIL`) so schedulers can retry.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use pdx_catalog::{Catalog, CatalogQuery, SqliteCatalog};
use pdx_core::{CatalogEntry, Config};
use pdx_scanner::{ScanError, ScanItem, ScanReport, ScanRequest, Scanner};
use pdx_watcher::{FileWatcher, PdfFilter};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for "busy, retry later" (sysexits `EX_TEMPFAIL`).
const EXIT_TEMPFAIL: u8 = 75;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Catalogs dated PDFs from a network share.
///
/// Dates are inferred from the directory names the files live under, either
/// `YYYY/MM/DD` or the Spanish `"<MES> <AÑO>"` / `"<día> <MES>"` layout.
#[derive(Parser)]
#[command(name = "pdfdex", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Root of the shared PDF tree (overrides `scan.root`).
    #[arg(short, long, global = true, env = "PDFDEX_ROOT")]
    root: Option<Utf8PathBuf>,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "PDFDEX_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// SQLite catalog file (overrides `catalog.path`).
    #[arg(long, global = true, env = "PDFDEX_CATALOG")]
    catalog: Option<Utf8PathBuf>,

    /// Scan lease file (overrides `lock.path`).
    #[arg(long, global = true, env = "PDFDEX_LOCK")]
    lock: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the share and upsert dated PDFs into the catalog.
    Scan(ScanArgs),

    /// Watch the share and rescan recent changes as PDFs arrive.
    Watch {
        /// Look-back window of each triggered scan, in minutes.
        #[arg(long, value_name = "MINUTES")]
        since: Option<u32>,

        /// Debounce window in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// List cataloged PDFs, newest first.
    List(ListArgs),

    /// Show catalog size and the last completed sync.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Filters for `scan`.
#[derive(Args)]
struct ScanArgs {
    /// Only catalog documents dated in this year.
    #[arg(long)]
    year: Option<i32>,

    /// Only consider files changed in the last N minutes.
    #[arg(long, value_name = "MINUTES")]
    since: Option<u32>,

    /// Only consider today's documents (takes precedence over --since).
    #[arg(long)]
    today: bool,

    /// Print what would be cataloged without writing.
    #[arg(long)]
    dry: bool,

    /// Re-index the whole share, ignoring --since and --today.
    #[arg(long)]
    full: bool,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl ScanArgs {
    fn request(&self) -> ScanRequest {
        ScanRequest {
            full_scan: self.full,
            year: self.year,
            since_minutes: self.since,
            today_only: self.today,
            dry_run: self.dry,
        }
    }
}

/// Filters for `list`.
#[derive(Args)]
struct ListArgs {
    /// Documents from this year.
    #[arg(long)]
    year: Option<i32>,

    /// Documents from this month (1-12).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Documents from this day of the month (1-31).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
    day: Option<u32>,

    /// Case-insensitive substring of the file name.
    #[arg(short, long)]
    search: Option<String>,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Documents per page.
    #[arg(long, default_value_t = pdx_catalog::query::DEFAULT_PER_PAGE)]
    limit: usize,

    /// Print the page as JSON.
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    fn query(&self) -> CatalogQuery {
        let mut query = CatalogQuery::new().page(self.page).per_page(self.limit);
        if let Some(year) = self.year {
            query = query.year(year);
        }
        if let Some(month) = self.month {
            query = query.month(month);
        }
        if let Some(day) = self.day {
            query = query.day(day);
        }
        if let Some(search) = &self.search {
            query = query.search(search.as_str());
        }
        query
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose`, or
/// `info`. Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,globset=warn,ignore=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the optional config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).wrap_err_with(|| format!("failed to load config {path}"))?
        }
        None => Config::default(),
    };

    if let Some(root) = &cli.root {
        config.scan.root.clone_from(root);
    }
    if let Some(catalog) = &cli.catalog {
        config.catalog.path.clone_from(catalog);
    }
    if let Some(lock) = &cli.lock {
        config.lock.path.clone_from(lock);
    }

    Ok(config)
}

fn open_catalog(config: &Config) -> color_eyre::Result<SqliteCatalog> {
    SqliteCatalog::open(&config.catalog.path)
        .wrap_err_with(|| format!("failed to open catalog {}", config.catalog.path))
}

fn create_scanner(config: &Config) -> color_eyre::Result<Scanner> {
    let scanner = Scanner::new(config.scan.clone())
        .wrap_err("failed to create scanner")?
        .with_lock(&config.lock);
    Ok(scanner)
}

/// Maps a busy lease to the temp-fail exit status, telling the user when to
/// retry.
fn busy_exit(err: &ScanError, out: &mut impl Write) -> std::io::Result<Option<ExitCode>> {
    let Some(retry_after) = err.retry_after() else {
        return Ok(None);
    };
    writeln!(
        out,
        "another scan is running, retry in {}s",
        retry_after.as_secs()
    )?;
    Ok(Some(ExitCode::from(EXIT_TEMPFAIL)))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one scan, or a dry run that prints what would be cataloged.
///
/// # Errors
///
/// Returns an error if the scan fails for any reason other than a busy lease.
fn run_scan(config: &Config, args: &ScanArgs) -> color_eyre::Result<ExitCode> {
    let scanner = create_scanner(config)?;
    let request = args.request();
    info!(root = %config.scan.root, request = ?request, "starting scan");

    let report = if request.dry_run {
        run_dry(&scanner, &request, args.json)?
    } else {
        let catalog = open_catalog(config)?;
        match scanner.run(&request, &catalog) {
            Ok(report) => report,
            Err(err) => match busy_exit(&err, &mut std::io::stderr().lock())? {
                Some(code) => return Ok(code),
                None => return Err(err).wrap_err("scan failed"),
            },
        }
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        writeln!(handle, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        print_report(&mut handle, &report)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Streams a dry run, printing each dated PDF as it is evaluated.
fn run_dry(scanner: &Scanner, request: &ScanRequest, json: bool) -> color_eyre::Result<ScanReport> {
    let mut dry = scanner.dry_run(request).wrap_err("scan failed")?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    for item in dry.by_ref() {
        let ScanItem::Ok { entry, strategy } = &item else {
            continue;
        };
        if json {
            writeln!(handle, "{}", serde_json::to_string(&DryEntry { entry, strategy: strategy.label() })?)?;
        } else {
            writeln!(handle, "{}  {}", entry.date, entry.path)?;
        }
    }
    Ok(dry.report())
}

/// One JSON line of a dry run.
#[derive(serde::Serialize)]
struct DryEntry<'a> {
    #[serde(flatten)]
    entry: &'a CatalogEntry,
    strategy: &'static str,
}

/// Watches the share and runs a `--since` scan per change batch.
///
/// A batch that finds the lease busy is dropped; the next change or the
/// scheduled scan picks the files up.
///
/// # Errors
///
/// Returns an error if the watcher cannot start or stops with an error.
async fn run_watch(
    config: &Config,
    since: Option<u32>,
    debounce_ms: Option<u64>,
) -> color_eyre::Result<ExitCode> {
    let mut watch = config.watch;
    if let Some(since) = since {
        watch.since_minutes = since;
    }
    if let Some(debounce_ms) = debounce_ms {
        watch.debounce_ms = debounce_ms;
    }

    let scanner = Arc::new(create_scanner(config)?);
    let catalog = Arc::new(open_catalog(config)?);
    let mut watcher = FileWatcher::new(&config.scan.root, &watch, PdfFilter::new()).await?;
    let request = ScanRequest::new().since_minutes(watch.since_minutes);
    info!(
        root = %watcher.watch_path(),
        since_minutes = watch.since_minutes,
        debounce_ms = watch.debounce_ms,
        "watching share for PDF changes"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            batch = watcher.next_batch() => {
                let Some(batch) = batch else {
                    warn!("watcher stopped");
                    break;
                };
                let summary = batch.summary();
                info!(events = summary.total_events, files = summary.unique_files, "PDF changes detected, rescanning");

                let scanner = Arc::clone(&scanner);
                let catalog = Arc::clone(&catalog);
                let outcome =
                    tokio::task::spawn_blocking(move || scanner.run(&request, catalog.as_ref())).await?;
                match outcome {
                    Ok(report) => info!(
                        strategy = report.strategy.label(),
                        ok = report.stats.ok,
                        inserted = report.stats.inserted,
                        bad = report.stats.bad,
                        "rescan finished"
                    ),
                    Err(err) if err.is_busy() => warn!(
                        retry_after_secs = err.retry_after().map(|d| d.as_secs()),
                        "scan already running, dropping change batch"
                    ),
                    Err(err) => error!(error = %err, "rescan failed"),
                }
            }
            result = &mut shutdown => {
                result?;
                info!("shutting down");
                break;
            }
        }
    }

    watcher.shutdown().await?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() -> color_eyre::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

/// Prints one page of the catalog listing.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
fn run_list(config: &Config, args: &ListArgs) -> color_eyre::Result<ExitCode> {
    let catalog = open_catalog(config)?;
    let page = catalog.query(&args.query())?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        writeln!(handle, "{}", serde_json::to_string_pretty(&page)?)?;
        return Ok(ExitCode::SUCCESS);
    }

    for entry in &page.entries {
        writeln!(handle, "{}  {:<6}  {}", entry.date, entry.provenance.as_str(), entry.path)?;
    }
    writeln!(
        handle,
        "page {} of {} ({} matching)",
        page.page,
        page.last_page(),
        page.total
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Prints catalog size and the last completed sync.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
fn run_status(config: &Config, json: bool) -> color_eyre::Result<ExitCode> {
    let catalog = open_catalog(config)?;
    let documents = catalog.len()?;
    let last_sync = catalog.last_sync()?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if json {
        let status = serde_json::json!({
            "catalog": config.catalog.path,
            "documents": documents,
            "last_sync": last_sync,
        });
        writeln!(handle, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(ExitCode::SUCCESS);
    }

    writeln!(handle, "catalog:    {}", config.catalog.path)?;
    writeln!(handle, "documents:  {documents}")?;
    match last_sync {
        Some(at) => writeln!(
            handle,
            "last sync:  {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        )?,
        None => writeln!(handle, "last sync:  never")?,
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_report(handle: &mut impl Write, report: &ScanReport) -> std::io::Result<()> {
    let stats = &report.stats;
    writeln!(handle)?;
    if report.dry_run {
        writeln!(handle, "Dry run (catalog not modified)")?;
    }
    writeln!(
        handle,
        "Strategy: {} ({} walker), {} candidates in {} ms",
        report.strategy.label(),
        report.backend.label(),
        report.candidates,
        report.elapsed_ms
    )?;
    writeln!(
        handle,
        "  ok:       {} (inserted {}, updated {}, unchanged {})",
        stats.ok, stats.inserted, stats.updated, stats.unchanged
    )?;
    writeln!(handle, "  skipped:  {}", stats.skipped)?;
    writeln!(handle, "  bad:      {}", stats.bad)?;
    if report.unreadable_dirs > 0 {
        writeln!(handle, "  unreadable directories: {}", report.unreadable_dirs)?;
    }
    if report.stat_check_skipped {
        writeln!(handle, "  modification-time check skipped (large native listing)")?;
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = build_config(&cli)?;
    match &cli.command {
        Commands::Scan(args) => {
            config.validate()?;
            run_scan(&config, args)
        }
        Commands::Watch { since, debounce_ms } => {
            config.validate()?;
            run_watch(&config, *since, *debounce_ms).await
        }
        Commands::List(args) => run_list(&config, args),
        Commands::Status { json } => run_status(&config, *json),
    }
}
