//! rrdp-mirror CLI - reconstruct, mirror and inspect RRDP repositories.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use rrdp_mirror::scan::{self, ScanConfig, DEFAULT_FILE_MATCH};
use rrdp_mirror::{
    parse_snapshot_or_delta, DeltaSelection, FetchBuilder, FetchReport, ReconcileBuilder,
    UriFilter, WallClock,
};

/// Exit code for an output directory that does not exist.
const EXIT_USAGE: u8 = 2;

/// rrdp-mirror - RPKI Repository Delta Protocol tooling
#[derive(Parser)]
#[command(name = "rrdp-mirror")]
#[command(version)]
#[command(about = "Mirror, reconstruct and inspect RRDP repositories")]
#[command(long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild a repository tree from a snapshot or delta
    Reconstruct {
        /// Snapshot/delta file, or http(s) URL of a snapshot, delta or notification
        input: String,

        /// Directory the objects are written to (must exist)
        output_dir: PathBuf,

        /// Only process URIs matching this regular expression (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Check hashes against the tree without modifying it
        #[arg(long)]
        verify_only: bool,

        /// Require deltas to follow the recorded session and serial
        #[arg(long)]
        track_state: bool,

        /// Stamp files with the time decoded from each object
        ///
        /// Only takes effect with an ObjectInspector that decodes signed
        /// objects, supplied through the library's ReconcileBuilder. No
        /// decoder is bundled, so here files keep the time they are written.
        #[arg(long)]
        object_time: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the notification, snapshot and deltas of a repository
    Snapshot {
        /// URL of the notification document
        notification_url: String,

        /// Directory the documents are written to (must exist)
        output_dir: PathBuf,

        /// Replace scheme, host and port of snapshot and delta URLs
        #[arg(long)]
        override_authority: Option<String>,

        /// Do not download the snapshot
        #[arg(long)]
        skip_snapshot: bool,

        /// Download at most this many deltas
        #[arg(long)]
        max_deltas: Option<usize>,

        /// With --max-deltas, keep the oldest deltas instead of the newest
        #[arg(long)]
        oldest: bool,

        /// Number of concurrent downloads
        #[arg(long)]
        concurrency: Option<usize>,

        /// Include the document hash in file names
        #[arg(long)]
        hash_in_filename: bool,

        /// Store documents in a directory named after the session
        #[arg(long)]
        include_session: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Try to download deltas by serial from a URL template
    ProbeDeltas {
        /// URL with `{}` where the serial goes
        template: String,

        /// First serial
        start: u64,

        /// Serial to stop before
        end: u64,

        /// Directory the deltas are written to (must exist)
        output_dir: PathBuf,

        /// Number of concurrent downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Scan stored snapshots and deltas for matching objects
    Scan {
        /// Directory searched for `*.xml` documents
        path: PathBuf,

        /// Regular expression matched against the start of each URI
        #[arg(long, default_value = DEFAULT_FILE_MATCH)]
        file_match: String,

        /// Print the base64 content of each match
        #[arg(short, long)]
        log_content: bool,

        /// Print files added to and removed from consecutive manifests
        #[arg(short, long)]
        manifest_diff: bool,

        /// Write each match to this directory as <serial>_<file name>
        #[arg(long)]
        store_content: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Check that `dir` exists, logging why it does not.
fn require_dir(dir: &Path) -> bool {
    if dir.is_dir() {
        return true;
    }
    error!("Output directory {} does not exist", dir.display());
    false
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Reconstruct {
            input,
            output_dir,
            filters,
            verify_only,
            track_state,
            object_time,
            json,
        } => {
            if !require_dir(&output_dir) {
                return Ok(ExitCode::from(EXIT_USAGE));
            }
            let mut builder = ReconcileBuilder::new()
                .filter(UriFilter::new(&filters)?)
                .verify_only(verify_only)
                .track_state(track_state);
            if object_time {
                // No object decoder is bundled; objects are stamped with the
                // time they are written.
                builder = builder.assign_mtime(Arc::new(WallClock));
            }
            run_reconstruct(&input, &output_dir, builder, json).await?;
        }
        Commands::Snapshot {
            notification_url,
            output_dir,
            override_authority,
            skip_snapshot,
            max_deltas,
            oldest,
            concurrency,
            hash_in_filename,
            include_session,
            json,
        } => {
            if !require_dir(&output_dir) {
                return Ok(ExitCode::from(EXIT_USAGE));
            }
            let mut builder = FetchBuilder::new()
                .skip_snapshot(skip_snapshot)
                .hash_in_filename(hash_in_filename)
                .include_session(include_session);
            if let Some(authority) = override_authority {
                builder = builder.override_authority(Url::parse(&authority)?);
            }
            if let Some(max) = max_deltas {
                builder = builder.max_deltas(max);
            }
            if oldest {
                builder = builder.delta_selection(DeltaSelection::Oldest);
            }
            if let Some(n) = concurrency {
                builder = builder.concurrency(n);
            }

            let report = builder.build()?.sync(&notification_url, &output_dir).await?;
            print_report(&report, json)?;
            if !report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::ProbeDeltas {
            template,
            start,
            end,
            output_dir,
            concurrency,
        } => {
            if !require_dir(&output_dir) {
                return Ok(ExitCode::from(EXIT_USAGE));
            }
            let mut builder = FetchBuilder::new();
            if let Some(n) = concurrency {
                builder = builder.concurrency(n);
            }
            let report = builder
                .build()?
                .probe_deltas(&template, start..end, &output_dir)
                .await?;
            print_report(&report, false)?;
        }
        Commands::Scan {
            path,
            file_match,
            log_content,
            manifest_diff,
            store_content,
        } => {
            if let Some(dir) = &store_content {
                if !require_dir(dir) {
                    return Ok(ExitCode::from(EXIT_USAGE));
                }
            }
            run_scan(
                &path,
                &file_match,
                log_content,
                manifest_diff,
                store_content.as_deref(),
            )?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_reconstruct(
    input: &str,
    output_dir: &Path,
    builder: ReconcileBuilder,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = if input.starts_with("http://") || input.starts_with("https://") {
        FetchBuilder::new().build()?.fetch_document(input).await?
    } else {
        parse_snapshot_or_delta(&tokio::fs::read(input).await?)?
    };

    let summary = builder.build().apply(&document, output_dir)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let verb = if summary.verify_only { "Verified" } else { "Applied" };
        println!(
            "{verb} {} {} (session {}) to {}",
            summary.kind,
            summary.serial,
            summary.session_id,
            summary.root.display()
        );
        println!("Published: {}", summary.published);
        println!("Withdrawn: {}", summary.withdrawn);
        println!("Skipped:   {}", summary.skipped);
        println!("Issues:    {}", summary.issues.len());
    }
    Ok(())
}

fn print_report(report: &FetchReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if let (Some(session_id), Some(serial)) = (&report.session_id, report.serial) {
        println!("Session {session_id} serial {serial}");
    }
    println!("Output:     {}", report.output_dir.display());
    println!("Considered: {}", report.considered);
    println!("Downloaded: {}", report.downloaded);
    println!("Cached:     {}", report.skipped);
    println!("Failed:     {}", report.failed.len());
    for failure in &report.failed {
        println!("  {}: {}", failure.url, failure.error);
    }
    Ok(())
}

fn run_scan(
    path: &Path,
    file_match: &str,
    log_content: bool,
    manifest_diff: bool,
    store_content: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    use base64::Engine as _;

    let config = ScanConfig::default().file_match(file_match)?;
    let entries = scan::scan_directory(path, &config)?;

    let diffs = if manifest_diff {
        scan::manifest_diffs(&entries)
    } else {
        Vec::new()
    };

    for entry in &entries {
        println!("{entry}");
        for diff in diffs
            .iter()
            .filter(|d| d.serial == entry.serial() && d.uri == entry.uri())
        {
            let mut lines: Vec<(&rrdp_mirror::object::FileAndHash, char)> = diff
                .added
                .iter()
                .map(|f| (f, '+'))
                .chain(diff.removed.iter().map(|f| (f, '-')))
                .collect();
            lines.sort();
            for (file, sign) in lines {
                println!("      {sign} {file}");
            }
        }
        if log_content {
            println!(
                "{}",
                base64::engine::general_purpose::STANDARD.encode(entry.content())
            );
        }
    }

    if let Some(dir) = store_content {
        let written = scan::store_content(&entries, dir)?;
        println!("Stored {written} files in {}", dir.display());
    }
    Ok(())
}
