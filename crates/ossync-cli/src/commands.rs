use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use bytes::Bytes;
use colored::Colorize;
use ossync_store::ObjectStore;
use ossync_sync::mapping::{self, DownloadPlan};
use ossync_sync::transfer::copy_body;
use ossync_sync::{
    compare, human_bytes, human_duration, run_blocking, DiffPlan, JobQueue, Listing, RemoteLister, RunOptions,
    Transfer, TransferEvent, TransferStats, UploadOutcome,
};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::*;
use crate::config::OssConfig;
use crate::error::{CliError, CliResult};

/// Lifetime of signed URLs printed by a dry-run download.
const PRESIGN_SECONDS: i64 = 3600;

/// Per-invocation state shared by the subcommands.
struct Session {
    store: Arc<dyn ObjectStore>,
    options: RunOptions,
    cancel: CancellationToken,
    format: OutputFormat,
}

impl Session {
    fn queue(&self) -> JobQueue {
        JobQueue::new(self.options.concurrency).with_cancellation(self.cancel.clone())
    }

    fn transfer(&self) -> Transfer {
        let (format, verbose) = (self.format, self.options.verbose);
        Transfer::new(Arc::clone(&self.store), self.options)
            .with_cancellation(self.cancel.clone())
            .with_events(move |event| print_event(format, verbose, &event))
    }

    fn check_interrupted(&self) -> CliResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CliError::failure(anyhow!("interrupted")));
        }
        Ok(())
    }
}

pub async fn run_command(cli: Cli) -> CliResult<i32> {
    let config = OssConfig::resolve(&cli)?;
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling outstanding jobs");
            watcher.cancel();
        }
    });
    let session = Session {
        store: config.store()?,
        options: config.run_options(cli.dry_run, cli.verbose),
        cancel,
        format: cli.format,
    };

    match cli.command {
        Command::Upload(args) => cmd_upload(&session, args).await,
        Command::Download(args) => cmd_download(&session, args).await,
        Command::List(args) => cmd_list(&session, args).await,
        Command::Diff(args) => cmd_diff(&session, args).await,
    }
}

fn print_event(format: OutputFormat, verbose: bool, event: &TransferEvent) {
    if format == OutputFormat::Json {
        match event_json(event) {
            Some(value) => println!("{value}"),
            None => print_event(OutputFormat::Text, verbose, event),
        }
        return;
    }
    match event {
        TransferEvent::Uploaded { local, remote, .. } => {
            println!("{} {} -> {}", "uploaded".green(), local.display(), remote)
        }
        TransferEvent::Unchanged { remote, .. } if verbose => {
            println!("{} {}", "unchanged".dimmed(), remote)
        }
        TransferEvent::Unchanged { .. } => {}
        TransferEvent::Downloaded { remote, local, .. } => {
            println!("{} {} -> {}", "downloaded".green(), remote, local.display())
        }
        TransferEvent::Planned { from, to } => println!("{from} -> {to}"),
        TransferEvent::Failed { subject, message } => {
            eprintln!("{} {}: {}", "failed".red().bold(), subject, message)
        }
    }
}

fn event_json(event: &TransferEvent) -> Option<serde_json::Value> {
    Some(match event {
        TransferEvent::Uploaded { local, remote, bytes } => {
            json!({ "event": "uploaded", "local": local, "remote": remote, "bytes": bytes })
        }
        TransferEvent::Unchanged { local, remote } => {
            json!({ "event": "unchanged", "local": local, "remote": remote })
        }
        TransferEvent::Downloaded { remote, local, bytes } => {
            json!({ "event": "downloaded", "remote": remote, "local": local, "bytes": bytes })
        }
        TransferEvent::Planned { from, to } => json!({ "event": "planned", "from": from, "to": to }),
        // failures stay human-readable on stderr
        TransferEvent::Failed { .. } => return None,
    })
}

fn print_summary(format: OutputFormat, stats: &TransferStats) {
    if format == OutputFormat::Json {
        println!(
            "{}",
            json!({
                "files": stats.files,
                "skipped": stats.skipped,
                "failures": stats.failures,
                "bytes": stats.bytes,
                "elapsed_ms": stats.elapsed.as_millis() as u64,
            })
        );
        return;
    }
    if stats.bytes > 0 {
        eprintln!("{}", stats.summary());
    }
    if stats.failures > 0 {
        eprintln!("{}", format!("{} error(s) occurred", stats.failures).red());
    }
}

async fn cmd_upload(session: &Session, args: UploadArgs) -> CliResult<i32> {
    let parsed = mapping::UploadArgs::parse(&args.paths)?;
    if parsed.from_stdin() {
        return upload_stdin(session, &parsed.remote).await;
    }
    let stats = session
        .transfer()
        .upload_sources(parsed.locals, parsed.remote, args.parents)
        .await;
    print_summary(session.format, &stats);
    session.check_interrupted()?;
    Ok(stats.exit_code())
}

async fn upload_stdin(session: &Session, remote: &str) -> CliResult<i32> {
    if remote.ends_with('/') {
        return Err(CliError::configuration(format!(
            "{remote}: uploading from stdin needs an object name, not a directory"
        )));
    }
    if session.options.dry_run {
        return Err(CliError::configuration("cannot upload from stdin in dry-run mode"));
    }
    if std::io::stdin().is_terminal() {
        eprintln!("{}", "reading from stdin, finish with Ctrl-D".dimmed());
    }
    let mut body = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut body)
        .await
        .map_err(|e| CliError::failure(anyhow!("reading stdin: {e}")))?;

    let started = Instant::now();
    let size = body.len() as u64;
    let outcome = session.transfer().upload_bytes(remote, Bytes::from(body)).await?;
    let stats = match outcome {
        UploadOutcome::Uploaded => {
            print_event(
                session.format,
                session.options.verbose,
                &TransferEvent::Uploaded {
                    local: PathBuf::from("<stdin>"),
                    remote: remote.to_string(),
                    bytes: size,
                },
            );
            TransferStats {
                files: 1,
                bytes: size,
                elapsed: started.elapsed(),
                ..TransferStats::default()
            }
        }
        UploadOutcome::Unchanged => {
            eprintln!("{remote}: no changes, ignored");
            TransferStats {
                skipped: 1,
                elapsed: started.elapsed(),
                ..TransferStats::default()
            }
        }
    };
    print_summary(session.format, &stats);
    Ok(0)
}

async fn cmd_download(session: &Session, args: DownloadArgs) -> CliResult<i32> {
    let parsed = mapping::DownloadArgs::parse(&args.paths)?;
    let plan = mapping::download_plan(&parsed)?;
    let transfer = session.transfer();

    if session.options.dry_run {
        let expires = chrono::Utc::now().timestamp() + PRESIGN_SECONDS;
        let targets: Vec<(String, Option<PathBuf>)> = match plan {
            DownloadPlan::Stdout(remote) => vec![(remote, None)],
            DownloadPlan::Files(jobs) => jobs.into_iter().map(|j| (j.remote, Some(j.local))).collect(),
        };
        for (remote, local) in targets {
            println!("{}", transfer.curl_command(&remote, local.as_deref(), expires)?);
        }
        return Ok(0);
    }

    match plan {
        DownloadPlan::Stdout(remote) => download_stdout(&transfer, &remote).await,
        DownloadPlan::Files(jobs) => {
            let stats = transfer.download_many(jobs).await;
            print_summary(session.format, &stats);
            session.check_interrupted()?;
            Ok(stats.exit_code())
        }
    }
}

/// Content types that are safe to dump on a terminal.
fn is_textual(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.starts_with("text/")
        || matches!(
            essence,
            "application/json" | "application/xml" | "application/javascript" | "application/x-sh"
        )
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
}

async fn confirm(prompt: String) -> bool {
    run_blocking(move || {
        eprint!("{prompt} [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer).is_ok()
            && matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    })
    .await
}

async fn download_stdout(transfer: &Transfer, remote: &str) -> CliResult<i32> {
    let body = transfer.open(remote).await?;
    let content_type = body.content_type.clone().unwrap_or_default();
    if std::io::stdout().is_terminal()
        && !is_textual(&content_type)
        && !confirm(format!("{remote} is {content_type:?}; print it to the terminal?")).await
    {
        return Ok(0);
    }
    copy_body(body, &mut tokio::io::stdout(), Path::new("<stdout>")).await?;
    Ok(0)
}

/// Name as shown by `list`: the bucket key, relative to `prefix` when it
/// selects a directory.
fn display_name<'a>(name: &'a str, prefix: &str) -> &'a str {
    let key = name.trim_start_matches('/');
    if !prefix.ends_with('/') {
        return key;
    }
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Heading of one prefix's block when several prefixes are listed.
fn block_header(prefix: &str) -> String {
    format!("{prefix}:")
}

fn print_listing(prefix: &str, listing: &Listing) {
    for dir in &listing.dirs {
        println!("{}", display_name(&dir.name, prefix).blue().bold());
    }
    for file in &listing.files {
        println!("{}", display_name(&file.name, prefix));
    }
}

async fn cmd_list(session: &Session, args: ListArgs) -> CliResult<i32> {
    let prefixes: Vec<String> = if args.prefixes.is_empty() {
        vec![String::new()]
    } else {
        args.prefixes.iter().map(|p| mapping::list_prefix(p)).collect()
    };
    let results = RemoteLister::new(Arc::clone(&session.store))
        .list_many(prefixes.clone(), args.recursive)
        .await;

    let multiple = prefixes.len() > 1;
    for (i, (prefix, result)) in prefixes.iter().zip(results).enumerate() {
        let listing = result.map_err(CliError::failure)?;
        if session.format == OutputFormat::Json {
            println!(
                "{}",
                json!({ "prefix": prefix, "dirs": listing.dirs, "files": listing.files })
            );
            continue;
        }
        if multiple {
            if i > 0 {
                println!();
            }
            println!("{}", block_header(prefix));
        }
        print_listing(prefix, &listing);
    }
    Ok(0)
}

async fn cmd_diff(session: &Session, args: DiffArgs) -> CliResult<i32> {
    let plan = DiffPlan::resolve(&args.local, &args.remote)?;
    let comparison = compare(Arc::clone(&session.store), plan, session.queue(), args.md5).await?;

    if let Some(e) = &comparison.local_error {
        eprintln!("{} {}", "error:".red().bold(), e);
    }
    for record in comparison.local_failures() {
        let reason = record.error.as_deref().unwrap_or("unreadable");
        eprintln!("{} {}: {}", "error:".red().bold(), record.name, reason);
    }
    if let Some(e) = &comparison.remote_error {
        eprintln!("{} {}", "error:".red().bold(), e);
    }
    if session.options.verbose {
        eprintln!(
            "local: {} files ({}), time used: {}",
            comparison.local.len(),
            human_bytes(comparison.local.iter().map(|r| r.size as i64).sum()),
            human_duration(comparison.local_elapsed)
        );
        eprintln!(
            "remote: {} objects ({}), time used: {}",
            comparison.remote.len(),
            human_bytes(comparison.remote.iter().map(|r| r.size as i64).sum()),
            human_duration(comparison.remote_elapsed)
        );
    }

    let report = match comparison.report().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return Ok(e.exit_code());
        }
    };
    let status = report.status();

    if session.format == OutputFormat::Json {
        println!(
            "{}",
            json!({
                "status": status,
                "local_only": report.local_only,
                "remote_only": report.remote_only,
            })
        );
        return Ok(status.exit_code());
    }
    let (stdout, stderr) = if args.reverse {
        (&report.remote_only, &report.local_only)
    } else {
        (&report.local_only, &report.remote_only)
    };
    for record in stdout {
        println!("{}", record.name);
    }
    for record in stderr {
        eprintln!("{}", record.name);
    }
    Ok(status.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_content_types() {
        assert!(is_textual("text/plain; charset=utf-8"));
        assert!(is_textual("text/html"));
        assert!(is_textual("application/json"));
        assert!(is_textual("application/ld+json"));
        assert!(!is_textual("application/octet-stream"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual(""));
    }

    #[test]
    fn names_relative_to_directory_prefix() {
        assert_eq!(display_name("/photos/2014/a.jpg", "photos/"), "2014/a.jpg");
        assert_eq!(display_name("/photos/2014/", "photos/"), "2014/");
        assert_eq!(display_name("/photos/", "photos/"), "");
    }

    #[test]
    fn names_without_directory_prefix_are_bucket_keys() {
        assert_eq!(display_name("/photos/a.jpg", "photos"), "photos/a.jpg");
        assert_eq!(display_name("/a.jpg", ""), "a.jpg");
        assert_eq!(display_name("/photos/2014/", ""), "photos/2014/");
    }

    #[test]
    fn block_headers_use_the_listing_prefix() {
        assert_eq!(block_header("photos/"), "photos/:");
        assert_eq!(block_header("a/b"), "a/b:");
        assert_eq!(block_header(""), ":");
    }

    #[test]
    fn failed_events_have_no_json_line() {
        let failed = TransferEvent::Failed {
            subject: "/k".into(),
            message: "boom".into(),
        };
        assert!(event_json(&failed).is_none());
        let planned = TransferEvent::Planned {
            from: "a".into(),
            to: "/a".into(),
        };
        assert_eq!(event_json(&planned).unwrap()["to"], "/a");
    }
}
