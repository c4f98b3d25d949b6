use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};

/// Exit status for argument errors, shared with other configuration errors.
pub const USAGE_EXIT_CODE: i32 = 4;

/// How to finish after `clap` rejects the command line: `None` when it only
/// asked for help or the version (clap prints those and exits 0), otherwise
/// the exit status for a usage error.
pub fn usage_exit_code(err: &clap::Error) -> Option<i32> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(USAGE_EXIT_CODE),
    }
}

#[derive(Parser)]
#[command(
    name = "oss",
    about = "Upload, download, list and diff objects in an object storage bucket",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Bucket name
    #[arg(short, long, global = true, env = "OSS_BUCKET")]
    pub bucket: Option<String>,

    /// API endpoint; one `%s` is replaced by the bucket name
    #[arg(long, visible_alias = "api", global = true, env = "OSS_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, global = true, env = "OSS_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    #[arg(long, global = true, env = "OSS_ACCESS_KEY_SECRET", hide_env_values = true)]
    pub access_key_secret: Option<String>,

    /// Parallel transfers (1-16, defaults to the number of CPUs)
    #[arg(short = 'j', long, global = true)]
    pub concurrency: Option<usize>,

    /// Show what would be transferred without doing it
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "OSSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload files or directories: LOCAL... REMOTE (stdin when only REMOTE)
    #[command(visible_aliases = ["up", "u", "put"])]
    Upload(UploadArgs),
    /// Download objects: REMOTE [LOCAL] or REMOTE... DIRECTORY
    #[command(visible_aliases = ["down", "dl", "d", "get"])]
    Download(DownloadArgs),
    /// List objects under one or more prefixes
    #[command(visible_aliases = ["ls", "l"])]
    List(ListArgs),
    /// Compare a local directory with a remote prefix
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct UploadArgs {
    #[arg(required = true, value_name = "LOCAL... REMOTE")]
    pub paths: Vec<String>,
    /// Keep the full local path below the remote destination
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Args)]
pub struct DownloadArgs {
    #[arg(required = true, value_name = "REMOTE... [LOCAL]")]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    pub prefixes: Vec<String>,
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub local: String,
    pub remote: String,
    /// Also compare MD5 digests
    #[arg(long)]
    pub md5: bool,
    /// Print remote-only names to stdout and local-only names to stderr
    #[arg(short, long)]
    pub reverse: bool,
}
