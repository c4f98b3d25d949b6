//! Configuration resolution: defaults, then the TOML file, then environment
//! and flags (clap merges those two).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ossync_crypto::{Credentials, RequestSigner};
use ossync_store::{HttpObjectStore, ObjectStore};
use ossync_sync::RunOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

pub const DEFAULT_ENDPOINT: &str = "https://%s.oss-cn-hangzhou.aliyuncs.com";
pub const DEFAULT_BUCKET: &str = "bucket";

/// Contents of a configuration file. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub concurrency: Option<usize>,
}

impl FileConfig {
    pub fn parse(text: &str) -> CliResult<Self> {
        toml::from_str(text).map_err(|e| CliError::configuration(format!("invalid configuration: {e}")))
    }

    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::configuration(format!("{}: {e}", path.display())))?;
        Self::parse(&text).map_err(|e| match e {
            CliError::Configuration(msg) => CliError::configuration(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Fill unset fields from `other`.
    fn or(self, other: FileConfig) -> Self {
        Self {
            endpoint: self.endpoint.or(other.endpoint),
            bucket: self.bucket.or(other.bucket),
            access_key_id: self.access_key_id.or(other.access_key_id),
            access_key_secret: self.access_key_secret.or(other.access_key_secret),
            concurrency: self.concurrency.or(other.concurrency),
        }
    }
}

/// Effective settings for one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OssConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub concurrency: Option<usize>,
}

/// `$HOME/.config/ossync/config.toml`.
fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/ossync/config.toml"))
}

/// The file to read: an explicit path must exist; the default one is
/// optional.
pub fn config_path(explicit: Option<&Path>, default: Option<PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default.filter(|p| p.is_file()),
    }
}

impl OssConfig {
    pub fn resolve(cli: &Cli) -> CliResult<Self> {
        let file = match config_path(cli.config.as_deref(), default_config_path()) {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                FileConfig::load(&path)?
            }
            None => FileConfig::default(),
        };
        let flags = FileConfig {
            endpoint: cli.endpoint.clone(),
            bucket: cli.bucket.clone(),
            access_key_id: cli.access_key_id.clone(),
            access_key_secret: cli.access_key_secret.clone(),
            concurrency: cli.concurrency,
        };
        Self::merge(flags.or(file))
    }

    /// Apply defaults and check that credentials are present.
    pub fn merge(config: FileConfig) -> CliResult<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(access_key_id), Some(access_key_secret)) =
            (non_empty(config.access_key_id), non_empty(config.access_key_secret))
        else {
            return Err(CliError::configuration(
                "access key id and secret are required (--access-key-id/--access-key-secret, \
                 OSS_ACCESS_KEY_ID/OSS_ACCESS_KEY_SECRET or the configuration file)",
            ));
        };
        Ok(Self {
            endpoint: non_empty(config.endpoint).unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            bucket: non_empty(config.bucket).unwrap_or_else(|| DEFAULT_BUCKET.into()),
            access_key_id,
            access_key_secret,
            concurrency: config.concurrency,
        })
    }

    pub fn run_options(&self, dry_run: bool, verbose: bool) -> RunOptions {
        RunOptions::new(self.concurrency)
            .with_dry_run(dry_run)
            .with_verbose(verbose)
    }

    pub fn store(&self) -> CliResult<Arc<dyn ObjectStore>> {
        let signer = RequestSigner::new(
            Credentials::new(&self.access_key_id, &self.access_key_secret),
            &self.bucket,
        );
        let store = HttpObjectStore::new(&self.endpoint, signer).map_err(CliError::failure)?;
        debug!(base_url = store.base_url(), "using endpoint");
        Ok(Arc::new(store))
    }
}
