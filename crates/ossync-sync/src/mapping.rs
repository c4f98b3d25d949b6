//! Local path to remote key rules, and command argument normalization.
//!
//! Everything here is lexical except [`download_plan`], which looks at the
//! local target to decide whether it names a directory.

use std::path::{Path, PathBuf};

use ossync_types::key;

use crate::error::{SyncError, SyncResult};
use crate::transfer::DownloadJob;

fn ensure_trailing_slash(path: &mut String) {
    if !path.ends_with('/') {
        path.push('/');
    }
}

/// Remote key for a single local file.
///
/// - `parents`: the full local path is appended below `remote`.
/// - `multiple` sources, or a `remote` ending in `/`: the file's base name is
///   appended.
/// - otherwise `remote` itself names the object.
pub fn local_to_remote(local: &str, remote: &str, multiple: bool, parents: bool) -> String {
    let mut path = remote.to_string();
    if parents {
        ensure_trailing_slash(&mut path);
        path.push_str(&key::parent(local));
        path.push('/');
    }
    if multiple {
        ensure_trailing_slash(&mut path);
    }
    if path.ends_with('/') {
        path.push_str(key::base_name(local));
    }
    key::clean(&path)
}

/// Remote key for a file found while walking the directory `root`.
///
/// With `parents` the full local path is appended. A `remote` ending in `/`
/// receives the root directory's own name plus the path below it; any other
/// `remote` stands in for the root directory.
pub fn rooted_local_to_remote(root: &str, local: &str, remote: &str, parents: bool) -> String {
    let path = if parents {
        let mut path = remote.to_string();
        ensure_trailing_slash(&mut path);
        path + local
    } else if remote.ends_with('/') {
        let base = key::parent(root.trim_end_matches('/'));
        let rel = key::relative(&base, local).unwrap_or_else(|| key::base_name(local).to_string());
        format!("{remote}{rel}")
    } else {
        let rel = key::relative(root, local).unwrap_or_else(|| key::base_name(local).to_string());
        format!("{remote}/{rel}")
    };
    key::clean(&path)
}

/// Clean and slash-prefix a remote argument. A trailing `/` is kept because
/// it selects directory semantics.
pub fn normalize_remote(arg: &str) -> String {
    let mut remote = key::clean(&key::rooted(arg));
    if arg.ends_with('/') {
        ensure_trailing_slash(&mut remote);
    }
    remote
}

/// Listing prefix for a `list` argument: cleaned, no leading `/`, trailing
/// `/` kept. The bucket root is the empty prefix.
pub fn list_prefix(arg: &str) -> String {
    let cleaned = key::clean(&key::rooted(arg));
    let mut prefix = cleaned.trim_start_matches('/').to_string();
    if arg.ends_with('/') && !prefix.is_empty() {
        prefix.push('/');
    }
    prefix
}

/// `upload` arguments: `LOCAL... REMOTE`, or just `REMOTE` for stdin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadArgs {
    pub locals: Vec<String>,
    pub remote: String,
}

impl UploadArgs {
    pub fn parse(args: &[String]) -> SyncResult<Self> {
        let Some((remote, locals)) = args.split_last() else {
            return Err(SyncError::configuration("upload needs a remote destination"));
        };
        Ok(Self {
            locals: locals.iter().map(|l| key::clean(l)).collect(),
            remote: normalize_remote(remote),
        })
    }

    /// No local sources: the body comes from stdin.
    pub fn from_stdin(&self) -> bool {
        self.locals.is_empty()
    }
}

/// `download` arguments: `REMOTE`, or `REMOTE... LOCAL`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadArgs {
    pub remotes: Vec<String>,
    pub local: Option<String>,
}

impl DownloadArgs {
    pub fn parse(args: &[String]) -> SyncResult<Self> {
        match args {
            [] => Err(SyncError::configuration("download needs at least one remote key")),
            [remote] => Ok(Self {
                remotes: vec![key::clean(&key::rooted(remote))],
                local: None,
            }),
            [remotes @ .., local] => Ok(Self {
                remotes: remotes.iter().map(|r| key::clean(&key::rooted(r))).collect(),
                local: Some(local.clone()),
            }),
        }
    }
}

/// Where downloaded bytes go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadPlan {
    Stdout(String),
    Files(Vec<DownloadJob>),
}

fn object_name(remote: &str) -> SyncResult<&str> {
    match key::base_name(remote) {
        "/" | "." => Err(SyncError::configuration(format!("{remote:?} does not name an object"))),
        name => Ok(name),
    }
}

/// Resolve download targets.
///
/// One key without a target goes to stdout. One key with a target writes
/// the target, or into it when it is an existing directory. Several keys
/// require an existing directory.
pub fn download_plan(args: &DownloadArgs) -> SyncResult<DownloadPlan> {
    let Some(local) = &args.local else {
        return match args.remotes.as_slice() {
            [remote] => Ok(DownloadPlan::Stdout(remote.clone())),
            _ => Err(SyncError::configuration("several keys need a target directory")),
        };
    };
    let target = Path::new(local);
    let is_dir = target.is_dir();
    if args.remotes.len() > 1 && !is_dir {
        return Err(SyncError::configuration(format!(
            "{local}: target must be an existing directory when downloading several keys"
        )));
    }

    let jobs = args
        .remotes
        .iter()
        .map(|remote| -> SyncResult<DownloadJob> {
            let local = if is_dir {
                target.join(object_name(remote)?)
            } else {
                object_name(remote)?;
                PathBuf::from(local)
            };
            Ok(DownloadJob::new(remote.clone(), local))
        })
        .collect::<SyncResult<_>>()?;
    Ok(DownloadPlan::Files(jobs))
}
