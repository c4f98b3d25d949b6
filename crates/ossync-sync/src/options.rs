use std::num::NonZeroUsize;

use tracing::warn;

/// Hard ceiling on concurrent transfers.
pub const MAX_CONCURRENCY: usize = 16;

/// Number of CPUs, within `1..=MAX_CONCURRENCY`.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .clamp(1, MAX_CONCURRENCY)
}

/// Settings fixed for the duration of one command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    pub concurrency: usize,
    pub dry_run: bool,
    pub verbose: bool,
}

impl RunOptions {
    /// Options with the requested concurrency; a value outside
    /// `1..=MAX_CONCURRENCY` falls back to [`default_concurrency`].
    pub fn new(concurrency: Option<usize>) -> Self {
        let concurrency = match concurrency {
            None => default_concurrency(),
            Some(n) if (1..=MAX_CONCURRENCY).contains(&n) => n,
            Some(n) => {
                let fallback = default_concurrency();
                warn!(requested = n, fallback, "concurrency must be between 1 and {MAX_CONCURRENCY}");
                fallback
            }
        };
        Self {
            concurrency,
            dry_run: false,
            verbose: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(None)
    }
}
