use ossync_sync::SyncError;

/// Command failure carrying the process exit status.
#[derive(Debug)]
pub enum CliError {
    /// Bad arguments or configuration.
    Configuration(String),
    Failure(anyhow::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 4,
            Self::Failure(_) => 1,
        }
    }

    pub fn display_message(&self) -> String {
        match self {
            Self::Configuration(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<SyncError> for CliError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Configuration(message) => Self::Configuration(message),
            other => Self::Failure(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_exit_four() {
        let err = CliError::from(SyncError::configuration("several keys need a target directory"));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.display_message(), "several keys need a target directory");
    }

    #[test]
    fn other_errors_exit_one() {
        let err = CliError::from(SyncError::Cancelled);
        assert_eq!(err.exit_code(), 1);
        let err = CliError::failure(anyhow::anyhow!("connection reset"));
        assert_eq!(err.display_message(), "connection reset");
    }
}
