//! Crate-level error type
//!
//! Each module reports its own error enum; this type gathers them so the CLI
//! can map every failure class to a distinct exit code.

use std::io;

use jmespath::JmespathError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::cli::CliError;
use crate::data::ProviderError;
use crate::export::ExportError;
use crate::query::exclude::PathError;
use crate::query::matcher::MatchError;

/// Exit code for configuration and input-format errors
pub const EXIT_CONFIG: u8 = 2;
/// Exit code when the cache is missing or stale at load time
pub const EXIT_CACHE_INVALID: u8 = 3;
/// Exit code for values that are not JSON-compatible
pub const EXIT_DATA: u8 = 4;
/// Exit code when a requested model does not exist
pub const EXIT_LOOKUP: u8 = 5;
/// Exit code for everything else (I/O, data source failures)
pub const EXIT_FAILURE: u8 = 1;

/// Any failure surfaced by the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// A JMESPath query failed to compile or evaluate
    #[error("Query '{query}' failed: {source}")]
    Query {
        query: String,
        #[source]
        source: JmespathError,
    },

    /// A query result could not be turned back into JSON
    #[error("Query '{query}' produced a non-JSON result: {source}")]
    QueryResult {
        query: String,
        #[source]
        source: serde_json::Error,
    },

    /// No model name starts with the requested prefix
    #[error("No model with name '{0}' found")]
    ModelNotFound(String),

    /// Positional access past the end of the collection
    #[error("Index {index} out of range for {len} models")]
    IndexOutOfRange { index: usize, len: usize },

    /// Reading input or writing output failed
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A result could not be encoded for output
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for this error's class
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Cli(_) | Error::Path(_) | Error::Query { .. } => EXIT_CONFIG,
            Error::Cache(CacheError::NonPositiveDuration(_) | CacheError::Duration(_)) => {
                EXIT_CONFIG
            }
            Error::Cache(CacheError::Invalid(_)) => EXIT_CACHE_INVALID,
            Error::Cache(_) => EXIT_FAILURE,
            Error::Match(MatchError::NotSerializable(_)) => EXIT_DATA,
            Error::Match(MatchError::View(_)) | Error::QueryResult { .. } => EXIT_DATA,
            Error::Match(_) => EXIT_CONFIG,
            Error::ModelNotFound(_) | Error::IndexOutOfRange { .. } => EXIT_LOOKUP,
            Error::Provider(_) | Error::Export(_) | Error::Io(_) | Error::Output(_) => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::DurationError;
    use std::path::PathBuf;

    #[test]
    fn test_error_classes_have_distinct_exit_codes() {
        let config = Error::from(CliError::CacheTime(DurationError::InvalidFormat(
            "x".to_string(),
        )));
        let invalid = Error::from(CacheError::Invalid(PathBuf::from("/tmp/c.json")));
        let lookup = Error::ModelNotFound("llama".to_string());

        assert_eq!(config.exit_code(), EXIT_CONFIG);
        assert_eq!(invalid.exit_code(), EXIT_CACHE_INVALID);
        assert_eq!(lookup.exit_code(), EXIT_LOOKUP);
        assert_eq!(Error::from(ProviderError::NotConfigured).exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_model_not_found_names_the_model() {
        let err = Error::ModelNotFound("qwen".to_string());
        assert!(err.to_string().contains("'qwen'"));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let err = Error::from(
            regex::Regex::new("(")
                .map(|_| ())
                .map_err(MatchError::from)
                .unwrap_err(),
        );
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }
}
