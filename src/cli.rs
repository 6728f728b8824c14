//! Command-line interface parsing for ollama-data
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a validated `QueryConfig`: durations, regex patterns, selectors and exclude
//! paths are all checked here, before any cache or data source is touched.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::cache::JsonCache;
use crate::duration::{parse_duration, Duration, DurationError};
use crate::query::exclude::{PathError, PathExpr};
use crate::query::matcher::{MatchError, StructuralMatcher, WHOLE_VALUE};

/// Default validity window of the cache
pub const DEFAULT_CACHE_TIME: &str = "1 hour";

/// Default number of hash characters in exported link names
pub const DEFAULT_HASH_LENGTH: usize = 8;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// `--cache-time` is not a duration
    #[error("Invalid --cache-time: {0}")]
    CacheTime(#[from] DurationError),

    /// `--regex` or `--regex-path` does not compile
    #[error("Invalid --regex/--regex-path: {0}")]
    Regex(#[from] MatchError),

    /// An `--exclude` path does not parse
    #[error("Invalid --exclude: {0}")]
    Exclude(#[from] PathError),

    /// No `--cache-path` was given and no default location is known
    #[error("No cache location available; pass --cache-path")]
    NoCacheDir,
}

/// Search, filter and prune a cached inventory of local models
#[derive(Parser, Debug)]
#[command(name = "ollama-data")]
#[command(about = "Search over a cached inventory of local models")]
#[command(version)]
#[command(after_help = "Examples:
  Show the largest model:
    ollama-data \"max_by(@, &total_weights_size).{name: name, size: total_weights_size}\"

  Filter models by a regex on their name:
    ollama-data --regex \"mistral:latest\" --regex-path name \"[*].{name: name, size: total_weights_size}\"

  Drop bulky fields from the output:
    ollama-data --exclude \"[*].template\" --exclude \"[*].weights.[*].metadata_change_time\"

  Pipe a query from a file:
    cat query.txt | ollama-data")]
pub struct Cli {
    /// JMESPath query to filter results (read from stdin when piped, otherwise `[*]`)
    pub query: Option<String>,

    /// Regular expression the result elements must contain
    #[arg(long, value_name = "REGEX")]
    pub regex: Option<String>,

    /// JMESPath query selecting the view of each element the regex is tested on
    #[arg(long, value_name = "QUERY", default_value = WHOLE_VALUE)]
    pub regex_path: String,

    /// Path to remove from the output, e.g. `[*].weights.[*].dir` (repeatable)
    #[arg(long = "exclude", value_name = "PATH")]
    pub exclude: Vec<String>,

    /// Path to the cache file
    #[arg(long, value_name = "PATH", env = "OLLAMA_DATA_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// How long the cache stays valid, e.g. "1 day" or "2 hours, 30 minutes"
    #[arg(
        long,
        value_name = "STRING",
        env = "OLLAMA_DATA_CACHE_TIME",
        default_value = DEFAULT_CACHE_TIME
    )]
    pub cache_time: String,

    /// Shell command printing the model records as JSON, run when the cache is stale
    #[arg(long, value_name = "CMD", env = "OLLAMA_DATA_SOURCE")]
    pub source: Option<String>,

    /// Print the record schema and exit
    #[arg(long)]
    pub schema: bool,

    /// Delete the cache file and exit
    #[arg(long, conflicts_with_all = ["schema", "cache_info"])]
    pub clear_cache: bool,

    /// Print the cache location and freshness and exit
    #[arg(long, conflicts_with = "schema")]
    pub cache_info: bool,

    /// Export model weights (as soft links) and metadata into a new directory
    #[arg(long, value_name = "DIR", conflicts_with_all = ["schema", "clear_cache", "cache_info"])]
    pub export: Option<PathBuf>,

    /// Comma-separated model names to export (read from stdin when piped, otherwise all)
    #[arg(long, value_name = "NAMES", value_delimiter = ',', requires = "export")]
    pub models: Vec<String>,

    /// Number of hash characters appended to exported link names
    #[arg(long, value_name = "N", default_value_t = DEFAULT_HASH_LENGTH)]
    pub hash_length: usize,

    /// Set logging level to DEBUG
    #[arg(long)]
    pub debug: bool,
}

/// What the invocation should do
#[derive(Debug)]
pub enum Mode {
    /// Run a search and print the result
    Search,
    /// Print the record schema
    Schema,
    /// Delete the cache file
    ClearCache,
    /// Report cache location and freshness
    CacheInfo,
    /// Export models into a directory
    Export {
        outdir: PathBuf,
        models: Vec<String>,
        hash_length: usize,
    },
}

/// Configuration derived from CLI arguments, validated
#[derive(Debug)]
pub struct QueryConfig {
    pub mode: Mode,
    /// Query given on the command line, if any
    pub query: Option<String>,
    /// Compiled regex filter, if `--regex` was given
    pub matcher: Option<StructuralMatcher>,
    /// Parsed exclude paths, in the order given
    pub exclusions: Vec<PathExpr>,
    pub cache_path: PathBuf,
    pub cache_time: Duration,
    pub source: Option<String>,
}

impl QueryConfig {
    /// Creates a QueryConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(QueryConfig)` when every argument is well-formed
    /// * `Err(CliError)` naming the first argument that is not
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_time = parse_duration(&cli.cache_time)?;

        let matcher = cli
            .regex
            .as_deref()
            .map(|pattern| StructuralMatcher::new(pattern, &cli.regex_path))
            .transpose()?;

        let exclusions = cli
            .exclude
            .iter()
            .map(|path| path.parse::<PathExpr>())
            .collect::<Result<Vec<_>, _>>()?;

        let cache_path = match &cli.cache_path {
            Some(path) => path.clone(),
            None => JsonCache::default_path().ok_or(CliError::NoCacheDir)?,
        };

        let mode = if cli.schema {
            Mode::Schema
        } else if cli.clear_cache {
            Mode::ClearCache
        } else if cli.cache_info {
            Mode::CacheInfo
        } else if let Some(outdir) = &cli.export {
            Mode::Export {
                outdir: outdir.clone(),
                models: cli
                    .models
                    .iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect(),
                hash_length: cli.hash_length,
            }
        } else {
            Mode::Search
        };

        Ok(QueryConfig {
            mode,
            query: cli.query.clone(),
            matcher,
            exclusions,
            cache_path,
            cache_time,
            source: cli.source.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["ollama-data", "--cache-path", "/tmp/ollama-data-test.json"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["ollama-data"]);
        assert!(cli.query.is_none());
        assert!(cli.regex.is_none());
        assert_eq!(cli.regex_path, "@");
        assert!(cli.exclude.is_empty());
        assert_eq!(cli.hash_length, DEFAULT_HASH_LENGTH);
    }

    #[test]
    fn test_cli_parse_query_and_filters() {
        let cli = parse(&[
            "[*].name",
            "--regex",
            "llama",
            "--regex-path",
            "name",
            "--exclude",
            "[*].template",
            "--exclude",
            "[0]",
        ]);
        assert_eq!(cli.query.as_deref(), Some("[*].name"));
        assert_eq!(cli.regex.as_deref(), Some("llama"));
        assert_eq!(cli.regex_path, "name");
        assert_eq!(cli.exclude, ["[*].template", "[0]"]);
    }

    #[test]
    fn test_cli_models_split_on_commas() {
        let cli = parse(&["--export", "/tmp/out", "--models", "llama3,mistral"]);
        assert_eq!(cli.models, ["llama3", "mistral"]);
    }

    #[test]
    fn test_cli_models_require_export() {
        let result = Cli::try_parse_from(["ollama-data", "--models", "llama3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_clear_cache_conflicts_with_schema() {
        let result = Cli::try_parse_from(["ollama-data", "--schema", "--clear-cache"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_defaults_to_search() {
        let config = QueryConfig::from_cli(&parse(&[])).unwrap();
        assert!(matches!(config.mode, Mode::Search));
        assert!(config.matcher.is_none());
        assert_eq!(config.cache_time.elapsed(), TimeDelta::hours(1));
        assert_eq!(config.cache_path, PathBuf::from("/tmp/ollama-data-test.json"));
    }

    #[test]
    fn test_config_modes() {
        let config = QueryConfig::from_cli(&parse(&["--schema"])).unwrap();
        assert!(matches!(config.mode, Mode::Schema));

        let config = QueryConfig::from_cli(&parse(&["--clear-cache"])).unwrap();
        assert!(matches!(config.mode, Mode::ClearCache));

        let config = QueryConfig::from_cli(&parse(&["--cache-info"])).unwrap();
        assert!(matches!(config.mode, Mode::CacheInfo));

        let config =
            QueryConfig::from_cli(&parse(&["--export", "/tmp/out", "--hash-length", "4"])).unwrap();
        match config.mode {
            Mode::Export {
                outdir,
                models,
                hash_length,
            } => {
                assert_eq!(outdir, PathBuf::from("/tmp/out"));
                assert!(models.is_empty());
                assert_eq!(hash_length, 4);
            }
            other => panic!("expected export mode, got {:?}", other),
        }
    }

    #[test]
    fn test_config_rejects_bad_cache_time() {
        let result = QueryConfig::from_cli(&parse(&["--cache-time", "soon"]));
        assert!(matches!(result, Err(CliError::CacheTime(_))));
    }

    #[test]
    fn test_config_rejects_bad_regex() {
        let result = QueryConfig::from_cli(&parse(&["--regex", "(oops"]));
        let err = result.unwrap_err();
        assert!(matches!(err, CliError::Regex(MatchError::Pattern(_))));
        assert!(err.to_string().contains("--regex"));
    }

    #[test]
    fn test_config_rejects_bad_regex_path() {
        let result = QueryConfig::from_cli(&parse(&["--regex", "a", "--regex-path", "[*"]));
        assert!(matches!(result, Err(CliError::Regex(MatchError::Selector(_)))));
    }

    #[test]
    fn test_regex_path_alone_is_not_validated() {
        // Without --regex the selector is never used
        assert!(QueryConfig::from_cli(&parse(&["--regex-path", "[*"])).is_ok());
    }

    #[test]
    fn test_config_rejects_bad_exclude() {
        let result = QueryConfig::from_cli(&parse(&["--exclude", "a.[x]"]));
        assert!(matches!(result, Err(CliError::Exclude(_))));
    }

    #[test]
    fn test_config_parses_exclusions_in_order() {
        let config =
            QueryConfig::from_cli(&parse(&["--exclude", "b", "--exclude", "a.[*]"])).unwrap();
        let rendered: Vec<String> = config.exclusions.iter().map(PathExpr::to_string).collect();
        assert_eq!(rendered, ["b", "a.[*]"]);
    }
}
