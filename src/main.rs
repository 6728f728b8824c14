//! ollama-data - search, filter and prune a cached inventory of local models
//!
//! Prints JSON on stdout; logs go to stderr.

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ollama_data::cli::{Cli, Mode, QueryConfig};
use ollama_data::data::{to_pretty_json, CommandProvider, DataProvider, ProviderError};
use ollama_data::error::Error;
use ollama_data::export::export_models;
use ollama_data::query::{Search, ALL_RECORDS};
use ollama_data::{Collection, JsonCache, ModelData};

type BoxedProvider = Box<dyn Fn() -> Result<Collection, ProviderError>>;

/// Sets up stderr logging; `RUST_LOG` applies unless `--debug` is given
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Reads stdin when it is piped, returning `None` for a terminal or empty input
fn read_piped_stdin() -> io::Result<Option<String>> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin.read_to_string(&mut buf)?;
    let trimmed = buf.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn print_json(value: &Value) -> Result<(), Error> {
    let encoded = to_pretty_json(value)?;
    println!("{}", String::from_utf8_lossy(&encoded));
    Ok(())
}

fn build_provider(source: Option<String>) -> BoxedProvider {
    match source {
        Some(command) => {
            let provider = CommandProvider::new(command);
            Box::new(move || provider.regenerate())
        }
        None => Box::new(|| Err(ProviderError::NotConfigured)),
    }
}

fn run(config: QueryConfig) -> Result<(), Error> {
    let cache = JsonCache::new(&config.cache_path, config.cache_time)?;
    let data = ModelData::new(cache, build_provider(config.source));

    match config.mode {
        Mode::Schema => print_json(&ModelData::<BoxedProvider>::schema()),
        Mode::ClearCache => {
            data.cache().clear()?;
            info!(path = %data.cache().path().display(), "cache cleared");
            Ok(())
        }
        Mode::CacheInfo => {
            let cache = data.cache();
            print_json(&json!({
                "path": cache.path().display().to_string(),
                "valid": cache.is_valid(),
                "time_remaining_seconds": cache.time_remaining().num_seconds(),
                "ttl_seconds": cache.ttl().num_seconds(),
            }))
        }
        Mode::Export {
            outdir,
            models,
            hash_length,
        } => {
            let names = if !models.is_empty() {
                models
            } else if let Some(piped) = read_piped_stdin()? {
                piped.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect()
            } else {
                data.names()?
            };
            debug!(count = names.len(), "exporting models");

            let records = names
                .iter()
                .map(|name| data.model(name))
                .collect::<Result<Vec<_>, _>>()?;
            let written = export_models(&records, &outdir, hash_length)?;
            info!(count = written.len(), outdir = %outdir.display(), "models exported");
            Ok(())
        }
        Mode::Search => {
            let query = match config.query {
                Some(query) => query,
                None => read_piped_stdin()?.unwrap_or_else(|| ALL_RECORDS.to_string()),
            };
            debug!(%query, "query received");

            let mut search = Search::new(&query)?.with_exclusions(config.exclusions);
            if let Some(matcher) = config.matcher {
                search = search.with_matcher(matcher);
            }
            print_json(&data.run(&search)?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    debug!(?cli, "arguments received");

    let result = QueryConfig::from_cli(&cli)
        .map_err(Error::from)
        .and_then(run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
