//! External inventory command as a data source
//!
//! Runs a configured command and reads the model collection from its standard
//! output. The command may print either a JSON array of records or a JSON
//! object mapping model names to records.

use std::io;
use std::process::Command;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::{Collection, DataProvider};

/// Errors that can occur when regenerating records
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No data source is configured but the cache needs regenerating
    #[error("Cache is missing or expired and no data source is configured (see --source)")]
    NotConfigured,

    /// The command could not be started
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command exited unsuccessfully
    #[error("'{command}' failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The command output is not JSON
    #[error("'{command}' did not print valid JSON: {source}")]
    Output {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The command printed JSON that is neither an array nor an object
    #[error("'{command}' printed a JSON {found}, expected an array or an object of records")]
    UnexpectedShape { command: String, found: &'static str },
}

/// Regenerates records by running an inventory command through the shell
#[derive(Debug, Clone)]
pub struct CommandProvider {
    /// Shell command line, e.g. `ollama-inventory --json`
    command: String,
}

impl CommandProvider {
    /// Creates a provider that runs `command` with `sh -c`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self) -> Result<String, ProviderError> {
        debug!(command = %self.command, "running inventory command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .map_err(|source| ProviderError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProviderError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DataProvider for CommandProvider {
    fn regenerate(&self) -> Result<Collection, ProviderError> {
        let stdout = self.run()?;
        let value: Value = serde_json::from_str(&stdout).map_err(|source| ProviderError::Output {
            command: self.command.clone(),
            source,
        })?;
        let collection = into_collection(&self.command, value)?;
        info!(count = collection.len(), "regenerated model records");
        Ok(collection)
    }
}

/// Turns command output into an ordered collection
///
/// A name-to-record object becomes one record per entry; object records that
/// lack a `name` field get the entry's key as their name.
fn into_collection(command: &str, value: Value) -> Result<Collection, ProviderError> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(name, mut record)| {
                if let Value::Object(fields) = &mut record {
                    fields.entry("name").or_insert(Value::String(name));
                }
                record
            })
            .collect()),
        other => Err(ProviderError::UnexpectedShape {
            command: command.to_string(),
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
