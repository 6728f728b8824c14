//! Model records and where they come from
//!
//! Records are untyped JSON values: the inventory tool decides their fields.
//! The only thing the rest of the crate needs from a data source is the
//! ability to regenerate the whole collection on a cache miss.

pub mod provider;

pub use provider::{CommandProvider, ProviderError};

use serde::Serialize;
use serde_json::{json, Value};

/// One model's data
pub type Record = Value;

/// The full ordered set of model records; the unit the cache stores
pub type Collection = Vec<Record>;

/// A source of model records
pub trait DataProvider {
    /// Produces every record from scratch
    fn regenerate(&self) -> Result<Collection, ProviderError>;
}

impl<F> DataProvider for F
where
    F: Fn() -> Result<Collection, ProviderError>,
{
    fn regenerate(&self) -> Result<Collection, ProviderError> {
        self()
    }
}

/// Shape of a model record as produced by the inventory tool
pub fn schema() -> Value {
    json!([{
        "name": "<str>",
        "model_params": "<dict>",
        "system_message": "<list[str]>",
        "total_weights_size": "<float>",
        "total_weights_size_units": "<str>",
        "template": "<list[str]>",
        "modelfile": "<str|None>",
        "last_modified": "<str>",
        "age": {
            "years": "<int>",
            "months": "<int>",
            "weeks": "<int>",
            "days": "<int>",
            "hours": "<int>",
            "minutes": "<int>",
            "seconds": "<int>"
        },
        "weights": [{
            "hash": "<str>",
            "file_path": "<str>",
            "file_name": "<str>",
            "dir": "<str>",
            "file_size": "<float>",
            "file_size_units": "<str>",
            "last_modification": "<str>",
            "metadata_change_time": "<str>"
        }]
    }])
}

/// Encodes `value` as JSON indented by four spaces, the format of every file this crate writes
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Returns the `name` field of a record, if it has a string one
pub fn record_name(record: &Record) -> Option<&str> {
    record.get("name").and_then(Value::as_str)
}
