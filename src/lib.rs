//! ollama-data library
//!
//! A time-to-live JSON cache of model records plus the tools to view them:
//! JMESPath queries, structural regex filtering and path-based exclusion.

pub mod cache;
pub mod cli;
pub mod data;
pub mod duration;
pub mod error;
pub mod export;
pub mod query;

pub use cache::{CacheError, JsonCache};
pub use data::{Collection, DataProvider, Record};
pub use duration::{parse_duration, parse_duration_at, Duration};
pub use error::Error;
pub use query::exclude::{exclude, PathExpr};
pub use query::matcher::regex_path_matcher;
pub use query::{ModelData, Search};
