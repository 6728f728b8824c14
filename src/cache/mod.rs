//! Cache module for storing the model collection on disk
//!
//! This module provides a time-to-live JSON cache. A saved collection stays
//! valid for a configured duration measured from the file's last write, after
//! which the caller is expected to regenerate and save it again.

mod manager;

pub use manager::{CacheError, JsonCache};
