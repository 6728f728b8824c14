//! Querying the cached model collection
//!
//! `ModelData` keeps the collection fresh (regenerating through its data
//! provider when the cache is missing or stale) and runs searches over it. A
//! search is a JMESPath query, optionally followed by a structural regex filter
//! on the result and then by removal of excluded paths.

pub mod exclude;
pub mod matcher;

use std::fmt;

use chrono::{DateTime, Utc};
use jmespath::Expression;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::JsonCache;
use crate::data::{record_name, schema, Collection, DataProvider, Record};
use crate::error::Error;
use exclude::{exclude_parsed, PathExpr};
use matcher::{StructuralMatcher, WHOLE_VALUE};

/// Query that returns every record
pub const ALL_RECORDS: &str = "[*]";

/// Tag that does not count towards a name's length in prefix lookups
const LATEST_TAG: &str = ":latest";

/// A validated search: query, optional regex filter and exclude paths
pub struct Search {
    query: Expression<'static>,
    matcher: Option<StructuralMatcher>,
    exclusions: Vec<PathExpr>,
}

impl fmt::Debug for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("query", &self.query.as_str())
            .field("matcher", &self.matcher)
            .field("exclusions", &self.exclusions)
            .finish()
    }
}

impl Search {
    /// Compiles a JMESPath query
    pub fn new(query: &str) -> Result<Self, Error> {
        let query = jmespath::compile(query).map_err(|source| Error::Query {
            query: query.to_string(),
            source,
        })?;
        Ok(Self {
            query,
            matcher: None,
            exclusions: Vec::new(),
        })
    }

    /// Filters the query result elementwise with `matcher`
    pub fn with_matcher(mut self, matcher: StructuralMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Removes `paths` from the (filtered) result
    pub fn with_exclusions(mut self, paths: Vec<PathExpr>) -> Self {
        self.exclusions = paths;
        self
    }

    /// Runs the search over `collection`
    pub fn apply(&self, collection: &Collection) -> Result<Value, Error> {
        let query_error = |source| Error::Query {
            query: self.query.as_str().to_string(),
            source,
        };
        let found = self.query.search(collection).map_err(query_error)?;
        let mut output = serde_json::to_value(&*found).map_err(|source| Error::QueryResult {
            query: self.query.as_str().to_string(),
            source,
        })?;

        if let Some(matcher) = &self.matcher {
            output = matcher.filter(&output, true)?;
        }
        exclude_parsed(&mut output, &self.exclusions);

        Ok(output)
    }
}

/// The model collection behind a TTL cache
///
/// Reads go through the cache; when it is missing or stale the provider
/// regenerates the whole collection, which is saved before being read back.
#[derive(Debug)]
pub struct ModelData<P> {
    cache: JsonCache,
    provider: P,
}

impl<P: DataProvider> ModelData<P> {
    /// Creates a view over `cache`, refilled from `provider` when needed
    pub fn new(cache: JsonCache, provider: P) -> Self {
        Self { cache, provider }
    }

    /// The underlying cache
    pub fn cache(&self) -> &JsonCache {
        &self.cache
    }

    /// Schema of a model record
    pub fn schema() -> Value {
        schema()
    }

    /// Every record, regenerating and saving them first if the cache is not valid
    pub fn models(&self) -> Result<Collection, Error> {
        self.models_at(Utc::now())
    }

    /// Every record, judging cache freshness once at `now`
    ///
    /// A freshly regenerated collection is returned as saved, without a second
    /// freshness check.
    pub fn models_at(&self, now: DateTime<Utc>) -> Result<Collection, Error> {
        if self.cache.is_valid_at(now) {
            return Ok(self.cache.load_at(now)?);
        }

        info!(path = %self.cache.path().display(), "cache missing or expired, regenerating");
        let collection = self.provider.regenerate()?;
        self.cache.save(&collection)?;
        Ok(collection)
    }

    /// Number of records
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.models()?.len())
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Record at `index`
    pub fn get(&self, index: usize) -> Result<Record, Error> {
        let mut models = self.models()?;
        let len = models.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(models.swap_remove(index))
    }

    /// Names of all records that have one, in collection order
    pub fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .models()?
            .iter()
            .filter_map(record_name)
            .map(str::to_string)
            .collect())
    }

    /// The most specific record whose name starts with `name`
    ///
    /// Among all prefix matches the shortest name wins, where a trailing
    /// `:latest` tag does not count towards the length; ties go to the earlier
    /// record.
    pub fn model(&self, name: &str) -> Result<Record, Error> {
        let models = self.models()?;
        select_by_prefix(models, name).ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }

    /// Runs a query, then an optional regex filter, then exclusions
    ///
    /// Everything is validated before the cache is consulted.
    ///
    /// # Arguments
    /// * `query` - JMESPath query over the collection
    /// * `regex` - Pattern the result's elements must contain, if any
    /// * `regex_selector` - JMESPath view of each element the pattern is tested on
    /// * `exclude_paths` - Paths removed from the final result
    pub fn search<S: AsRef<str>>(
        &self,
        query: &str,
        regex: Option<&str>,
        regex_selector: &str,
        exclude_paths: &[S],
    ) -> Result<Value, Error> {
        let mut search = Search::new(query)?;
        if let Some(pattern) = regex {
            search = search.with_matcher(StructuralMatcher::new(pattern, regex_selector)?);
        }
        let exclusions = exclude_paths
            .iter()
            .map(|path| path.as_ref().parse::<PathExpr>())
            .collect::<Result<Vec<_>, _>>()?;

        self.run(&search.with_exclusions(exclusions))
    }

    /// Runs a prepared search
    pub fn run(&self, search: &Search) -> Result<Value, Error> {
        debug!(?search, "running search");
        search.apply(&self.models()?)
    }

    /// Runs `query` with no filtering
    pub fn query(&self, query: &str) -> Result<Value, Error> {
        self.search::<&str>(query, None, WHOLE_VALUE, &[])
    }
}

/// Length used to rank prefix matches
fn ranked_len(name: &str) -> usize {
    name.strip_suffix(LATEST_TAG).unwrap_or(name).len()
}

fn select_by_prefix(models: Collection, prefix: &str) -> Option<Record> {
    models
        .into_iter()
        .filter(|record| record_name(record).is_some_and(|name| name.starts_with(prefix)))
        .min_by_key(|record| record_name(record).map_or(usize::MAX, ranked_len))
}
