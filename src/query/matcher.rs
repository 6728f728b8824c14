//! Structural regex matching over JSON values
//!
//! A JMESPath selector picks a view out of a value, the view is rendered to
//! text, and a regex is searched (not fully matched) against that text. In
//! elementwise mode each top-level element is tested on its own and the
//! container is filtered down to the elements whose view matches.

use std::fmt;

use jmespath::{Expression, JmespathError};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Selector that views the whole value
pub const WHOLE_VALUE: &str = "@";

/// Errors that can occur when matching
#[derive(Debug, Error)]
pub enum MatchError {
    /// The input cannot be represented as JSON
    #[error("Value is not JSON-compatible: {0}")]
    NotSerializable(#[source] serde_json::Error),

    /// The regex does not compile
    #[error("Invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The selector does not compile or fails while evaluating
    #[error("Invalid selector: {0}")]
    Selector(#[from] JmespathError),

    /// A selector result could not be turned back into JSON
    #[error("Selector produced a non-JSON view: {0}")]
    View(#[source] serde_json::Error),
}

/// A compiled regex paired with the selector producing the view it is tested on
pub struct StructuralMatcher {
    regex: Regex,
    selector: Expression<'static>,
}

impl fmt::Debug for StructuralMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralMatcher")
            .field("regex", &self.regex.as_str())
            .field("selector", &self.selector.as_str())
            .finish()
    }
}

impl StructuralMatcher {
    /// Compiles `pattern` and `selector`
    ///
    /// # Returns
    /// * `Ok(StructuralMatcher)` if both compile
    /// * `Err(MatchError::Pattern)` for an invalid regex
    /// * `Err(MatchError::Selector)` for an invalid selector
    pub fn new(pattern: &str, selector: &str) -> Result<Self, MatchError> {
        let regex = Regex::new(pattern)?;
        let selector = jmespath::compile(selector)?;
        Ok(Self { regex, selector })
    }

    /// Whether the view that the selector takes of `value` contains a match
    ///
    /// A `null` view (the selector found nothing) never matches.
    pub fn is_match(&self, value: &Value) -> Result<bool, MatchError> {
        let view = self.selector.search(value)?;
        let view = serde_json::to_value(&*view).map_err(MatchError::View)?;
        Ok(render_view(&view).is_some_and(|text| self.regex.is_match(&text)))
    }

    /// Filters `value` by its views
    ///
    /// Elementwise, arrays keep the elements whose view matches and objects keep
    /// the entries `(k, v)` for which the singleton object `{k: v}` matches, so
    /// a selector can refer to the key. Scalars, and any value when
    /// `elementwise` is false, are returned unchanged on a match and as `null`
    /// otherwise. Order is preserved.
    pub fn filter(&self, value: &Value, elementwise: bool) -> Result<Value, MatchError> {
        match value {
            Value::Array(items) if elementwise => {
                let mut kept = Vec::new();
                for item in items {
                    if self.is_match(item)? {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::Array(kept))
            }
            Value::Object(map) if elementwise => {
                let mut kept = Map::new();
                for (key, item) in map {
                    let mut single = Map::new();
                    single.insert(key.clone(), item.clone());
                    let single = Value::Object(single);
                    if self.is_match(&single)? {
                        kept.insert(key.clone(), item.clone());
                    }
                }
                Ok(Value::Object(kept))
            }
            _ => {
                if self.is_match(value)? {
                    Ok(value.clone())
                } else {
                    Ok(Value::Null)
                }
            }
        }
    }
}

/// Renders a view to the text the regex is searched in
///
/// Strings are matched on their raw contents; every other view on its compact
/// JSON encoding. `null` has no text.
fn render_view(view: &Value) -> Option<String> {
    match view {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Matches `pattern` against the views `selector` takes of `value`
///
/// The value is checked for JSON compatibility before the pattern or selector
/// are compiled. See [`StructuralMatcher::filter`] for the elementwise rules.
pub fn regex_path_matcher<T>(
    value: &T,
    pattern: &str,
    selector: &str,
    elementwise: bool,
) -> Result<Value, MatchError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(MatchError::NotSerializable)?;
    let matcher = StructuralMatcher::new(pattern, selector)?;
    matcher.filter(&value, elementwise)
}
