//! Path-based exclusion of data inside a JSON tree
//!
//! A path is a dot-separated list of segments. Object segments are a bare key
//! or `*`; array segments are bracketed: `[*]`, `[N]` or a half-open slice
//! `[A:B]` where either bound may be left out. Every segment but the last
//! selects containers to descend into, and the last one names what to delete
//! from each container reached. A segment that does not fit the container it
//! meets (say `[0]` on an object) prunes nothing on that branch.
//!
//! ```text
//! {"a": [{"x": 1, "y": 2}, {"x": 3, "y": 4}]}   --  a.[*].y  -->   {"a": [{"x": 1}, {"x": 3}]}
//! ```

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when parsing a path expression
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path has no segments at all
    #[error("Empty exclude path")]
    Empty,

    /// A segment could not be parsed
    #[error("Malformed segment '{segment}' in exclude path '{path}': {reason}")]
    Malformed {
        path: String,
        segment: String,
        reason: &'static str,
    },
}

/// One step of a path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `*` on an object: every value
    DictWildcard,
    /// A literal object key
    DictKey(String),
    /// `[*]`: every element
    ArrayWildcard,
    /// `[N]`
    ArrayIndex(usize),
    /// `[A:B]`, `[A:]` or `[:B]`
    ArraySlice { start: Option<usize>, end: Option<usize> },
}

impl Segment {
    /// Resolves a slice against an array of `len` elements, clamping both bounds
    fn slice_range(start: Option<usize>, end: Option<usize>, len: usize) -> Range<usize> {
        let end = end.map_or(len, |end| end.min(len));
        let start = start.map_or(0, |start| start.min(end));
        start..end
    }

    /// Removes what this segment names from `node`
    fn delete_from(&self, node: &mut Value) {
        match (node, self) {
            (Value::Object(map), Segment::DictWildcard) => map.clear(),
            (Value::Object(map), Segment::DictKey(key)) => {
                map.shift_remove(key.as_str());
            }
            (Value::Array(items), Segment::ArrayWildcard) => items.clear(),
            (Value::Array(items), Segment::ArrayIndex(index)) => {
                if *index < items.len() {
                    items.remove(*index);
                }
            }
            (Value::Array(items), Segment::ArraySlice { start, end }) => {
                let range = Self::slice_range(*start, *end, items.len());
                items.drain(range);
            }
            _ => {}
        }
    }

    /// Applies `rest` to every child of `node` this segment selects
    fn descend(&self, node: &mut Value, rest: &[Segment]) {
        match (node, self) {
            (Value::Object(map), Segment::DictWildcard) => {
                for child in map.values_mut() {
                    remove_at(child, rest);
                }
            }
            (Value::Object(map), Segment::DictKey(key)) => {
                if let Some(child) = map.get_mut(key.as_str()) {
                    remove_at(child, rest);
                }
            }
            (Value::Array(items), Segment::ArrayWildcard) => {
                for child in items.iter_mut() {
                    remove_at(child, rest);
                }
            }
            (Value::Array(items), Segment::ArrayIndex(index)) => {
                if let Some(child) = items.get_mut(*index) {
                    remove_at(child, rest);
                }
            }
            (Value::Array(items), Segment::ArraySlice { start, end }) => {
                let range = Self::slice_range(*start, *end, items.len());
                for child in &mut items[range] {
                    remove_at(child, rest);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::DictWildcard => write!(f, "*"),
            Segment::DictKey(key) => write!(f, "{}", key),
            Segment::ArrayWildcard => write!(f, "[*]"),
            Segment::ArrayIndex(index) => write!(f, "[{}]", index),
            Segment::ArraySlice { start, end } => {
                let bound = |b: &Option<usize>| b.map(|n| n.to_string()).unwrap_or_default();
                write!(f, "[{}:{}]", bound(start), bound(end))
            }
        }
    }
}

fn remove_at(node: &mut Value, segments: &[Segment]) {
    match segments {
        [] => {}
        [last] => last.delete_from(node),
        [first, rest @ ..] => first.descend(node, rest),
    }
}

/// A parsed exclude path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    segments: Vec<Segment>,
}

impl PathExpr {
    /// The parsed segments, in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Deletes every location this path names inside `tree`
    ///
    /// The tree is mutated through the exclusive borrow; nothing is inserted,
    /// renamed or reordered, and locations that do not exist are ignored.
    pub fn remove_from(&self, tree: &mut Value) {
        remove_at(tree, &self.segments);
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.segments.iter().map(Segment::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl FromStr for PathExpr {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        if path.trim().is_empty() {
            return Err(PathError::Empty);
        }
        let segments = path
            .split('.')
            .map(|segment| parse_segment(path, segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }
}

fn parse_segment(path: &str, raw: &str) -> Result<Segment, PathError> {
    let malformed = |reason| PathError::Malformed {
        path: path.to_string(),
        segment: raw.to_string(),
        reason,
    };

    let segment = raw.trim();
    if segment.is_empty() {
        return Err(malformed("empty segment"));
    }
    if segment == "*" {
        return Ok(Segment::DictWildcard);
    }
    let Some(inner) = segment.strip_prefix('[') else {
        return Ok(Segment::DictKey(segment.to_string()));
    };
    let inner = inner
        .strip_suffix(']')
        .ok_or_else(|| malformed("missing closing ']'"))?;

    parse_selector(inner).ok_or_else(|| malformed("expected '*', an index or a slice"))
}

/// Parses the text between brackets: `*`, `N` or `A:B` with optional bounds
fn parse_selector(inner: &str) -> Option<Segment> {
    let inner: String = inner.chars().filter(|c| !c.is_whitespace()).collect();
    if inner == "*" {
        return Some(Segment::ArrayWildcard);
    }

    let bound = |text: &str| -> Option<Option<usize>> {
        if text.is_empty() {
            Some(None)
        } else if text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse().ok().map(Some)
        } else {
            None
        }
    };

    match inner.split_once(':') {
        Some((start, end)) => Some(Segment::ArraySlice {
            start: bound(start)?,
            end: bound(end)?,
        }),
        None => bound(&inner)?.map(Segment::ArrayIndex),
    }
}

/// Deletes the locations named by each path from `tree`, in order
///
/// All paths are parsed before the tree is touched, so a malformed path leaves
/// the tree unchanged. Later paths see the tree already pruned by earlier ones.
pub fn exclude<S: AsRef<str>>(tree: &mut Value, paths: &[S]) -> Result<(), PathError> {
    let parsed = paths
        .iter()
        .map(|path| path.as_ref().parse::<PathExpr>())
        .collect::<Result<Vec<_>, _>>()?;
    exclude_parsed(tree, &parsed);
    Ok(())
}

/// Deletes the locations named by already parsed paths, in order
pub fn exclude_parsed(tree: &mut Value, paths: &[PathExpr]) {
    for path in paths {
        path.remove_from(tree);
    }
}
