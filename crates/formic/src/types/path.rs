//! Field paths: stable locators for values inside the model
//!
//! A [`FieldPath`] is an ordered sequence of object keys and array indices
//! identifying one location in the model tree. Paths are parsed from dotted
//! text (`"guests[0].firstName"` or the equivalent `"guests.0.firstName"`)
//! and render back in the bracketed form. They are the identifiers under
//! which rules are registered and errors are looked up.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// SEGMENTS
// ============================================================================

/// One step of a [`FieldPath`]: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object member access by key.
    Key(String),
    /// Array element access by position.
    Index(usize),
}

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

// ============================================================================
// FIELD PATH
// ============================================================================

/// Locator for a value within the structured model.
///
/// # Examples
///
/// ```rust
/// use formic::FieldPath;
///
/// let path: FieldPath = "guests[0].firstName".parse().unwrap();
/// assert_eq!(path.to_string(), "guests[0].firstName");
/// assert_eq!(path.segments().len(), 3);
///
/// // Bare numeric segments are indices too.
/// let same: FieldPath = "guests.0.firstName".parse().unwrap();
/// assert_eq!(path, same);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Builds a path from raw segments.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Parses a dotted path such as `"contact.email"` or `"guests[2].age"`.
    ///
    /// Returns [`PathParseError`] for empty input, empty segments, or
    /// malformed bracket indices.
    pub fn parse(text: &str) -> Result<Self, PathParseError> {
        if text.is_empty() {
            return Err(PathParseError::empty(text));
        }
        let mut segments = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(PathParseError::empty_segment(text));
            }
            Self::parse_part(part, text, &mut segments)?;
        }
        Ok(Self(segments))
    }

    /// Parses one dot-separated part, which may carry bracket suffixes
    /// (`guests[0][1]`) or be a bare index (`0`).
    fn parse_part(
        part: &str,
        full: &str,
        segments: &mut Vec<Segment>,
    ) -> Result<(), PathParseError> {
        let (head, rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };

        if head.is_empty() {
            return Err(PathParseError::empty_segment(full));
        }
        if let Ok(index) = head.parse::<usize>() {
            segments.push(Segment::Index(index));
        } else {
            segments.push(Segment::Key(head.to_owned()));
        }

        let mut rest = rest;
        while !rest.is_empty() {
            let Some(stripped) = rest.strip_prefix('[') else {
                return Err(PathParseError::bad_index(full));
            };
            let Some(close) = stripped.find(']') else {
                return Err(PathParseError::bad_index(full));
            };
            let index = stripped[..close]
                .parse::<usize>()
                .map_err(|_| PathParseError::bad_index(full))?;
            segments.push(Segment::Index(index));
            rest = &stripped[close + 1..];
        }
        Ok(())
    }

    /// Returns the path's segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Appends an array index, yielding the element path.
    #[must_use]
    pub fn element(&self, index: usize) -> FieldPath {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Concatenates another (relative) path onto this one.
    #[must_use]
    pub fn join(&self, relative: &FieldPath) -> FieldPath {
        let mut segments = self.0.clone();
        segments.extend(relative.0.iter().cloned());
        Self(segments)
    }

    /// Whether `self` equals `prefix` or lies inside its subtree.
    #[must_use]
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Renders the path as a JSON Pointer (RFC 6901) for model traversal.
    #[must_use]
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.0 {
            pointer.push('/');
            match segment {
                Segment::Key(key) => {
                    // RFC 6901 escaping: ~ then /
                    pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                }
                Segment::Index(index) => {
                    pointer.push_str(&index.to_string());
                }
            }
        }
        pointer
    }

    /// Looks up the value at this path, if present.
    #[must_use]
    pub fn lookup<'a>(&self, model: &'a Value) -> Option<&'a Value> {
        model.pointer(&self.to_pointer())
    }

    /// Replaces the value at this path, returning `false` when the path does
    /// not exist in the model. Intermediate containers are never created.
    pub fn set_in(&self, model: &mut Value, value: Value) -> bool {
        match model.pointer_mut(&self.to_pointer()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Error produced when a path string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field path `{text}`: {reason}")]
pub struct PathParseError {
    text: String,
    reason: &'static str,
}

impl PathParseError {
    fn empty(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            reason: "path is empty",
        }
    }

    fn empty_segment(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            reason: "empty segment",
        }
    }

    fn bad_index(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            reason: "malformed array index",
        }
    }
}

// ============================================================================
// MODEL REF
// ============================================================================

/// Read-only accessor over a model snapshot, handed to cross-field
/// predicates, activation conditions, and async params functions.
///
/// # Examples
///
/// ```rust
/// use formic::ModelRef;
/// use serde_json::json;
///
/// let model = json!({"includeBreakfast": true, "breakfastCount": 2});
/// let m = ModelRef::new(&model);
/// assert_eq!(m.bool_at("includeBreakfast"), Some(true));
/// assert_eq!(m.f64_at("breakfastCount"), Some(2.0));
/// assert_eq!(m.str_at("missing"), None);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelRef<'a>(&'a Value);

impl<'a> ModelRef<'a> {
    /// Wraps a model value.
    #[must_use]
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> &'a Value {
        self.0
    }

    /// Looks up a value by dotted path; `None` when the path is malformed
    /// or absent.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        FieldPath::parse(path).ok()?.lookup(self.0)
    }

    /// String at `path`, if it is a string.
    #[must_use]
    pub fn str_at(&self, path: &str) -> Option<&'a str> {
        self.get(path)?.as_str()
    }

    /// Boolean at `path`, if it is a boolean.
    #[must_use]
    pub fn bool_at(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    /// Number at `path` as `f64`, if it is a number.
    #[must_use]
    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_f64()
    }
}

// ============================================================================
// STANDARD TESTS
// ============================================================================
