#![forbid(unsafe_code)]

//! Property paths and their resolution to `(target, key)` pairs.
//!
//! A path is written as a dotted string. Two prefixes change where the walk
//! starts:
//!
//! | Form      | Variant                               | Root when none given |
//! |-----------|---------------------------------------|----------------------|
//! | `"a.b"`   | [`PropertyPath::Absolute`]            | [`global_root`](crate::global_root) |
//! | `".a.b"`  | [`PropertyPath::RelativeToPartner`]   | partner endpoint's root |
//! | `"*a.b"`  | [`PropertyPath::ChainedFromPartner`]  | partner endpoint's root |
//!
//! In the chained form every further `*` reads as `.`, so `"*owner*value"`
//! and `"*owner.value"` are the same path.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Intermediate unset or not an object | `resolve` returns `None` |
//! | No root available | `resolve` returns `None` |
//! | Empty path or empty segment | `parse` returns [`PathError`]; `From<&str>` drops empty segments |

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::object::{ObjectRef, global_root_ref};
use crate::value::Value;

/// Errors from strict path parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path had no segments.
    Empty,
    /// A segment between two dots was empty.
    EmptySegment { path: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "property path is empty"),
            Self::EmptySegment { path } => write!(f, "empty segment in property path '{path}'"),
        }
    }
}

impl std::error::Error for PathError {}

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// Plain dotted path.
    Absolute(Vec<String>),
    /// `.`-prefixed path, rooted at the partner endpoint by default.
    RelativeToPartner(Vec<String>),
    /// `*`-prefixed path, rooted at the partner endpoint by default.
    ChainedFromPartner(Vec<String>),
}

impl PropertyPath {
    /// Strictly parse a path string.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let (ctor, body) = split_prefix(raw);
        if body.is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for segment in body.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    path: raw.to_owned(),
                });
            }
            segments.push(segment.to_owned());
        }
        Ok(ctor(segments))
    }

    /// Build an absolute path from explicit segments.
    #[must_use]
    pub fn from_segments<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self::Absolute(segments.into_iter().map(Into::into).collect())
    }

    /// The path's segments, prefix removed.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Absolute(s) | Self::RelativeToPartner(s) | Self::ChainedFromPartner(s) => s,
        }
    }

    /// The terminal key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.segments().last().map(String::as_str)
    }

    /// Whether the default root is the partner endpoint's root.
    #[must_use]
    pub fn is_partner_relative(&self) -> bool {
        !matches!(self, Self::Absolute(_))
    }

    /// Whether the path has no segments and can never resolve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments().is_empty()
    }
}

type PathCtor = fn(Vec<String>) -> PropertyPath;

fn split_prefix(raw: &str) -> (PathCtor, std::borrow::Cow<'_, str>) {
    if let Some(rest) = raw.strip_prefix('.') {
        (PropertyPath::RelativeToPartner, rest.into())
    } else if let Some(rest) = raw.strip_prefix('*') {
        (PropertyPath::ChainedFromPartner, rest.replace('*', ".").into())
    } else {
        (PropertyPath::Absolute, raw.into())
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Lenient conversion: empty segments are dropped. An empty result never
/// resolves.
impl From<&str> for PropertyPath {
    fn from(raw: &str) -> Self {
        let (ctor, body) = split_prefix(raw);
        ctor(
            body.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

impl From<String> for PropertyPath {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(_) => {}
            Self::RelativeToPartner(_) => f.write_str(".")?,
            Self::ChainedFromPartner(_) => f.write_str("*")?,
        }
        f.write_str(&self.segments().join("."))
    }
}

/// One side of a binding: a path plus an optional explicit root.
#[derive(Clone)]
pub struct Endpoint {
    pub path: PropertyPath,
    pub root: Option<ObjectRef>,
}

impl Endpoint {
    /// Endpoint without an explicit root.
    #[must_use]
    pub fn new(path: impl Into<PropertyPath>) -> Self {
        Self {
            path: path.into(),
            root: None,
        }
    }

    /// Endpoint rooted at `root`. This is the structured `(root, "a.b")`
    /// form.
    #[must_use]
    pub fn rooted(root: ObjectRef, path: impl Into<PropertyPath>) -> Self {
        Self {
            path: path.into(),
            root: Some(root),
        }
    }

    /// Pick the object the walk starts from. `context` is the partner
    /// endpoint's root.
    #[must_use]
    pub fn effective_root(&self, context: Option<&ObjectRef>) -> Option<ObjectRef> {
        if let Some(root) = &self.root {
            return Some(Rc::clone(root));
        }
        match self.path {
            PropertyPath::Absolute(_) => Some(global_root_ref()),
            PropertyPath::RelativeToPartner(_) | PropertyPath::ChainedFromPartner(_) => {
                context.cloned()
            }
        }
    }

    /// Resolve this endpoint to its current `(target, key)`.
    #[must_use]
    pub fn resolve(&self, context: Option<&ObjectRef>) -> Option<(ObjectRef, String)> {
        let root = self.effective_root(context)?;
        resolve_segments(&root, self.path.segments())
    }
}

impl From<PropertyPath> for Endpoint {
    fn from(path: PropertyPath) -> Self {
        Self { path, root: None }
    }
}

impl From<&str> for Endpoint {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Endpoint {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path.to_string())
            .field("rooted", &self.root.is_some())
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "<{:p}>:{}", Rc::as_ptr(root), self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Walk all but the last segment from `root`. Returns the object holding the
/// last segment and that segment's name.
#[must_use]
pub fn resolve_segments(root: &ObjectRef, segments: &[String]) -> Option<(ObjectRef, String)> {
    let (key, intermediate) = segments.split_last()?;
    let mut target = Rc::clone(root);
    for segment in intermediate {
        target = match target.get(segment) {
            Value::Object(next) => next,
            _ => return None,
        };
    }
    Some((target, key.clone()))
}
