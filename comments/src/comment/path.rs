use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const SEPARATOR: char = '/';

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path `{path}` has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },

    #[error("Path segment `{segment}` is not a valid id")]
    InvalidSegment { segment: String },
}

/// A materialized path: the ids of every ancestor of a comment, root first,
/// followed by the comment's own id, joined by [`SEPARATOR`].
///
/// A value of this type is always well-formed. Every constructor validates
/// its input, so the relation tests below never have to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterializedPath(String);

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty()
        || !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(PathError::InvalidSegment {
            segment: segment.to_string(),
        });
    }
    Ok(())
}

impl MaterializedPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        for (position, segment) in path.split(SEPARATOR).enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    path: path.to_string(),
                    position,
                });
            }
            validate_segment(segment)?;
        }

        Ok(MaterializedPath(path.to_string()))
    }

    /// The path of a comment without a parent is its own id.
    pub fn root(id: impl fmt::Display) -> Result<Self, PathError> {
        let segment = id.to_string();
        validate_segment(&segment)?;
        Ok(MaterializedPath(segment))
    }

    pub fn child(&self, id: impl fmt::Display) -> Result<Self, PathError> {
        let segment = id.to_string();
        validate_segment(&segment)?;
        Ok(MaterializedPath(format!("{}{SEPARATOR}{segment}", self.0)))
    }

    /// `parent.path + "/" + id`, or just `id` when there is no parent.
    pub fn encode(parent: Option<&MaterializedPath>, id: impl fmt::Display) -> Result<Self, PathError> {
        match parent {
            Some(parent) => parent.child(id),
            None => MaterializedPath::root(id),
        }
    }

    /// True iff `ancestor` is a strict, separator-aligned prefix of this path,
    /// so `1/20` is not a descendant of `1/2`.
    pub fn is_descendant_of(&self, ancestor: &MaterializedPath) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0[ancestor.0.len()..].starts_with(SEPARATOR)
    }

    pub fn depth(&self) -> usize {
        self.0.matches(SEPARATOR).count()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn last_segment(&self) -> &str {
        self.0
            .rsplit_once(SEPARATOR)
            .map_or(self.0.as_str(), |(_, last)| last)
    }

    /// The id segment right before this path's own id, if any.
    pub fn parent_segment(&self) -> Option<&str> {
        let (head, _) = self.0.rsplit_once(SEPARATOR)?;
        Some(head.rsplit_once(SEPARATOR).map_or(head, |(_, parent)| parent))
    }

    pub fn contains_segment(&self, segment: &str) -> bool {
        self.segments().any(|s| s == segment)
    }

    /// Every descendant path starts with this string and nothing else does.
    pub fn descendant_prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MaterializedPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterializedPath::parse(s)
    }
}

impl TryFrom<String> for MaterializedPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MaterializedPath::parse(&value)
    }
}

impl From<MaterializedPath> for String {
    fn from(path: MaterializedPath) -> Self {
        path.0
    }
}
