//! Canonical file paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Two separators with nothing between them.
    #[error("invalid path '{input}': empty segment at position {position}")]
    EmptySegment { input: String, position: usize },

    /// A `.` or `..` segment.
    #[error("invalid path '{input}': relative segment '{segment}' at position {position}")]
    RelativeSegment {
        input: String,
        segment: String,
        position: usize,
    },

    /// A segment containing a character that can never appear in a name.
    #[error("invalid path '{input}': invalid character {character:?} in segment '{segment}'")]
    InvalidCharacter {
        input: String,
        segment: String,
        character: char,
    },
}

impl PathError {
    /// The raw input that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            PathError::EmptySegment { input, .. }
            | PathError::RelativeSegment { input, .. }
            | PathError::InvalidCharacter { input, .. } => input,
        }
    }
}

/// A validated, canonical path in a file store.
///
/// A path is a sequence of non-empty segments; the root is the empty
/// sequence. Externally paths are `/`-delimited with a single leading `/`,
/// and the root is written as `/`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilePath {
    segments: Vec<String>,
}

impl FilePath {
    /// The root path.
    pub fn root() -> Self {
        FilePath {
            segments: Vec::new(),
        }
    }

    /// Parse a path string.
    ///
    /// # Path Syntax
    ///
    /// - Segments are separated by `/`
    /// - The leading `/` is optional and a single trailing `/` is ignored
    /// - `""` and `"/"` are the root
    /// - Empty segments (`a//b`), `.` and `..` are rejected
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vfiles_core_store::FilePath;
    ///
    /// let path = FilePath::parse("/a/b/c.txt").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.to_string(), "/a/b/c.txt");
    ///
    /// // A trailing slash names the same directory
    /// assert_eq!(FilePath::parse("/a/b/").unwrap(), FilePath::parse("a/b").unwrap());
    ///
    /// assert!(FilePath::parse("/a//b").is_err());
    /// assert!(FilePath::parse("/a/../b").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let body = input.strip_prefix('/').unwrap_or(input);
        if body.is_empty() {
            return Ok(Self::root());
        }
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        for (position, segment) in body.split('/').enumerate() {
            Self::validate_segment(input, segment, position)?;
            segments.push(segment.to_string());
        }

        Ok(FilePath { segments })
    }

    /// Build a path from individual segments, validating each.
    pub fn try_from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let input = format!("/{}", segments.join("/"));
        for (position, segment) in segments.iter().enumerate() {
            Self::validate_segment(&input, segment, position)?;
        }
        Ok(FilePath { segments })
    }

    fn validate_segment(input: &str, segment: &str, position: usize) -> Result<(), PathError> {
        if segment.is_empty() {
            return Err(PathError::EmptySegment {
                input: input.to_string(),
                position,
            });
        }

        if segment == "." || segment == ".." {
            return Err(PathError::RelativeSegment {
                input: input.to_string(),
                segment: segment.to_string(),
                position,
            });
        }

        if let Some(character) = segment.chars().find(|c| *c == '/' || *c == '\0') {
            return Err(PathError::InvalidCharacter {
                input: input.to_string(),
                segment: segment.to_string(),
                character,
            });
        }

        Ok(())
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Alias for [`FilePath::is_root`].
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The containing directory, or `None` for the root.
    pub fn parent(&self) -> Option<FilePath> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// Split into the parent path and the final segment.
    pub fn split_last(&self) -> Option<(FilePath, &str)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            FilePath {
                segments: rest.to_vec(),
            },
            last.as_str(),
        ))
    }

    /// Append one segment, validating it.
    pub fn child(&self, name: &str) -> Result<FilePath, PathError> {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self::validate_segment(&format!("{}/{}", self.as_prefix(), name), name, self.len())?;
        Ok(FilePath { segments })
    }

    /// Join this path with another.
    #[must_use]
    pub fn join(&self, other: &FilePath) -> FilePath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FilePath { segments }
    }

    /// Check if this path equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &FilePath) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix.segments == self.segments[..prefix.segments.len()]
    }

    /// Strip a prefix from this path.
    ///
    /// Returns `None` if the prefix doesn't match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &FilePath) -> Option<FilePath> {
        if self.starts_with(prefix) {
            Some(FilePath {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }

    /// Get a range of segments as a new path.
    pub fn slice(&self, start: usize, end: usize) -> FilePath {
        FilePath {
            segments: self.segments[start..end].to_vec(),
        }
    }

    /// Proper ancestors from the parent up to, but excluding, the root.
    pub fn ancestors(&self) -> impl Iterator<Item = FilePath> + '_ {
        (1..self.len()).rev().map(move |end| self.slice(0, end))
    }

    fn as_prefix(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FilePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilePath::parse(s)
    }
}

impl std::ops::Index<usize> for FilePath {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.segments[i]
    }
}

impl Serialize for FilePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FilePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FilePath::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use vfiles_core_store::file_path;
///
/// let p = file_path!("/a/b/c.txt");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! file_path {
    ($s:expr) => {
        $crate::FilePath::parse($s).expect("invalid path literal")
    };
}
