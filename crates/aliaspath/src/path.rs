//! The alias-vs-absolute path value and its wire form.
//!
//! An [`AliasPath`] is either a concrete OS path or a symbolic root name
//! plus an optional relative remainder. The remainder is always stored
//! with `/` separators and no leading, trailing, or doubled separators,
//! which is what makes `parse(format(x)) == x` hold.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::AliasPathError;

/// A path expressed either concretely or relative to a named location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasPath {
    /// A concrete OS path.
    Absolute(PathBuf),
    /// A symbolic root name plus an optional relative remainder.
    Alias {
        /// The alias name, without the surrounding `%` markers.
        name: String,
        /// `/`-normalized relative remainder; empty at the location root.
        remainder: String,
    },
}

impl AliasPath {
    /// Creates an alias path, normalizing the remainder.
    pub fn alias(name: impl Into<String>, remainder: &str) -> Self {
        Self::Alias {
            name: name.into(),
            remainder: normalize_remainder(remainder),
        }
    }

    /// Creates a concrete path.
    pub fn absolute(path: impl Into<PathBuf>) -> Self {
        Self::Absolute(path.into())
    }

    /// Parses the wire form. Total: any string that is not a well-formed
    /// `%NAME%...` prefix is treated as a concrete OS path.
    pub fn parse(input: &str) -> Self {
        if let Some(rest) = input.strip_prefix('%') {
            if let Some(close) = rest.find('%') {
                let name = &rest[..close];
                if !name.is_empty() && !name.contains(['/', '\\']) {
                    return Self::Alias {
                        name: name.to_string(),
                        remainder: normalize_remainder(&rest[close + 1..]),
                    };
                }
            }
        }
        Self::Absolute(PathBuf::from(input))
    }

    /// Returns the alias name, if this is an alias-rooted path.
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Self::Alias { name, .. } => Some(name),
            Self::Absolute(_) => None,
        }
    }

    /// Returns the concrete path, if this is not alias-rooted.
    pub fn as_absolute(&self) -> Option<&Path> {
        match self {
            Self::Absolute(path) => Some(path),
            Self::Alias { .. } => None,
        }
    }

    /// Whether this path sits exactly at an alias root (empty remainder).
    pub fn is_alias_root(&self) -> bool {
        matches!(self, Self::Alias { remainder, .. } if remainder.is_empty())
    }

    /// Joins a relative, possibly multi-segment text onto this path.
    ///
    /// The text is normalized to `/` separators; an empty text returns the
    /// path unchanged. Parent tokens are not interpreted here; rejecting
    /// them is the access policy's job.
    pub fn join_relative(&self, text: &str) -> Self {
        let rel = normalize_remainder(text);
        if rel.is_empty() {
            return self.clone();
        }
        match self {
            Self::Alias { name, remainder } => {
                let remainder = if remainder.is_empty() {
                    rel
                } else {
                    format!("{remainder}/{rel}")
                };
                Self::Alias {
                    name: name.clone(),
                    remainder,
                }
            }
            Self::Absolute(base) => {
                let joined = rel.split('/').fold(base.clone(), |acc, seg| acc.join(seg));
                Self::Absolute(joined)
            }
        }
    }

    /// Produces the canonical alias form of `absolute` under the named base.
    ///
    /// Fails with [`AliasPathError::NotUnderBase`] when `absolute` is not
    /// the base root itself or a descendant of it.
    pub fn format_under(
        name: &str,
        base_root: &Path,
        absolute: &Path,
    ) -> Result<Self, AliasPathError> {
        let rel = absolute
            .strip_prefix(base_root)
            .map_err(|_| AliasPathError::NotUnderBase {
                base: base_root.to_path_buf(),
                path: absolute.to_path_buf(),
            })?;

        let mut remainder = String::new();
        for component in rel.components() {
            if let Component::Normal(part) = component {
                if !remainder.is_empty() {
                    remainder.push('/');
                }
                remainder.push_str(&part.to_string_lossy());
            }
        }

        Ok(Self::Alias {
            name: name.to_string(),
            remainder,
        })
    }
}

impl fmt::Display for AliasPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(path) => write!(f, "{}", path.display()),
            Self::Alias { name, remainder } => {
                if remainder.is_empty() {
                    write!(f, "%{name}%")
                } else {
                    write!(f, "%{name}%/{remainder}")
                }
            }
        }
    }
}

impl FromStr for AliasPath {
    type Err = std::convert::Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(input))
    }
}

/// OS-correct join of a single child name onto a base directory.
///
/// Rejects empty names and names containing a path separator; parent
/// tokens (`..`) are the caller's responsibility.
pub fn combine(base: &Path, segment: &str) -> Result<PathBuf, AliasPathError> {
    if segment.is_empty() || segment.contains(['/', '\\']) {
        return Err(AliasPathError::InvalidSegment(segment.to_string()));
    }
    Ok(base.join(segment))
}

/// Normalizes a relative remainder to `/` separators with no empty segments.
fn normalize_remainder(text: &str) -> String {
    let replaced = text.replace('\\', "/");
    let mut out = String::with_capacity(replaced.len());
    for segment in replaced.split('/') {
        if segment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}
