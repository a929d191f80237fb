use std::{fmt, str::FromStr};

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Absolute, `/`-separated identifier of a node (or of a whole network).
///
/// `/` is the root. Every other path is one or more non-empty segments,
/// e.g. `/mat/A`. Segments never contain `/` or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !text.starts_with('/') {
            bail!("node path must be absolute (start with '/'): {text:?}");
        }
        if text == "/" {
            return Ok(NodePath(text));
        }
        for segment in text[1..].split('/') {
            validate_segment(&text, segment)?;
        }
        Ok(NodePath(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath::root()),
            Some(idx) => Some(NodePath(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Appends one segment. Filters use this to namespace the nodes they create
    /// under the network id.
    pub fn child(&self, segment: &str) -> Result<NodePath> {
        validate_segment(&self.0, segment)?;
        if self.is_root() {
            Ok(NodePath(format!("/{segment}")))
        } else {
            Ok(NodePath(format!("{}/{segment}", self.0)))
        }
    }

    pub fn has_prefix(&self, prefix: &NodePath) -> bool {
        if prefix.is_root() || self == prefix {
            return true;
        }
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn validate_segment(path: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        bail!("node path has an empty segment: {path:?}");
    }
    if segment.contains('/') || segment.chars().any(char::is_whitespace) {
        bail!("invalid node path segment {segment:?} in {path:?}");
    }
    Ok(())
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodePath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        NodePath::new(s)
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        NodePath::new(text).map_err(serde::de::Error::custom)
    }
}
