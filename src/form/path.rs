//! Dot/bracket addressing into a [`ValueTree`](super::ValueTree).
//!
//! `catalystConfiguration[2].minTemperature` addresses one leaf; the wildcard
//! form `catalystConfiguration[*].minTemperature` is a pattern that matches the
//! same field in every element and is used by schemas and step scopes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{FormError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// `[*]`: any element of an array.
    Any,
}

impl Segment {
    fn matches(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Any, Segment::Index(_) | Segment::Any)
            | (Segment::Index(_), Segment::Any) => true,
            (left, right) => left == right,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path, addressing the whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err(invalid(input, "empty field name"));
            }
            if name.contains(']') {
                return Err(invalid(input, "unbalanced `]`"));
            }
            segments.push(Segment::Key(name.to_string()));

            while !rest.is_empty() {
                let Some(stripped) = rest.strip_prefix('[') else {
                    return Err(invalid(input, "unexpected characters after index"));
                };
                let Some(end) = stripped.find(']') else {
                    return Err(invalid(input, "unclosed index"));
                };
                let token = stripped[..end].trim();
                let segment = if token == "*" {
                    Segment::Any
                } else {
                    token
                        .parse::<usize>()
                        .map(Segment::Index)
                        .map_err(|_| invalid(input, &format!("invalid index `{}`", token)))?
                };
                segments.push(segment);
                rest = &stripped[end + 1..];
            }
        }

        Ok(Self { segments })
    }

    pub fn key(&self, name: &str) -> Self {
        self.with(Segment::Key(name.to_string()))
    }

    pub fn at(&self, index: usize) -> Self {
        self.with(Segment::Index(index))
    }

    pub fn any(&self) -> Self {
        self.with(Segment::Any)
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when the path contains at least one `[*]` segment.
    pub fn is_pattern(&self) -> bool {
        self.segments.iter().any(|segment| *segment == Segment::Any)
    }

    /// True when `self` equals `other` or is one of its ancestors, with `[*]`
    /// on either side matching any index.
    pub fn covers(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(left, right)| left.matches(right))
    }

    /// Same-length, segment-wise match with wildcard support.
    pub fn matches(&self, other: &FieldPath) -> bool {
        self.segments.len() == other.segments.len() && self.covers(other)
    }

    /// Index of the array element directly below `prefix` on the way to `self`.
    ///
    /// `items[3].name` relative to `items` yields `Some(3)`.
    pub fn index_below(&self, prefix: &FieldPath) -> Option<usize> {
        if !prefix.covers(self) {
            return None;
        }
        match self.segments.get(prefix.len()) {
            Some(Segment::Index(index)) => Some(*index),
            _ => None,
        }
    }
}

fn invalid(path: &str, reason: &str) -> FormError {
    FormError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(name) if position == 0 => write!(f, "{}", name)?,
                Segment::Key(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Any => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_nested_paths() {
        let path = FieldPath::parse("catalystConfiguration[2].minTemperature").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("catalystConfiguration".into()),
                Segment::Index(2),
                Segment::Key("minTemperature".into()),
            ]
        );
        assert_eq!(path.to_string(), "catalystConfiguration[2].minTemperature");
    }

    #[test]
    fn parses_wildcards_and_consecutive_indexes() {
        let path = FieldPath::parse("grid[*][1].cell").unwrap();
        assert!(path.is_pattern());
        assert_eq!(path.to_string(), "grid[*][1].cell");
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in ["a..b", "a[", "a[x]", "a]b", "a[1]b", "[0]"] {
            assert!(FieldPath::parse(raw).is_err(), "`{}` should be rejected", raw);
        }
    }

    #[test]
    fn empty_input_is_root() {
        assert!(FieldPath::parse("  ").unwrap().is_root());
    }

    #[test]
    fn covers_handles_ancestors_and_wildcards() {
        let group = FieldPath::parse("items").unwrap();
        let leaf = FieldPath::parse("items[4].name").unwrap();
        let pattern = FieldPath::parse("items[*].name").unwrap();

        assert!(group.covers(&leaf));
        assert!(!leaf.covers(&group));
        assert!(pattern.covers(&leaf));
        assert!(leaf.matches(&pattern));
        assert!(FieldPath::root().covers(&leaf));
        assert_eq!(leaf.index_below(&group), Some(4));
        assert_eq!(group.index_below(&group), None);
    }

    #[test]
    fn builders_append_segments() {
        let path = FieldPath::root().key("steps").at(1).key("order");
        assert_eq!(path.to_string(), "steps[1].order");
        assert_eq!(path.parent().unwrap().to_string(), "steps[1]");
        assert_eq!(FieldPath::root().key("steps").any().to_string(), "steps[*]");
    }

    #[test]
    fn serializes_as_string() {
        let path = FieldPath::parse("a[0].b").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a[0].b\"");
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
