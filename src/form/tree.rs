//! Ordered value tree holding the current form data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FormError, Result};

use super::path::{FieldPath, Segment};

/// Form data as an ordered JSON object. The root is always an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ValueTree(Value);

impl Default for ValueTree {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl TryFrom<Value> for ValueTree {
    type Error = FormError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => Ok(Self(value)),
            other => Err(FormError::Payload(format!(
                "form data must be an object, got {}",
                kind_name(&other)
            ))),
        }
    }
}

impl From<ValueTree> for Value {
    fn from(tree: ValueTree) -> Self {
        tree.0
    }
}

impl ValueTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Self::try_from(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Value at `path`, or `None` when unset. Patterns never resolve.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.0;
        for segment in path.segments() {
            current = match segment {
                Segment::Key(name) => current.as_object()?.get(name)?,
                Segment::Index(index) => current.as_array()?.get(*index)?,
                Segment::Any => return None,
            };
        }
        Some(current)
    }

    fn get_mut(&mut self, path: &FieldPath) -> Option<&mut Value> {
        let mut current = &mut self.0;
        for segment in path.segments() {
            current = match segment {
                Segment::Key(name) => current.as_object_mut()?.get_mut(name)?,
                Segment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
                Segment::Any => return None,
            };
        }
        Some(current)
    }

    /// Replaces the value at `path` and returns the previous one.
    ///
    /// The parent must already exist. An index equal to the array length
    /// appends. Anything else is a path/schema mismatch.
    pub fn set(&mut self, path: &FieldPath, value: Value) -> Result<Option<Value>> {
        if path.is_pattern() {
            return Err(FormError::InvalidPath {
                path: path.to_string(),
                reason: "cannot assign through a wildcard".into(),
            });
        }
        let Some(parent_path) = path.parent() else {
            let previous = std::mem::replace(self, Self::try_from(value)?);
            return Ok(Some(previous.0));
        };
        let missing = || FormError::PathNotFound(path.to_string());
        let parent = self.get_mut(&parent_path).ok_or_else(missing)?;

        match (path.last(), parent) {
            (Some(Segment::Key(name)), Value::Object(map)) => Ok(map.insert(name.clone(), value)),
            (Some(Segment::Index(index)), Value::Array(items)) => {
                if *index < items.len() {
                    Ok(Some(std::mem::replace(&mut items[*index], value)))
                } else if *index == items.len() {
                    items.push(value);
                    Ok(None)
                } else {
                    Err(missing())
                }
            }
            _ => Err(missing()),
        }
    }

    pub fn array(&self, path: &FieldPath) -> Option<&Vec<Value>> {
        self.get(path)?.as_array()
    }

    /// Mutable access to the array at `path`, creating an empty one when the
    /// key is absent from an existing parent object.
    pub fn array_mut(&mut self, path: &FieldPath) -> Result<&mut Vec<Value>> {
        if self.get(path).is_none() {
            self.set(path, Value::Array(Vec::new()))?;
        }
        match self.get_mut(path) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(FormError::PathNotFound(format!("{} is not an array", path))),
        }
    }

    /// Resolves a pattern into the concrete paths present in the tree.
    ///
    /// Keys are kept even when their leaf is unset so that required-field
    /// checks still see them; `[*]` expands only over existing elements.
    pub fn expand(&self, pattern: &FieldPath) -> Vec<FieldPath> {
        let mut resolved = Vec::new();
        expand_into(
            Some(&self.0),
            pattern.segments(),
            FieldPath::root(),
            &mut resolved,
        );
        resolved
    }
}

fn expand_into(
    current: Option<&Value>,
    remaining: &[Segment],
    prefix: FieldPath,
    out: &mut Vec<FieldPath>,
) {
    let Some((head, tail)) = remaining.split_first() else {
        out.push(prefix);
        return;
    };
    match head {
        Segment::Key(name) => {
            let child = current.and_then(Value::as_object).and_then(|map| map.get(name));
            expand_into(child, tail, prefix.key(name), out);
        }
        Segment::Index(index) => {
            let child = current.and_then(Value::as_array).and_then(|items| items.get(*index));
            expand_into(child, tail, prefix.at(*index), out);
        }
        Segment::Any => {
            if let Some(items) = current.and_then(Value::as_array) {
                for (index, item) in items.iter().enumerate() {
                    expand_into(Some(item), tail, prefix.at(index), out);
                }
            }
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Outcome of reading a form input as a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericInput {
    Absent,
    Invalid,
    Number(f64),
}

/// True for unset values, `null`, whitespace-only strings and empty arrays.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Locale-agnostic numeric coercion. Empty strings count as absent.
pub fn numeric(value: Option<&Value>) -> NumericInput {
    if is_blank(value) {
        return NumericInput::Absent;
    }
    match value {
        Some(Value::Number(number)) => number
            .as_f64()
            .map(NumericInput::Number)
            .unwrap_or(NumericInput::Invalid),
        Some(Value::String(text)) => match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => NumericInput::Number(number),
            _ => NumericInput::Invalid,
        },
        _ => NumericInput::Invalid,
    }
}

/// Display text for scalar values; `None` for blanks and containers.
pub fn text(value: Option<&Value>) -> Option<String> {
    if is_blank(value) {
        return None;
    }
    match value? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Reads a toggle; accepts booleans and the usual textual spellings.
pub fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
