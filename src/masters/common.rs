//! Shared plumbing for the master-data forms: reading typed values out of a
//! [`ValueTree`] and turning typed records back into editable trees.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FormError, Result};
use crate::form::tree::{self, NumericInput};
use crate::form::{FieldPath, ValueTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn from_flag(active: bool) -> Self {
        if active {
            RecordStatus::Active
        } else {
            RecordStatus::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == RecordStatus::Active
    }
}

/// Typed view over one object of a value tree.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    tree: &'a ValueTree,
    base: FieldPath,
}

impl<'a> Reader<'a> {
    pub fn root(tree: &'a ValueTree) -> Self {
        Self {
            tree,
            base: FieldPath::root(),
        }
    }

    fn raw(&self, name: &str) -> Option<&'a Value> {
        self.tree.get(&self.base.key(name))
    }

    /// Trimmed text; blank becomes the empty string.
    pub fn text(&self, name: &str) -> String {
        tree::text(self.raw(name)).unwrap_or_default()
    }

    pub fn opt_text(&self, name: &str) -> Option<String> {
        tree::text(self.raw(name))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match tree::numeric(self.raw(name)) {
            NumericInput::Number(number) => Some(number),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.number(name)
            .filter(|number| number.fract() == 0.0)
            .map(|number| number as i64)
    }

    pub fn flag(&self, name: &str) -> bool {
        tree::flag(self.raw(name)).unwrap_or(false)
    }

    /// One reader per element of the array `name`.
    pub fn items(&self, name: &str) -> Vec<Reader<'a>> {
        let group = self.base.key(name);
        let len = self.tree.array(&group).map(Vec::len).unwrap_or(0);
        (0..len)
            .map(|index| Reader {
                tree: self.tree,
                base: group.at(index),
            })
            .collect()
    }
}

/// Decodes a stored record into its typed shape.
pub fn decode<T: DeserializeOwned>(form: &str, record: &Value) -> Result<T> {
    serde_json::from_value(record.clone())
        .map_err(|err| FormError::Payload(format!("{} record: {}", form, err)))
}

pub fn encode<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(|err| FormError::Payload(err.to_string()))
}

/// Number as the text a user would have typed.
pub fn number_input(number: Option<f64>) -> Value {
    match number {
        Some(number) => Value::String(format_number(number)),
        None => Value::String(String::new()),
    }
}

pub fn integer_input(number: Option<i64>) -> Value {
    Value::String(number.map(|n| n.to_string()).unwrap_or_default())
}

pub fn text_input(text: Option<&str>) -> Value {
    Value::String(text.unwrap_or_default().to_string())
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

/// Builds an object from `(key, value)` pairs.
pub fn object<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}
