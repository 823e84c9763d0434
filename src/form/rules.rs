//! Declarative validation rules.
//!
//! Per-field [`Rule`]s run first, then [`CrossFieldRule`]s, then
//! [`CollectionRule`]s. [`VariantRule`]s contribute per-field rules whose
//! presence depends on a discriminant field of the same object.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use super::path::FieldPath;
use super::tree::{self, NumericInput, ValueTree};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inputs available to a rule: the field's own path, the object it lives in
/// and the whole tree.
pub struct RuleContext<'a> {
    pub path: &'a FieldPath,
    pub siblings: Option<&'a Map<String, Value>>,
    pub tree: &'a ValueTree,
}

impl<'a> RuleContext<'a> {
    pub fn sibling(&self, name: &str) -> Option<&'a Value> {
        self.siblings.and_then(|map| map.get(name))
    }
}

type CheckCallback = dyn Fn(Option<&Value>, &RuleContext<'_>) -> Result<(), String> + Send + Sync;
pub type SharedCheck = Arc<CheckCallback>;

#[derive(Clone)]
pub enum Check {
    Required,
    Number,
    Integer,
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    /// Strictly greater than the bound.
    Above(f64),
    Pattern(Regex),
    Date,
    OneOf(Vec<String>),
    Custom(SharedCheck),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Required => write!(f, "Required"),
            Check::Number => write!(f, "Number"),
            Check::Integer => write!(f, "Integer"),
            Check::MinLength(len) => write!(f, "MinLength({})", len),
            Check::MaxLength(len) => write!(f, "MaxLength({})", len),
            Check::Min(bound) => write!(f, "Min({})", bound),
            Check::Max(bound) => write!(f, "Max({})", bound),
            Check::Above(bound) => write!(f, "Above({})", bound),
            Check::Pattern(regex) => write!(f, "Pattern({})", regex.as_str()),
            Check::Date => write!(f, "Date"),
            Check::OneOf(options) => write!(f, "OneOf({:?})", options),
            Check::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// One per-field check with an optional message override.
#[derive(Debug, Clone)]
pub struct Rule {
    check: Check,
    message: Option<String>,
}

impl Rule {
    fn new(check: Check) -> Self {
        Self {
            check,
            message: None,
        }
    }

    pub fn required() -> Self {
        Self::new(Check::Required)
    }

    pub fn number() -> Self {
        Self::new(Check::Number)
    }

    pub fn integer() -> Self {
        Self::new(Check::Integer)
    }

    pub fn min_length(len: usize) -> Self {
        Self::new(Check::MinLength(len))
    }

    pub fn max_length(len: usize) -> Self {
        Self::new(Check::MaxLength(len))
    }

    pub fn min(bound: f64) -> Self {
        Self::new(Check::Min(bound))
    }

    pub fn max(bound: f64) -> Self {
        Self::new(Check::Max(bound))
    }

    pub fn positive() -> Self {
        Self::new(Check::Above(0.0))
    }

    pub fn pattern(regex: Regex) -> Self {
        Self::new(Check::Pattern(regex))
    }

    pub fn date() -> Self {
        Self::new(Check::Date)
    }

    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Check::OneOf(options.into_iter().map(Into::into).collect()))
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(Option<&Value>, &RuleContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new(Check::Custom(Arc::new(check)))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    /// Runs the rule. Every check other than `Required` passes on blank input
    /// so that an empty field reports "required" rather than a format error.
    pub fn evaluate(&self, value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), String> {
        let blank = tree::is_blank(value);
        if blank && !matches!(self.check, Check::Required | Check::Custom(_)) {
            return Ok(());
        }
        let outcome = match &self.check {
            Check::Required => {
                if blank {
                    Err("This field is required".to_string())
                } else {
                    Ok(())
                }
            }
            Check::Number => match tree::numeric(value) {
                NumericInput::Invalid => Err("Enter a numeric value".to_string()),
                _ => Ok(()),
            },
            Check::Integer => match tree::numeric(value) {
                NumericInput::Number(number) if number.fract() == 0.0 => Ok(()),
                NumericInput::Absent => Ok(()),
                _ => Err("Enter a whole number (e.g., 42)".to_string()),
            },
            Check::MinLength(len) => {
                let count = tree::text(value).map(|s| s.chars().count()).unwrap_or(0);
                if count < *len {
                    Err(format!("Enter at least {} characters", len))
                } else {
                    Ok(())
                }
            }
            Check::MaxLength(len) => {
                let count = tree::text(value).map(|s| s.chars().count()).unwrap_or(0);
                if count > *len {
                    Err(format!("Cannot exceed {} characters (got {})", len, count))
                } else {
                    Ok(())
                }
            }
            Check::Min(bound) => bounded(value, |number| number >= *bound, || {
                format!("Value must be at least {}", bound)
            }),
            Check::Max(bound) => bounded(value, |number| number <= *bound, || {
                format!("Value must be at most {}", bound)
            }),
            Check::Above(bound) => bounded(value, |number| number > *bound, || {
                format!("Value must be greater than {}", bound)
            }),
            Check::Pattern(regex) => match tree::text(value) {
                Some(text) if regex.is_match(&text) => Ok(()),
                _ => Err("Value has an invalid format".to_string()),
            },
            Check::Date => match tree::text(value) {
                Some(text) if parse_date(&text).is_some() => Ok(()),
                _ => Err("Use YYYY-MM-DD format".to_string()),
            },
            Check::OneOf(options) => {
                let normalized = tree::text(value).unwrap_or_default().to_lowercase();
                if options
                    .iter()
                    .any(|candidate| candidate.to_lowercase() == normalized)
                {
                    Ok(())
                } else {
                    Err(format!("Value must be one of: {}", options.join(", ")))
                }
            }
            Check::Custom(callback) => callback(value, ctx),
        };
        outcome.map_err(|default| self.message.clone().unwrap_or(default))
    }
}

fn bounded(
    value: Option<&Value>,
    accept: impl Fn(f64) -> bool,
    message: impl Fn() -> String,
) -> Result<(), String> {
    match tree::numeric(value) {
        NumericInput::Number(number) if accept(number) => Ok(()),
        NumericInput::Number(_) => Err(message()),
        NumericInput::Invalid => Err("Enter a numeric value".to_string()),
        NumericInput::Absent => Ok(()),
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Comparison {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Gt => ordering == Ordering::Greater,
        }
    }
}

/// Compares two fields of the same object; the error lands on `left`.
///
/// `object` is the (possibly wildcard) path of the object holding both
/// fields; the root path compares top-level fields.
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    pub object: FieldPath,
    pub left: String,
    pub op: Comparison,
    pub right: String,
    pub message: String,
}

impl CrossFieldRule {
    /// `None` when either side is blank or the two sides are not comparable;
    /// per-field rules report those cases.
    pub fn evaluate(&self, object: Option<&Map<String, Value>>) -> Option<Result<(), String>> {
        let left = object.and_then(|map| map.get(&self.left));
        let right = object.and_then(|map| map.get(&self.right));
        let ordering = compare_values(left, right)?;
        if self.op.holds(ordering) {
            Some(Ok(()))
        } else {
            Some(Err(self.message.clone()))
        }
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    if let (NumericInput::Number(a), NumericInput::Number(b)) =
        (tree::numeric(left), tree::numeric(right))
    {
        return a.partial_cmp(&b);
    }
    let (a, b) = (tree::text(left)?, tree::text(right)?);
    match (parse_date(&a), parse_date(&b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => None,
    }
}

/// Rules over a whole collection. Errors attach to the collection path itself.
#[derive(Debug, Clone)]
pub enum CollectionRule {
    MinItems {
        collection: FieldPath,
        min: usize,
        message: String,
    },
    Unique {
        collection: FieldPath,
        key: String,
        case_insensitive: bool,
        message: String,
    },
}

impl CollectionRule {
    pub fn collection(&self) -> &FieldPath {
        match self {
            CollectionRule::MinItems { collection, .. } | CollectionRule::Unique { collection, .. } => {
                collection
            }
        }
    }

    pub fn evaluate(&self, items: &[Value]) -> Result<(), String> {
        match self {
            CollectionRule::MinItems { min, message, .. } => {
                if items.len() < *min {
                    Err(message.clone())
                } else {
                    Ok(())
                }
            }
            CollectionRule::Unique {
                key,
                case_insensitive,
                message,
                ..
            } => {
                let mut seen = std::collections::HashSet::new();
                for item in items {
                    let Some(raw) = comparable_key(item.get(key)) else {
                        continue;
                    };
                    let normalized = if *case_insensitive {
                        raw.to_lowercase()
                    } else {
                        raw
                    };
                    if !seen.insert(normalized) {
                        return Err(message.clone());
                    }
                }
                Ok(())
            }
        }
    }
}

/// Numbers compare by value so `"1"` and `1` collide.
fn comparable_key(value: Option<&Value>) -> Option<String> {
    match tree::numeric(value) {
        NumericInput::Number(number) => Some(number.to_string()),
        NumericInput::Absent => None,
        NumericInput::Invalid => tree::text(value),
    }
}

/// Tagged-variant rules: the discriminant's value selects which field rules
/// apply to the rest of the object.
#[derive(Debug, Clone)]
pub struct VariantRule {
    pub object: FieldPath,
    pub discriminant: String,
    pub cases: Vec<VariantCase>,
}

#[derive(Debug, Clone)]
pub struct VariantCase {
    pub tag: String,
    pub fields: Vec<(String, Vec<Rule>)>,
}

impl VariantRule {
    pub fn case_for(&self, object: Option<&Map<String, Value>>) -> Option<&VariantCase> {
        let tag = tree::text(object.and_then(|map| map.get(&self.discriminant)))?;
        self.cases
            .iter()
            .find(|case| case.tag.eq_ignore_ascii_case(&tag))
    }
}
