//! Composed rule sets and the validator that evaluates them.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::errors::{FormError, Result};

use super::path::FieldPath;
use super::rules::{
    CollectionRule, Comparison, CrossFieldRule, Rule, RuleContext, VariantCase, VariantRule,
};
use super::tree::ValueTree;

/// Field path to message. An empty map means the validated scope is valid.
pub type ErrorMap = BTreeMap<FieldPath, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: ErrorMap,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<(&FieldPath, &String)> {
        self.errors.iter().next()
    }
}

/// Which part of the tree a validation pass looks at.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    All,
    /// Each entry covers itself and its whole sub-tree.
    Paths(&'a [FieldPath]),
}

impl Scope<'_> {
    pub fn covers(&self, path: &FieldPath) -> bool {
        match self {
            Scope::All => true,
            Scope::Paths(paths) => paths.iter().any(|entry| entry.covers(path)),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    pattern: FieldPath,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    variants: Vec<VariantRule>,
    cross: Vec<CrossFieldRule>,
    collections: Vec<CollectionRule>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Evaluates the rule set. Per-field rules run before cross-field rules,
    /// which run before collection rules; the first failure for a path wins.
    pub fn validate(&self, tree: &ValueTree, scope: Scope<'_>) -> ValidationReport {
        let mut errors = ErrorMap::new();

        for spec in &self.fields {
            for path in tree.expand(&spec.pattern) {
                if scope.covers(&path) {
                    apply_field_rules(tree, &path, &spec.rules, &mut errors);
                }
            }
        }

        for variant in &self.variants {
            for object_path in tree.expand(&variant.object) {
                let object = tree.get(&object_path).and_then(Value::as_object);
                let Some(case) = variant.case_for(object) else {
                    continue;
                };
                for (field, rules) in &case.fields {
                    let path = object_path.key(field);
                    if scope.covers(&path) {
                        apply_field_rules(tree, &path, rules, &mut errors);
                    }
                }
            }
        }

        for rule in &self.cross {
            for object_path in tree.expand(&rule.object) {
                let left = object_path.key(&rule.left);
                if !scope.covers(&left) || errors.contains_key(&left) {
                    continue;
                }
                let object = tree.get(&object_path).and_then(Value::as_object);
                if let Some(Err(message)) = rule.evaluate(object) {
                    errors.insert(left, message);
                }
            }
        }

        for rule in &self.collections {
            for path in tree.expand(rule.collection()) {
                if !scope.covers(&path) || errors.contains_key(&path) {
                    continue;
                }
                let items = tree.array(&path).map(Vec::as_slice).unwrap_or(&[]);
                if let Err(message) = rule.evaluate(items) {
                    errors.insert(path, message);
                }
            }
        }

        tracing::trace!(errors = errors.len(), "validation pass finished");
        ValidationReport { errors }
    }

    /// Patterns of every declared field, including variant fields.
    pub fn declared_fields(&self) -> Vec<FieldPath> {
        let mut declared: Vec<FieldPath> =
            self.fields.iter().map(|spec| spec.pattern.clone()).collect();
        for variant in &self.variants {
            declared.push(variant.object.key(&variant.discriminant));
            for case in &variant.cases {
                for (field, _) in &case.fields {
                    declared.push(variant.object.key(field));
                }
            }
        }
        declared
    }

    /// True when some rule checks `path`, one of its ancestors or something
    /// below it.
    pub fn reaches(&self, path: &FieldPath) -> bool {
        let declared = self.declared_fields();
        declared
            .iter()
            .chain(self.collections.iter().map(CollectionRule::collection))
            .any(|known| path.covers(known) || known.covers(path))
    }
}

fn apply_field_rules(tree: &ValueTree, path: &FieldPath, rules: &[Rule], errors: &mut ErrorMap) {
    if errors.contains_key(path) {
        return;
    }
    let value = tree.get(path);
    let siblings = path
        .parent()
        .and_then(|parent| tree.get(&parent))
        .and_then(Value::as_object);
    let ctx = RuleContext {
        path,
        siblings,
        tree,
    };
    for rule in rules {
        if let Err(message) = rule.evaluate(value, &ctx) {
            errors.insert(path.clone(), message);
            return;
        }
    }
}

/// Fluent schema construction. Patterns are parsed eagerly; the first problem
/// is reported by [`SchemaBuilder::build`].
#[derive(Default)]
pub struct SchemaBuilder {
    schema: Schema,
    error: Option<FormError>,
}

impl SchemaBuilder {
    fn parse(&mut self, raw: &str) -> Option<FieldPath> {
        match FieldPath::parse(raw) {
            Ok(path) => Some(path),
            Err(err) => {
                self.error.get_or_insert(err);
                None
            }
        }
    }

    pub fn field(mut self, pattern: &str, rules: Vec<Rule>) -> Self {
        if let Some(pattern) = self.parse(pattern) {
            self.schema.fields.push(FieldSpec { pattern, rules });
        }
        self
    }

    /// `object` is the object holding both fields (`""` for top level).
    pub fn compare(
        mut self,
        object: &str,
        left: &str,
        op: Comparison,
        right: &str,
        message: &str,
    ) -> Self {
        if let Some(object) = self.parse(object) {
            self.schema.cross.push(CrossFieldRule {
                object,
                left: left.to_string(),
                op,
                right: right.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn min_items(mut self, collection: &str, min: usize, message: &str) -> Self {
        if let Some(collection) = self.parse(collection) {
            self.schema.collections.push(CollectionRule::MinItems {
                collection,
                min,
                message: message.to_string(),
            });
        }
        self
    }

    pub fn unique(self, collection: &str, key: &str, message: &str) -> Self {
        self.push_unique(collection, key, false, message)
    }

    pub fn unique_ignore_case(self, collection: &str, key: &str, message: &str) -> Self {
        self.push_unique(collection, key, true, message)
    }

    fn push_unique(mut self, collection: &str, key: &str, case_insensitive: bool, message: &str) -> Self {
        if let Some(collection) = self.parse(collection) {
            self.schema.collections.push(CollectionRule::Unique {
                collection,
                key: key.to_string(),
                case_insensitive,
                message: message.to_string(),
            });
        }
        self
    }

    /// Starts a tagged-variant block for objects at `object`.
    pub fn variant(mut self, object: &str, discriminant: &str, cases: Vec<VariantCase>) -> Self {
        if let Some(object) = self.parse(object) {
            self.schema.variants.push(VariantRule {
                object,
                discriminant: discriminant.to_string(),
                cases,
            });
        }
        self
    }

    pub fn build(self) -> Result<Schema> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let schema = self.schema;
        let declared: HashSet<FieldPath> = schema.declared_fields().into_iter().collect();

        for rule in &schema.cross {
            for side in [&rule.left, &rule.right] {
                let path = rule.object.key(side);
                if !declared.contains(&path) {
                    return Err(FormError::Schema(format!(
                        "cross-field rule references undeclared field `{}`",
                        path
                    )));
                }
            }
        }
        for rule in &schema.collections {
            if let CollectionRule::Unique { collection, key, .. } = rule {
                let path = collection.any().key(key);
                if !declared.contains(&path) {
                    return Err(FormError::Schema(format!(
                        "unique rule references undeclared field `{}`",
                        path
                    )));
                }
            }
        }
        Ok(schema)
    }
}

/// Shorthand for one tagged case of a [`VariantRule`].
pub fn case(tag: &str, fields: Vec<(&str, Vec<Rule>)>) -> VariantCase {
    VariantCase {
        tag: tag.to_string(),
        fields: fields
            .into_iter()
            .map(|(name, rules)| (name.to_string(), rules))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn schema() -> Schema {
        Schema::builder()
            .field("name", vec![Rule::required(), Rule::max_length(10)])
            .field("rows[*].min", vec![Rule::required(), Rule::number()])
            .field("rows[*].max", vec![Rule::required(), Rule::number()])
            .field("rows[*].seq", vec![Rule::integer()])
            .compare("rows[*]", "min", Comparison::Le, "max", "Min must not exceed max")
            .min_items("rows", 1, "Add at least one row")
            .unique("rows", "seq", "Sequence numbers must be unique")
            .build()
            .unwrap()
    }

    fn tree(value: serde_json::Value) -> ValueTree {
        ValueTree::from_value(value).unwrap()
    }

    #[test]
    fn valid_tree_has_no_errors() {
        let data = tree(json!({
            "name": "Chart",
            "rows": [{ "min": "1", "max": "2", "seq": 1 }]
        }));
        assert!(schema().validate(&data, Scope::All).is_valid());
    }

    #[test]
    fn per_field_errors_win_over_cross_field() {
        let data = tree(json!({
            "name": "Chart",
            "rows": [{ "min": "abc", "max": "2" }, { "min": "9", "max": "2" }]
        }));
        let report = schema().validate(&data, Scope::All);
        assert_eq!(report.errors[&path("rows[0].min")], "Enter a numeric value");
        assert_eq!(report.errors[&path("rows[1].min")], "Min must not exceed max");
    }

    #[test]
    fn empty_string_reports_required() {
        let data = tree(json!({ "name": "", "rows": [{ "min": "", "max": "3" }] }));
        let report = schema().validate(&data, Scope::All);
        assert_eq!(report.errors[&path("name")], "This field is required");
        assert_eq!(report.errors[&path("rows[0].min")], "This field is required");
    }

    #[test]
    fn scope_limits_checked_paths() {
        let data = tree(json!({ "name": "", "rows": [] }));
        let only_name = [path("name")];
        let report = schema().validate(&data, Scope::Paths(&only_name));
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors.contains_key(&path("name")));

        let no_paths: [FieldPath; 0] = [];
        assert!(schema().validate(&data, Scope::Paths(&no_paths)).is_valid());
    }

    #[test]
    fn duplicate_keys_yield_one_collection_error() {
        let data = tree(json!({
            "name": "Chart",
            "rows": [
                { "min": "1", "max": "2", "seq": 1 },
                { "min": "1", "max": "2", "seq": 1 },
                { "min": "1", "max": "2", "seq": "1" }
            ]
        }));
        let report = schema().validate(&data, Scope::All);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[&path("rows")], "Sequence numbers must be unique");
    }

    #[test]
    fn variant_rules_follow_the_discriminant() {
        let schema = Schema::builder()
            .field("params[*].type", vec![Rule::required()])
            .variant(
                "params[*]",
                "type",
                vec![
                    case("numeric", vec![("low", vec![Rule::required(), Rule::number()])]),
                    case("text", vec![("expected", vec![Rule::required()])]),
                ],
            )
            .build()
            .unwrap();
        let data = tree(json!({
            "params": [{ "type": "numeric" }, { "type": "text" }, { "type": "boolean" }]
        }));
        let report = schema.validate(&data, Scope::All);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.contains_key(&path("params[0].low")));
        assert!(report.errors.contains_key(&path("params[1].expected")));
    }

    #[test]
    fn build_rejects_undeclared_references() {
        let err = Schema::builder()
            .field("a", vec![])
            .compare("", "a", Comparison::Le, "b", "a <= b")
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::Schema(_)));

        let err = Schema::builder()
            .unique("rows", "seq", "dup")
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::Schema(_)));

        let err = Schema::builder().field("rows[", vec![]).build().unwrap_err();
        assert!(matches!(err, FormError::InvalidPath { .. }));
    }
}
