//! Repeatable groups of sub-forms and their expand/collapse state.
//!
//! View state is keyed by [`ItemId`], never by index, so inserting, removing
//! or reordering elements cannot hand one row's state to another. The
//! index-based view is derived on demand by [`CollectionManager::view`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FormError, Result};

use super::path::FieldPath;
use super::schema::ErrorMap;
use super::store::{FormStore, ItemId};

/// Derived order field rewritten after every structural change so that the
/// collection reads `base_offset, base_offset + 1, ...`.
#[derive(Debug, Clone)]
pub struct SequenceSpec {
    pub field: String,
    pub base_offset: i64,
}

#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub path: FieldPath,
    pub defaults: Value,
    pub sequence: Option<SequenceSpec>,
}

impl CollectionSpec {
    pub fn new(path: &str, defaults: Value) -> Result<Self> {
        let path = FieldPath::parse(path)?;
        if path.is_pattern() || path.is_root() {
            return Err(FormError::Schema(format!(
                "collection path `{}` must be a concrete field",
                path
            )));
        }
        Ok(Self {
            path,
            defaults,
            sequence: None,
        })
    }

    pub fn with_sequence(mut self, field: &str, base_offset: i64) -> Self {
        self.sequence = Some(SequenceSpec {
            field: field.to_string(),
            base_offset,
        });
        self
    }
}

/// Precedence between error-driven expansion and the user's manual collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionPolicy {
    /// Element zero starts expanded and is forced open on error even after
    /// a manual collapse.
    pub pin_first_item: bool,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            pin_first_item: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemUiState {
    pub expanded: bool,
    pub manually_collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub index: usize,
    pub id: ItemId,
    pub expanded: bool,
    pub manually_collapsed: bool,
}

pub struct CollectionManager {
    specs: Vec<CollectionSpec>,
    ui: HashMap<ItemId, ItemUiState>,
    policy: ExpansionPolicy,
}

impl CollectionManager {
    pub fn new(specs: Vec<CollectionSpec>, policy: ExpansionPolicy) -> Self {
        Self {
            specs,
            ui: HashMap::new(),
            policy,
        }
    }

    /// Registers every collection with the store for identity tracking.
    pub fn attach(&self, store: &mut FormStore) -> Result<()> {
        for spec in &self.specs {
            store.track_collection(&spec.path)?;
        }
        Ok(())
    }

    pub fn specs(&self) -> &[CollectionSpec] {
        &self.specs
    }

    pub fn spec(&self, group: &FieldPath) -> Result<&CollectionSpec> {
        self.specs
            .iter()
            .find(|spec| &spec.path == group)
            .ok_or_else(|| FormError::Collection(format!("unknown collection `{}`", group)))
    }

    /// Appends a fresh element built from the group's defaults; it opens
    /// expanded.
    pub fn append(&mut self, store: &mut FormStore, group: &FieldPath) -> Result<ItemId> {
        let spec = self.spec(group)?.clone();
        let id = store.push_item(group, spec.defaults.clone())?;
        self.ui.insert(
            id,
            ItemUiState {
                expanded: true,
                manually_collapsed: false,
            },
        );
        renumber(store, &spec)?;
        self.prune(store);
        tracing::debug!(collection = %group, len = store.item_count(group), "item appended");
        Ok(id)
    }

    /// Removes the element at `index` and renumbers the rest. Removing from an
    /// empty collection or past its end is a logic error and changes nothing.
    pub fn remove(&mut self, store: &mut FormStore, group: &FieldPath, index: usize) -> Result<Value> {
        let spec = self.spec(group)?.clone();
        let (id, value) = store.remove_item(group, index)?;
        self.ui.remove(&id);
        renumber(store, &spec)?;
        self.prune(store);
        tracing::debug!(collection = %group, index, "item removed");
        Ok(value)
    }

    pub fn move_item(
        &mut self,
        store: &mut FormStore,
        group: &FieldPath,
        from: usize,
        to: usize,
    ) -> Result<()> {
        let spec = self.spec(group)?.clone();
        store.move_item(group, from, to)?;
        renumber(store, &spec)?;
        self.prune(store);
        tracing::debug!(collection = %group, from, to, "item moved");
        Ok(())
    }

    /// Flips an element open or closed. Closing records manual intent;
    /// opening clears it.
    pub fn toggle(&mut self, store: &FormStore, group: &FieldPath, index: usize) -> Result<bool> {
        let id = item_at(store, group, index)?;
        let mut state = self.state_of(id, index);
        state.expanded = !state.expanded;
        state.manually_collapsed = !state.expanded;
        self.ui.insert(id, state);
        Ok(state.expanded)
    }

    /// Opens every element whose sub-tree has an error, unless the user
    /// collapsed it by hand. Element zero overrides manual collapse while the
    /// policy pins it. Returns the indices that are now expanded because of
    /// an error.
    pub fn auto_expand_on_error(
        &mut self,
        store: &FormStore,
        group: &FieldPath,
        errors: &ErrorMap,
    ) -> Vec<usize> {
        let mut opened = Vec::new();
        for (index, id) in store.item_ids(group).iter().enumerate() {
            let element = group.at(index);
            if !errors.keys().any(|path| element.covers(path)) {
                continue;
            }
            let mut state = self.state_of(*id, index);
            let pinned = index == 0 && self.policy.pin_first_item;
            if pinned || !state.manually_collapsed {
                state.expanded = true;
                self.ui.insert(*id, state);
                opened.push(index);
            }
        }
        if !opened.is_empty() {
            tracing::debug!(collection = %group, ?opened, "expanded items with errors");
        }
        opened
    }

    pub fn view(&self, store: &FormStore, group: &FieldPath) -> Vec<ItemView> {
        store
            .item_ids(group)
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let state = self.state_of(*id, index);
                ItemView {
                    index,
                    id: *id,
                    expanded: state.expanded,
                    manually_collapsed: state.manually_collapsed,
                }
            })
            .collect()
    }

    /// Forgets view state of elements the store no longer holds, such as
    /// those dropped when a whole array was overwritten.
    pub fn prune(&mut self, store: &FormStore) {
        let before = self.ui.len();
        let specs = &self.specs;
        self.ui.retain(|id, _| {
            specs
                .iter()
                .any(|spec| store.item_ids(&spec.path).contains(id))
        });
        if self.ui.len() < before {
            tracing::trace!(dropped = before - self.ui.len(), "pruned stale item state");
        }
    }

    /// Drops all view state, e.g. after the store was reset.
    pub fn reset(&mut self) {
        self.ui.clear();
    }

    fn state_of(&self, id: ItemId, index: usize) -> ItemUiState {
        self.ui.get(&id).copied().unwrap_or(ItemUiState {
            expanded: index == 0 && self.policy.pin_first_item,
            manually_collapsed: false,
        })
    }
}

fn item_at(store: &FormStore, group: &FieldPath, index: usize) -> Result<ItemId> {
    store.item_ids(group).get(index).copied().ok_or_else(|| {
        FormError::Collection(format!(
            "no item {} in `{}` ({} item(s))",
            index,
            group,
            store.item_count(group)
        ))
    })
}

fn renumber(store: &mut FormStore, spec: &CollectionSpec) -> Result<()> {
    let Some(sequence) = &spec.sequence else {
        return Ok(());
    };
    for index in 0..store.item_count(&spec.path) {
        let order = sequence.base_offset + index as i64;
        let path = spec.path.at(index).key(&sequence.field);
        if store.get_value(&path).and_then(Value::as_i64) != Some(order) {
            store.set_value(&path, Value::from(order))?;
        }
    }
    Ok(())
}
