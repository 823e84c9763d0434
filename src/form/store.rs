//! Single source of truth for the value tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{FormError, Result};

use super::path::FieldPath;
use super::tree::ValueTree;

/// Stable per-session identity of one collection element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut short = self.0.simple().to_string();
        short.truncate(8);
        write!(f, "{}", short)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&FieldPath, Option<&Value>)>;

struct Subscriber {
    id: SubscriptionId,
    path: FieldPath,
    listener: Listener,
}

/// Owns the [`ValueTree`], the snapshot it is compared against for dirtiness,
/// and the identities of elements in tracked collections.
pub struct FormStore {
    tree: ValueTree,
    initial: ValueTree,
    identities: BTreeMap<FieldPath, Vec<ItemId>>,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new(ValueTree::new())
    }
}

impl FormStore {
    pub fn new(tree: ValueTree) -> Self {
        Self {
            initial: tree.clone(),
            tree,
            identities: BTreeMap::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn tree(&self) -> &ValueTree {
        &self.tree
    }

    pub fn get_value(&self, path: &FieldPath) -> Option<&Value> {
        self.tree.get(path)
    }

    /// Replaces the value at `path`. The parent must exist; see
    /// [`ValueTree::set`].
    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        self.tree.set(path, value)?;
        self.reconcile_identities(path);
        tracing::trace!(path = %path, "field updated");
        self.notify(path);
        Ok(())
    }

    /// Replaces the whole tree and makes it the new clean baseline. Element
    /// identities are regenerated.
    pub fn reset(&mut self, tree: ValueTree) {
        self.initial = tree.clone();
        self.tree = tree;
        let tracked: Vec<FieldPath> = self.identities.keys().cloned().collect();
        for path in tracked {
            let len = self.tree.array(&path).map(Vec::len).unwrap_or(0);
            self.identities
                .insert(path, (0..len).map(|_| ItemId::new()).collect());
        }
        tracing::debug!(collections = self.identities.len(), "form state reset");
        self.notify(&FieldPath::root());
    }

    pub fn is_dirty(&self) -> bool {
        self.tree != self.initial
    }

    pub fn is_path_dirty(&self, path: &FieldPath) -> bool {
        self.tree.get(path) != self.initial.get(path)
    }

    /// Registers `listener` for changes to `path`. It fires when `path` itself,
    /// any ancestor or anything below it is written.
    pub fn subscribe<F>(&mut self, path: FieldPath, listener: F) -> SubscriptionId
    where
        F: FnMut(&FieldPath, Option<&Value>) + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push(Subscriber {
            id,
            path,
            listener: Box::new(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, changed: &FieldPath) {
        for subscriber in self.subscribers.iter_mut() {
            if changed.covers(&subscriber.path) || subscriber.path.covers(changed) {
                let value = self.tree.get(&subscriber.path);
                (subscriber.listener)(&subscriber.path, value);
            }
        }
    }

    /// Starts tracking element identities for the array at `path`.
    pub fn track_collection(&mut self, path: &FieldPath) -> Result<()> {
        if path.is_pattern() {
            return Err(FormError::InvalidPath {
                path: path.to_string(),
                reason: "collections must be concrete paths".into(),
            });
        }
        let len = self.tree.array(path).map(Vec::len).unwrap_or(0);
        self.identities
            .entry(path.clone())
            .or_insert_with(|| (0..len).map(|_| ItemId::new()).collect());
        Ok(())
    }

    pub fn item_ids(&self, path: &FieldPath) -> &[ItemId] {
        self.identities
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn item_count(&self, path: &FieldPath) -> usize {
        self.tree.array(path).map(Vec::len).unwrap_or(0)
    }

    pub fn push_item(&mut self, path: &FieldPath, value: Value) -> Result<ItemId> {
        self.tracked(path)?;
        self.tree.array_mut(path)?.push(value);
        let id = ItemId::new();
        self.identities.entry(path.clone()).or_default().push(id);
        self.notify(path);
        Ok(id)
    }

    pub fn remove_item(&mut self, path: &FieldPath, index: usize) -> Result<(ItemId, Value)> {
        self.tracked(path)?;
        let len = self.item_count(path);
        if index >= len {
            return Err(FormError::Collection(format!(
                "cannot remove item {} from `{}` with {} item(s)",
                index, path, len
            )));
        }
        let value = self.tree.array_mut(path)?.remove(index);
        let id = self
            .identities
            .get_mut(path)
            .map(|ids| ids.remove(index))
            .unwrap_or_default();
        self.notify(path);
        Ok((id, value))
    }

    pub fn move_item(&mut self, path: &FieldPath, from: usize, to: usize) -> Result<()> {
        self.tracked(path)?;
        let len = self.item_count(path);
        if from >= len || to >= len {
            return Err(FormError::Collection(format!(
                "cannot move item {} to {} in `{}` with {} item(s)",
                from, to, path, len
            )));
        }
        let items = self.tree.array_mut(path)?;
        let value = items.remove(from);
        items.insert(to, value);
        if let Some(ids) = self.identities.get_mut(path) {
            let id = ids.remove(from);
            ids.insert(to, id);
        }
        self.notify(path);
        Ok(())
    }

    fn tracked(&self, path: &FieldPath) -> Result<()> {
        if self.identities.contains_key(path) {
            Ok(())
        } else {
            Err(FormError::Collection(format!(
                "`{}` is not a tracked collection",
                path
            )))
        }
    }

    /// Keeps identity lists the same length as their arrays after a direct
    /// write to a collection, one of its ancestors or one of its elements.
    /// Surviving leading elements keep their identity.
    fn reconcile_identities(&mut self, written: &FieldPath) {
        for (path, ids) in self.identities.iter_mut() {
            if !written.covers(path) && !path.covers(written) {
                continue;
            }
            let len = self.tree.array(path).map(Vec::len).unwrap_or(0);
            if ids.len() > len {
                ids.truncate(len);
            }
            while ids.len() < len {
                ids.push(ItemId::new());
            }
        }
    }
}
