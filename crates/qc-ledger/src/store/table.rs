//! # Multi-Index Table
//!
//! Objects of one kind, owned in an id-ordered map and referenced from any
//! number of ordered secondary indices.
//!
//! ## Data Structures
//!
//! - `objects`: id -> object
//! - `indices[i]`: composite key -> id, one `BTreeMap` per declared index
//! - `undo_stack`: one [`UndoState`] per open session, oldest first
//!
//! ## Invariants
//!
//! - Every object appears exactly once in every index.
//! - A failed `create`/`modify` leaves objects and indices untouched.
//! - `undo()` restores objects, indices and `next_id` to the values they had
//!   when the session started.

use super::object::{ChainObject, IndexKey, KeyPart};
use crate::domain::{ChainError, InternalError, ObjectId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Changes recorded since one session started.
#[derive(Debug, Clone)]
struct UndoState<T> {
    revision: u64,
    /// Pre-session values of objects modified during the session.
    old_values: BTreeMap<ObjectId, T>,
    /// Pre-session values of objects removed during the session.
    removed_values: BTreeMap<ObjectId, T>,
    /// Objects created during the session.
    new_ids: BTreeSet<ObjectId>,
    old_next_id: u64,
}

impl<T> UndoState<T> {
    fn new(revision: u64, next_id: u64) -> Self {
        Self {
            revision,
            old_values: BTreeMap::new(),
            removed_values: BTreeMap::new(),
            new_ids: BTreeSet::new(),
            old_next_id: next_id,
        }
    }
}

/// Storage for every object of type `T`.
#[derive(Debug, Clone)]
pub struct Table<T: ChainObject> {
    objects: BTreeMap<ObjectId, T>,
    indices: Vec<BTreeMap<IndexKey, ObjectId>>,
    next_id: u64,
    undo_stack: VecDeque<UndoState<T>>,
}

impl<T: ChainObject> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ChainObject> Table<T> {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            indices: T::INDICES.iter().map(|_| BTreeMap::new()).collect(),
            next_id: 0,
            undo_stack: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.objects.get(&id)
    }

    /// Exact lookup in a unique index.
    pub fn find_by(&self, index: usize, key: &IndexKey) -> Option<&T> {
        self.indices
            .get(index)?
            .get(key)
            .and_then(|id| self.objects.get(id))
    }

    /// All objects in index order.
    pub fn iter_index(&self, index: usize) -> impl Iterator<Item = &T> + '_ {
        self.indices
            .get(index)
            .into_iter()
            .flat_map(|idx| idx.values())
            .filter_map(move |id| self.objects.get(id))
    }

    /// Objects whose key is `>= start`, in index order.
    pub fn range_from(&self, index: usize, start: IndexKey) -> impl Iterator<Item = &T> + '_ {
        self.indices
            .get(index)
            .into_iter()
            .flat_map(move |idx| idx.range(start.clone()..))
            .filter_map(move |(_, id)| self.objects.get(id))
    }

    /// Objects whose key starts with `prefix`, in index order.
    pub fn prefix(&self, index: usize, prefix: IndexKey) -> impl Iterator<Item = &T> + '_ {
        let start = prefix.clone();
        self.indices
            .get(index)
            .into_iter()
            .flat_map(move |idx| idx.range(start.clone()..))
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter_map(move |(_, id)| self.objects.get(id))
    }

    /// All objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.objects.values()
    }

    fn key_for(obj: &T, index: usize) -> IndexKey {
        let mut key = obj.index_key(index);
        if !T::INDICES[index].unique {
            key.push(KeyPart::Id(obj.id()));
        }
        key
    }

    /// Fails if inserting `obj` would collide in any unique index.
    /// `ignore` is the id allowed to already own a key (the object itself
    /// during a modify).
    fn check_unique(&self, obj: &T, ignore: Option<ObjectId>) -> Result<(), ChainError> {
        for (index, spec) in T::INDICES.iter().enumerate() {
            if !spec.unique {
                continue;
            }
            let key = Self::key_for(obj, index);
            if let Some(owner) = self.indices[index].get(&key) {
                if Some(*owner) != ignore {
                    return Err(ChainError::UniqueViolation {
                        kind: T::KIND,
                        index: spec.name,
                    });
                }
            }
        }
        Ok(())
    }

    fn insert_keys(&mut self, obj: &T) {
        for index in 0..T::INDICES.len() {
            let key = Self::key_for(obj, index);
            self.indices[index].insert(key, obj.id());
        }
    }

    fn remove_keys(&mut self, obj: &T) {
        for index in 0..T::INDICES.len() {
            let key = Self::key_for(obj, index);
            self.indices[index].remove(&key);
        }
    }

    /// Stores `value` under a fresh id and returns that id.
    pub fn create(&mut self, mut value: T) -> Result<ObjectId, ChainError> {
        let id = ObjectId(self.next_id);
        value.set_id(id);
        self.check_unique(&value, None)?;

        self.insert_keys(&value);
        self.objects.insert(id, value);
        self.next_id += 1;

        if let Some(state) = self.undo_stack.back_mut() {
            state.new_ids.insert(id);
        }
        Ok(id)
    }

    /// Applies `mutator` to a copy, validates the new keys, then swaps the
    /// copy in. On error nothing changes.
    pub fn modify<F>(&mut self, id: ObjectId, mutator: F) -> Result<(), ChainError>
    where
        F: FnOnce(&mut T),
    {
        let old = self
            .objects
            .get(&id)
            .cloned()
            .ok_or_else(|| ChainError::not_found(T::KIND, id))?;

        let mut new = old.clone();
        mutator(&mut new);
        if new.id() != id {
            return Err(InternalError::IndexCorruption {
                kind: T::KIND,
                detail: format!("modify changed object id {} to {}", id, new.id()),
            }
            .into());
        }
        self.check_unique(&new, Some(id))?;

        self.remove_keys(&old);
        self.insert_keys(&new);
        self.objects.insert(id, new);

        if let Some(state) = self.undo_stack.back_mut() {
            if !state.new_ids.contains(&id) && !state.old_values.contains_key(&id) {
                state.old_values.insert(id, old);
            }
        }
        Ok(())
    }

    /// Deletes the object and its index entries, returning it.
    pub fn remove(&mut self, id: ObjectId) -> Result<T, ChainError> {
        let obj = self
            .objects
            .remove(&id)
            .ok_or_else(|| ChainError::not_found(T::KIND, id))?;
        self.remove_keys(&obj);

        if let Some(state) = self.undo_stack.back_mut() {
            if state.new_ids.remove(&id) {
                // created and removed in the same session
            } else if let Some(original) = state.old_values.remove(&id) {
                state.removed_values.insert(id, original);
            } else {
                state.removed_values.insert(id, obj.clone());
            }
        }
        Ok(obj)
    }

    // =========================================================================
    // UNDO
    // =========================================================================

    pub fn start_undo(&mut self, revision: u64) {
        self.undo_stack
            .push_back(UndoState::new(revision, self.next_id));
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Reverts every change recorded by the newest session.
    pub fn undo(&mut self) {
        let Some(state) = self.undo_stack.pop_back() else {
            return;
        };

        for id in &state.new_ids {
            if let Some(obj) = self.objects.remove(id) {
                self.remove_keys(&obj);
            }
        }
        for id in state.old_values.keys() {
            if let Some(current) = self.objects.remove(id) {
                self.remove_keys(&current);
            }
        }
        for (id, original) in state.old_values.into_iter().chain(state.removed_values) {
            self.insert_keys(&original);
            self.objects.insert(id, original);
        }
        self.next_id = state.old_next_id;
    }

    /// Folds the newest session into the one below it, so that undoing the
    /// outer session also reverts the inner one's changes.
    pub fn squash(&mut self) {
        let Some(top) = self.undo_stack.pop_back() else {
            return;
        };
        let Some(prev) = self.undo_stack.back_mut() else {
            return;
        };

        for (id, old) in top.old_values {
            if prev.new_ids.contains(&id) || prev.old_values.contains_key(&id) {
                continue;
            }
            prev.old_values.insert(id, old);
        }

        for id in top.new_ids {
            prev.new_ids.insert(id);
        }

        for (id, removed) in top.removed_values {
            if prev.new_ids.remove(&id) {
                continue;
            }
            if let Some(original) = prev.old_values.remove(&id) {
                prev.removed_values.insert(id, original);
            } else {
                prev.removed_values.insert(id, removed);
            }
        }
    }

    /// Forgets undo history for sessions with `revision <= revision`.
    pub fn commit(&mut self, revision: u64) {
        while self
            .undo_stack
            .front()
            .is_some_and(|state| state.revision <= revision)
        {
            self.undo_stack.pop_front();
        }
    }
}
