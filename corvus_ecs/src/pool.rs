use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::id::UidGenerator;
use crate::Uid;

/// How many slots a pool reserves at once when it runs out of capacity.
pub const DEFAULT_GROWTH: usize = 64;

struct Slot<T> {
    id: Uid,
    value: T,
}

/// A contiguous array of `T` addressed by random, stable ids.
///
/// `storage` is kept packed: removing an element moves the last one into the hole, so slot indices change and are
/// never handed out. References returned by `at`/`at_mut` must not outlive the next `push`/`pop`; hold on to the id
/// instead and look it up again.
pub struct Pool<T> {
    name: &'static str,
    storage: Vec<Slot<T>>,
    index: HashMap<Uid, usize>,
    growth: usize,
    ids: UidGenerator,
}

impl<T> Pool<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_generator(name, DEFAULT_GROWTH, UidGenerator::from_entropy())
    }

    pub fn with_generator(name: &'static str, growth: usize, ids: UidGenerator) -> Self {
        Self {
            name,
            storage: Vec::new(),
            index: HashMap::new(),
            growth: growth.max(1),
            ids,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn contains(&self, id: Uid) -> bool {
        self.index.contains_key(&id)
    }

    fn grow_if_full(&mut self) {
        if self.storage.len() == self.storage.capacity() {
            self.storage.reserve_exact(self.growth);
        }
    }

    /// Stores `value` under a freshly generated id and returns that id.
    ///
    /// Anything that must know its own id (components, entities) is told about it by the caller right after this
    /// returns, since the id does not exist before the insertion succeeds.
    pub fn push(&mut self, value: T) -> Result<Uid> {
        let index = &self.index;
        let id = self.ids.next_unused(self.name, |candidate| index.contains_key(&candidate))?;

        self.insert_unchecked(id, value);
        Ok(id)
    }

    /// Stores `value` under an id chosen by the caller. Used when loading persisted elements whose ids must survive
    /// the round trip.
    pub fn insert_with_id(&mut self, id: Uid, value: T) -> Result<()> {
        if id == 0 {
            return Err(Error::ReservedId { pool: self.name });
        }
        if self.contains(id) {
            return Err(Error::DuplicateId { id, pool: self.name });
        }

        self.insert_unchecked(id, value);
        Ok(())
    }

    fn insert_unchecked(&mut self, id: Uid, value: T) {
        self.grow_if_full();

        self.index.insert(id, self.storage.len());
        self.storage.push(Slot { id, value });
    }

    fn not_found(&self, id: Uid) -> Error {
        Error::NotFound { id, pool: self.name }
    }

    pub fn get(&self, id: Uid) -> Option<&T> {
        let slot = *self.index.get(&id)?;
        Some(&self.storage[slot].value)
    }

    pub fn get_mut(&mut self, id: Uid) -> Option<&mut T> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.storage[slot].value)
    }

    pub fn at(&self, id: Uid) -> Result<&T> {
        match self.index.get(&id) {
            Some(&slot) => Ok(&self.storage[slot].value),
            None => Err(self.not_found(id)),
        }
    }

    pub fn at_mut(&mut self, id: Uid) -> Result<&mut T> {
        match self.index.get(&id) {
            Some(&slot) => Ok(&mut self.storage[slot].value),
            None => Err(self.not_found(id)),
        }
    }

    /// Removes the element with the given id by moving the last element into its slot.
    pub fn pop(&mut self, id: Uid) -> Result<T> {
        let slot = match self.index.remove(&id) {
            Some(slot) => slot,
            None => return Err(self.not_found(id)),
        };

        let removed = self.storage.swap_remove(slot);

        // Unless we just removed the last element, something else now lives at `slot`
        if let Some(moved) = self.storage.get(slot) {
            self.index.insert(moved.id, slot);
        }

        Ok(removed.value)
    }

    /// Snapshot of the live ids, in slot order. The order is not preserved across removals.
    pub fn all_keys(&self) -> Vec<Uid> {
        self.storage.iter().map(|slot| slot.id).collect()
    }

    /// Id of the element at the first slot, if any.
    pub fn first_key(&self) -> Option<Uid> {
        self.storage.first().map(|slot| slot.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uid, &T)> {
        self.storage.iter().map(|slot| (slot.id, &slot.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Uid, &mut T)> {
        self.storage.iter_mut().map(|slot| (slot.id, &mut slot.value))
    }

    /// Drops every element but keeps the allocation around.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::test::*;

    use super::*;

    fn pool() -> Pool<CompX> {
        Pool::with_generator("comp_x", 4, UidGenerator::seeded(1))
    }

    fn assert_consistent(p: &Pool<CompX>) {
        assert_eq!(p.index.len(), p.storage.len());
        for (slot, entry) in p.storage.iter().enumerate() {
            assert_eq!(p.index.get(&entry.id), Some(&slot));
        }
    }

    #[test]
    fn push_then_at() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        let b = p.push(CompX::new("B")).unwrap();

        assert_ne!(a, b);
        assert_eq!(p.at(a).unwrap(), &CompX::new("A"));
        assert_eq!(p.at(b).unwrap(), &CompX::new("B"));
        assert_eq!(p.len(), 2);
        assert_consistent(&p);
    }

    #[test]
    fn at_mut() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        *p.at_mut(a).unwrap() = CompX::new("Z");

        assert_eq!(p.at(a).unwrap(), &CompX::new("Z"));
    }

    #[test]
    fn missing_is_not_found() {
        let p = pool();

        assert!(matches!(p.at(1234), Err(Error::NotFound { id: 1234, pool: "comp_x" })));
        assert!(p.get(1234).is_none());
    }

    #[test]
    fn pop_returns_value() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        assert_eq!(p.pop(a).unwrap(), CompX::new("A"));
    }

    #[test]
    fn pop_non_repeatable() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        p.pop(a).unwrap();

        assert!(matches!(p.pop(a), Err(Error::NotFound { .. })));
    }

    #[test]
    fn pop_first_moves_last() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        let b = p.push(CompX::new("B")).unwrap();
        let c = p.push(CompX::new("C")).unwrap();

        p.pop(a).unwrap();

        assert_eq!(p.all_keys(), vec![c, b]);
        assert_eq!(p.at(c).unwrap(), &CompX::new("C"));
        assert_eq!(p.at(b).unwrap(), &CompX::new("B"));
        assert_consistent(&p);
    }

    #[test]
    fn pop_last() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        let b = p.push(CompX::new("B")).unwrap();

        p.pop(b).unwrap();

        assert_eq!(p.all_keys(), vec![a]);
        assert_consistent(&p);
    }

    #[test]
    fn grows_by_increment() {
        let mut p = pool();

        assert_eq!(p.capacity(), 0);
        p.push(CompX::new("A")).unwrap();
        assert_eq!(p.capacity(), 4);

        for s in &["B", "C", "D"] {
            p.push(CompX::new(s)).unwrap();
        }
        assert_eq!(p.capacity(), 4);

        p.push(CompX::new("E")).unwrap();
        assert_eq!(p.capacity(), 8);
    }

    #[test]
    fn push_pop_restores_layout() {
        let mut p = pool();

        let a = p.push(CompX::new("A")).unwrap();
        let b = p.push(CompX::new("B")).unwrap();

        let (len, capacity, keys) = (p.len(), p.capacity(), p.all_keys());

        let c = p.push(CompX::new("C")).unwrap();
        p.pop(c).unwrap();

        assert_eq!(p.len(), len);
        assert_eq!(p.capacity(), capacity);
        assert_eq!(p.all_keys(), keys);
        assert_eq!(p.at(a).unwrap(), &CompX::new("A"));
        assert_eq!(p.at(b).unwrap(), &CompX::new("B"));
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut p = pool();

        for s in &["A", "B", "C", "D", "E"] {
            p.push(CompX::new(s)).unwrap();
        }
        let capacity = p.capacity();

        p.clear();

        assert_eq!(p.len(), 0);
        assert!(p.all_keys().is_empty());
        assert_eq!(p.capacity(), capacity);
    }

    #[test]
    fn insert_with_id() {
        let mut p = pool();

        p.insert_with_id(42, CompX::new("A")).unwrap();
        assert_eq!(p.at(42).unwrap(), &CompX::new("A"));

        assert!(matches!(p.insert_with_id(42, CompX::new("B")), Err(Error::DuplicateId { id: 42, .. })));
        assert!(matches!(p.insert_with_id(0, CompX::new("B")), Err(Error::ReservedId { .. })));
        assert_eq!(p.at(42).unwrap(), &CompX::new("A"));
    }

    #[test]
    fn push_skips_taken_id() {
        let mut twin = UidGenerator::seeded(1);
        let first = twin.next_id();
        let second = twin.next_id();

        let mut p = pool();
        p.insert_with_id(first, CompX::new("A")).unwrap();

        assert_eq!(p.push(CompX::new("B")).unwrap(), second);
        assert_eq!(p.at(first).unwrap(), &CompX::new("A"));
    }

    #[test]
    fn rand_io() {
        use rand::seq::SliceRandom;
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut p = pool();

        // Ids we expect to be live, with the value stored under them
        let mut live: Vec<(Uid, CompX)> = Vec::new();
        let mut dead: HashSet<Uid> = HashSet::new();

        for step in 0..2_000 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let value = CompX::new(&step.to_string());
                let id = p.push(value.clone()).unwrap();
                live.push((id, value));
            } else {
                live.shuffle(&mut rng);
                let (id, value) = live.pop().unwrap();
                assert_eq!(p.pop(id).unwrap(), value);
                dead.insert(id);
            }

            assert_eq!(p.len(), live.len());
            assert_consistent(&p);
        }

        let keys: HashSet<Uid> = p.all_keys().into_iter().collect();
        assert_eq!(keys, live.iter().map(|(id, _)| *id).collect());

        for (id, value) in &live {
            assert_eq!(p.at(*id).unwrap(), value);
        }
        for id in dead.iter().filter(|id| !keys.contains(id)) {
            assert!(p.at(*id).is_err());
        }
    }
}
