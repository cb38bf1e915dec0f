//! A set that supports uniform random draws
//!
//! Elements live in a dense `Vec` with a position index beside it, so
//! insert, remove and a random pick are all O(1).

use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct RandomSet<T> {
    items: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Hash + Eq + Clone> RandomSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns false if the element was already present
    pub fn add(&mut self, item: T) -> bool {
        if self.positions.contains_key(&item) {
            return false;
        }
        self.positions.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Returns false if the element was not present
    pub fn remove(&mut self, item: &T) -> bool {
        let idx = match self.positions.remove(item) {
            Some(idx) => idx,
            None => return false,
        };
        self.items.swap_remove(idx);
        // The former last element moved into the hole
        if let Some(moved) = self.items.get(idx) {
            self.positions.insert(moved.clone(), idx);
        }
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Uniformly random element, None when empty
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.items.get(rng.gen_range(0..self.items.len()))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Hash + Eq + Clone> Default for RandomSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
