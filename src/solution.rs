use std::collections::BTreeMap;

use rand::Rng;

use crate::error::Error;
use crate::types::{ItemInstance, Pattern};

/// A packed sheet together with how many copies of it are cut.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionPattern {
    pub pattern: Pattern,
    pub copies: f64,
    occurrences: BTreeMap<usize, u32>,
}

impl SolutionPattern {
    pub fn new(pattern: Pattern) -> Self {
        let mut occurrences = BTreeMap::new();
        for p in &pattern.placements {
            *occurrences.entry(p.item_type).or_insert(0) += 1;
        }
        Self {
            pattern,
            copies: 0.0,
            occurrences,
        }
    }

    /// Pieces of `item_type` in one copy of the pattern.
    pub fn occurrence(&self, item_type: usize) -> u32 {
        self.occurrences.get(&item_type).copied().unwrap_or(0)
    }

    pub fn occurrences(&self) -> &BTreeMap<usize, u32> {
        &self.occurrences
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Added { item_type: usize },
    Removed { item_type: usize },
}

/// One chromosome: a multiset of item instances, kept in packing order, with
/// its per-type counts and the result of its last evaluation.
#[derive(Debug, Clone)]
pub struct Solution {
    items: Vec<ItemInstance>,
    item_counts: Vec<u32>,
    pub patterns: Vec<SolutionPattern>,
    pub cost: f64,
    /// Why the last evaluation rejected this candidate.
    pub failure: Option<Error>,
    /// Generation in which this solution survived selection.
    pub selected_in: Option<usize>,
}

impl Solution {
    /// Builds fresh instances, grouped by item type in type order.
    pub fn from_counts(counts: &[u32]) -> Self {
        let items = counts
            .iter()
            .enumerate()
            .flat_map(|(item_type, &count)| {
                (0..count).map(move |_| ItemInstance::new(item_type))
            })
            .collect();
        Self {
            items,
            item_counts: counts.to_vec(),
            patterns: Vec::new(),
            cost: f64::INFINITY,
            failure: None,
            selected_in: None,
        }
    }

    pub fn items(&self) -> &[ItemInstance] {
        &self.items
    }

    /// Placement fields only; the multiset itself changes through
    /// [`Solution::add_item`] and [`Solution::remove_item`].
    pub(crate) fn items_mut(&mut self) -> &mut [ItemInstance] {
        &mut self.items
    }

    pub fn item_counts(&self) -> &[u32] {
        &self.item_counts
    }

    pub fn is_feasible(&self) -> bool {
        self.failure.is_none() && self.cost.is_finite()
    }

    pub fn add_item(&mut self, item_type: usize) {
        self.items.push(ItemInstance::new(item_type));
        self.item_counts[item_type] += 1;
    }

    /// Removes the instance at `index` unless it is the last of its type.
    pub fn remove_item(&mut self, index: usize) -> Option<usize> {
        let item_type = self.items.get(index)?.item_type;
        if self.item_counts[item_type] <= 1 {
            return None;
        }
        self.items.remove(index);
        self.item_counts[item_type] -= 1;
        Some(item_type)
    }

    /// Adds one instance of a random type, or removes a random instance whose
    /// type keeps at least one other. Adding is forced when no type has a
    /// spare instance.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Mutation> {
        let type_count = self.item_counts.len();
        if type_count == 0 {
            return None;
        }

        let has_spare = self.item_counts.iter().any(|&count| count > 1);
        let mutation = if !has_spare || rng.random_bool(0.5) {
            let item_type = rng.random_range(0..type_count);
            self.add_item(item_type);
            Mutation::Added { item_type }
        } else {
            let item_type = loop {
                let index = rng.random_range(0..self.items.len());
                if let Some(item_type) = self.remove_item(index) {
                    break item_type;
                }
            };
            Mutation::Removed { item_type }
        };

        self.patterns.clear();
        self.cost = f64::INFINITY;
        self.failure = None;
        Some(mutation)
    }

    /// Checks the per-type counts against the instance list.
    pub fn counts_consistent(&self) -> bool {
        let mut actual = vec![0u32; self.item_counts.len()];
        for item in &self.items {
            match actual.get_mut(item.item_type) {
                Some(count) => *count += 1,
                None => return false,
            }
        }
        actual == self.item_counts
    }
}
