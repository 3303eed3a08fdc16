//! Synchronized backtracking enumeration over two selector chains.
//!
//! `DataSelector` owns an ordered chain of selectors for the training side
//! and one for the testing side, and enumerates every combination of scope
//! positions in which all selectors of both chains are simultaneously in
//! range. It behaves like a mixed-radix odometer whose digits are stateful
//! domain iterators: the innermost (highest-index) level shifts first, and
//! a level that runs out of range resets and carries into the next-outer
//! level. Chains of unequal length are allowed; a level present in only
//! one chain shifts and validates alone.

use tracing::debug;

use crate::data::Dataset;

use super::selector::{ScopeSelector, ScopeState};
use super::ScopeError;

/// Enumerates (train-subset, test-subset) combinations across two chains
/// of scope selectors kept in lockstep.
///
/// Invariant: whenever the cursor sits at level `i >= 0`, every selector
/// below `i` in both chains is in range, so `holds` only needs to inspect
/// the outermost level.
#[derive(Debug)]
pub struct DataSelector {
    train_selectors: Vec<ScopeSelector>,
    test_selectors: Vec<ScopeSelector>,
    max_index: usize,
    /// Cursor over nesting levels, in `[-1, max_index]`. Starts at the
    /// `max_index` sentinel; `-1` means the enumeration is exhausted.
    selector_index: isize,
}

impl DataSelector {
    pub fn new(train_selectors: Vec<ScopeSelector>, test_selectors: Vec<ScopeSelector>) -> Self {
        let max_index = train_selectors.len().max(test_selectors.len());
        if train_selectors.len() != test_selectors.len() {
            debug!(
                train_levels = train_selectors.len(),
                test_levels = test_selectors.len(),
                "selector chains differ in length; unpaired levels shift independently"
            );
        }
        Self {
            train_selectors,
            test_selectors,
            max_index,
            selector_index: max_index as isize,
        }
    }

    /// Whether the current combination is valid and enumeration may
    /// continue. Only the outermost level of each non-empty chain is
    /// checked; inner levels are in range by invariant.
    pub fn holds(&self) -> bool {
        if self.selector_index < 0 {
            return false;
        }
        if let Some(first) = self.train_selectors.first() {
            if !first.holds() {
                return false;
            }
        }
        if let Some(first) = self.test_selectors.first() {
            if !first.holds() {
                return false;
            }
        }
        true
    }

    /// Advance to the next valid combination, carrying outward when a
    /// level runs out of range. No-op once exhausted.
    ///
    /// Both chains shift together at the cursor level; a chain without a
    /// selector at that level is trivially satisfied. On failure the
    /// shifted selectors reset and the cursor moves one level out; the
    /// cursor dropping below zero ends the enumeration for good.
    pub fn update(&mut self) {
        if !self.holds() {
            return;
        }
        if self.selector_index == self.max_index as isize {
            self.selector_index -= 1;
        }
        while self.selector_index >= 0 {
            let level = self.selector_index as usize;

            let mut in_range = true;
            if let Some(selector) = self.train_selectors.get_mut(level) {
                selector.update();
                in_range &= selector.holds();
            }
            if let Some(selector) = self.test_selectors.get_mut(level) {
                selector.update();
                in_range &= selector.holds();
            }

            if in_range {
                self.selector_index += 1;
                return;
            }

            if let Some(selector) = self.train_selectors.get_mut(level) {
                selector.reset_state();
            }
            if let Some(selector) = self.test_selectors.get_mut(level) {
                selector.reset_state();
            }
            self.selector_index -= 1;
            debug!(level, "scope level exhausted, carrying outward");
        }
        debug!("scope enumeration exhausted");
    }

    /// Apply the training chain outer-to-inner, each level narrowing the
    /// previous level's copy. An empty chain is the identity (still a
    /// copy).
    pub fn transform_train(&mut self, dataset: &Dataset) -> Result<Dataset, ScopeError> {
        transform_chain(&mut self.train_selectors, dataset)
    }

    /// Apply the testing chain outer-to-inner.
    pub fn transform_test(&mut self, dataset: &Dataset) -> Result<Dataset, ScopeError> {
        transform_chain(&mut self.test_selectors, dataset)
    }

    /// Restore every selector in both chains and restart the enumeration.
    pub fn reset_state(&mut self) {
        for selector in self
            .train_selectors
            .iter_mut()
            .chain(self.test_selectors.iter_mut())
        {
            selector.reset_state();
        }
        self.selector_index = self.max_index as isize;
    }

    /// Current positions of the training chain, outer to inner.
    pub fn train_states(&self) -> Vec<ScopeState> {
        self.train_selectors
            .iter()
            .map(|s| s.current_state())
            .collect()
    }

    /// Current positions of the testing chain, outer to inner.
    pub fn test_states(&self) -> Vec<ScopeState> {
        self.test_selectors
            .iter()
            .map(|s| s.current_state())
            .collect()
    }

    /// One-line description of the current combination, for logs.
    pub fn describe(&self) -> String {
        let fmt = |states: Vec<ScopeState>| {
            states
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "train[{}] test[{}]",
            fmt(self.train_states()),
            fmt(self.test_states())
        )
    }
}

fn transform_chain(
    selectors: &mut [ScopeSelector],
    dataset: &Dataset,
) -> Result<Dataset, ScopeError> {
    let mut current = dataset.deepcopy();
    for selector in selectors {
        current = selector.transform(&current)?;
    }
    Ok(current)
}
