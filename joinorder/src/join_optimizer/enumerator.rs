/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Exhaustive join-order search over small groups of plans
//!
//! Subsets of the input are bitmasks. Row `k` of the table maps every subset
//! of `k + 1` plans to the best plan found for it so far. Rows are filled
//! bottom-up; each subset is built from every split into two non-empty
//! halves whose best plans are already known.

use super::cost::CostEstimator;
use super::plan::Plan;
use super::workers::{join_scope, WorkerBudget};
use log::{debug, trace};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Largest input the bitmask representation can hold
pub const MAX_ENUMERATED_PLANS: usize = 63;

type TableRow = Mutex<FxHashMap<u64, Plan>>;

/// Partial assignment of plan indices to the two halves of a join
#[derive(Debug, Clone, Copy)]
struct Split {
    index: usize,
    left: u64,
    right: u64,
    left_size: usize,
    right_size: usize,
}

impl Split {
    fn empty() -> Self {
        Split {
            index: 0,
            left: 0,
            right: 0,
            left_size: 0,
            right_size: 0,
        }
    }

    fn size(&self) -> usize {
        self.left_size + self.right_size
    }

    fn skip(self) -> Self {
        Split {
            index: self.index + 1,
            ..self
        }
    }

    fn to_left(self) -> Self {
        Split {
            index: self.index + 1,
            left: self.left | (1 << self.index),
            left_size: self.left_size + 1,
            ..self
        }
    }

    fn to_right(self) -> Self {
        Split {
            index: self.index + 1,
            right: self.right | (1 << self.index),
            right_size: self.right_size + 1,
            ..self
        }
    }
}

pub struct Enumerator<'e, 'a> {
    estimator: &'e CostEstimator<'a>,
    budget: WorkerBudget,
}

impl<'e, 'a> Enumerator<'e, 'a> {
    /// Creates an enumerator that spawns at most `max_workers` extra threads
    pub fn new(estimator: &'e CostEstimator<'a>, max_workers: usize) -> Self {
        Self {
            estimator,
            budget: WorkerBudget::new(max_workers),
        }
    }

    /// Returns the best join tree over all `plans`
    ///
    /// # Panics
    ///
    /// Panics if `plans` is empty or holds more than [`MAX_ENUMERATED_PLANS`] plans.
    pub fn enumerate(&self, mut plans: Vec<Plan>) -> Plan {
        assert!(!plans.is_empty(), "cannot enumerate an empty set of plans");
        assert!(
            plans.len() <= MAX_ENUMERATED_PLANS,
            "cannot enumerate more than {} plans",
            MAX_ENUMERATED_PLANS
        );

        match plans.len() {
            1 => plans.remove(0),
            2 => {
                let right = plans.remove(1);
                let left = plans.remove(0);
                self.estimator.join(left, right)
            }
            _ => self.dynamic_programming(plans),
        }
    }

    fn dynamic_programming(&self, plans: Vec<Plan>) -> Plan {
        let n = plans.len();
        debug!(
            "Enumerating join orders over {} plans with at most {} workers",
            n,
            self.budget.max_workers()
        );

        let table: Vec<TableRow> = (0..n).map(|_| Mutex::new(FxHashMap::default())).collect();
        {
            let mut singletons = lock(&table[0]);
            for (index, plan) in plans.into_iter().enumerate() {
                singletons.insert(1u64 << index, plan);
            }
        }

        for k in 1..n {
            self.explore(&table, n, k + 1, Split::empty());
            trace!("DP row {} holds {} subsets", k, lock(&table[k]).len());
        }

        let full: u64 = (1u64 << n) - 1;
        let mut last = lock(&table[n - 1]);
        match last.remove(&full) {
            Some(plan) => plan,
            // every split of the full set has non-empty halves, so row n-1 is populated
            None => unreachable!("no plan covers all {} inputs", n),
        }
    }

    /// Visits every split of a `target`-sized subset reachable from `split`
    ///
    /// Each index is either left out, put on the left or put on the right.
    /// Branches stop as soon as the target size is reached or can no longer be.
    fn explore(&self, table: &[TableRow], n: usize, target: usize, split: Split) {
        if split.size() == target {
            if split.left_size > 0 && split.right_size > 0 {
                self.consider(table, split);
            }
            return;
        }
        if split.index == n || split.size() + (n - split.index) < target {
            return;
        }

        match self.budget.try_acquire() {
            Some(slot) => {
                let result = crossbeam::scope(|scope| {
                    scope.spawn(move |_| {
                        let _slot = slot;
                        self.explore(table, n, target, split.skip());
                    });
                    self.explore(table, n, target, split.to_left());
                    self.explore(table, n, target, split.to_right());
                });
                join_scope(result);
            }
            None => {
                self.explore(table, n, target, split.skip());
                self.explore(table, n, target, split.to_left());
                self.explore(table, n, target, split.to_right());
            }
        }
    }

    /// Joins the best plans of both halves and keeps the result if it is strictly better
    fn consider(&self, table: &[TableRow], split: Split) {
        let left = lock(&table[split.left_size - 1]).get(&split.left).cloned();
        let right = lock(&table[split.right_size - 1]).get(&split.right).cloned();
        let (left, right) = match (left, right) {
            (Some(left), Some(right)) => (left, right),
            _ => return,
        };

        let candidate = self.estimator.join(left, right);
        let mask = split.left | split.right;
        let mut row = lock(&table[split.size() - 1]);
        let replace = match row.get(&mask) {
            Some(best) => candidate.compare(best) == Ordering::Less,
            None => true,
        };
        if replace {
            trace!("best plan for {:#b} is now {}", mask, candidate);
            row.insert(mask, candidate);
        }
    }
}

fn lock(row: &TableRow) -> MutexGuard<'_, FxHashMap<u64, Plan>> {
    row.lock().unwrap_or_else(PoisonError::into_inner)
}
