/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::config::OptimizerConfig;
use super::cost::{CostConstants, CostEstimator};
use super::enumerator::Enumerator;
use super::error::OptimizerError;
use super::heuristics::{balanced_chunk_sizes, size_heuristics, CartesianProductSplit, SplitHeuristic};
use super::operators::{IndexScan, OperatorGraphBuilder};
use super::plan::Plan;
use super::stats::{Statistics, VariableBounds};
use super::workers::{join_scope, WorkerBudget};
use log::{debug, warn};
use rayon::prelude::*;
use shared::terms::{pattern_contains_variable, pattern_variables, render_pattern, TriplePattern};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

/// Cost-based join-order optimizer
///
/// Holds no state between calls; every call to [`optimize`](Self::optimize)
/// runs leaf construction, splitting and enumeration from scratch.
pub struct JoinOrderOptimizer<'a> {
    stats: &'a dyn Statistics,
    config: OptimizerConfig,
}

impl<'a> JoinOrderOptimizer<'a> {
    /// Creates an optimizer with the default configuration
    pub fn new(stats: &'a dyn Statistics) -> Self {
        Self {
            stats,
            config: OptimizerConfig::default(),
        }
    }

    /// Creates an optimizer with a validated configuration
    pub fn with_config(
        stats: &'a dyn Statistics,
        config: OptimizerConfig,
    ) -> Result<Self, OptimizerError> {
        config.validate()?;
        Ok(Self { stats, config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Finds the best join tree over `patterns`
    ///
    /// Duplicate patterns are optimized once. Fails only on an empty input.
    pub fn optimize(&self, patterns: &[TriplePattern]) -> Result<Plan, OptimizerError> {
        let (plan, _, _) = self.optimize_with_bounds(patterns)?;
        Ok(plan)
    }

    /// Optimizes `patterns` and hands the plan to `builder` with the collected bounds
    pub fn optimize_into<S, B>(
        &self,
        patterns: &[TriplePattern],
        index_scan: &S,
        builder: &B,
    ) -> Result<B::Graph, OptimizerError>
    where
        S: IndexScan,
        B: OperatorGraphBuilder<S>,
    {
        let (plan, minima, maxima) = self.optimize_with_bounds(patterns)?;
        debug!("Building operator graph for {}", plan);
        Ok(builder.build(&plan, index_scan, &minima, &maxima))
    }

    fn optimize_with_bounds(
        &self,
        patterns: &[TriplePattern],
    ) -> Result<(Plan, VariableBounds, VariableBounds), OptimizerError> {
        let patterns = deduplicate(patterns);
        if patterns.is_empty() {
            return Err(OptimizerError::EmptyQuery);
        }
        debug!("Optimizing join order of {} triple patterns", patterns.len());

        let estimator = CostEstimator::new(self.stats, CostConstants::from(&self.config));
        let join_partners = join_partner_variables(&patterns);
        let (minima, maxima) = self.global_bounds(&patterns, &join_partners);
        debug!(
            "Join partners {:?}, minima {:?}, maxima {:?}",
            join_partners, minima, maxima
        );

        let leaves = self.build_leaves(&estimator, patterns, &join_partners, &minima, &maxima);
        debug!("Built {} leaf plans", leaves.len());
        let enumerator = Enumerator::new(&estimator, self.config.enumeration_workers);
        let plan = self.solve(&enumerator, leaves);

        debug!(
            "Chose plan {} with cost {} and {} merge joins",
            plan,
            plan.cost(),
            plan.number_merge_joins()
        );
        Ok((plan, minima, maxima))
    }

    /// Intersects the per-pattern ranges of every join-partner variable
    ///
    /// A failed lookup contributes nothing; a variable no lookup succeeded
    /// for has no bound at all.
    fn global_bounds(
        &self,
        patterns: &[TriplePattern],
        join_partners: &BTreeSet<String>,
    ) -> (VariableBounds, VariableBounds) {
        let requests: Vec<(&String, &TriplePattern)> = join_partners
            .iter()
            .flat_map(|variable| {
                patterns
                    .iter()
                    .filter(move |pattern| pattern_contains_variable(pattern, variable))
                    .map(move |pattern| (variable, pattern))
            })
            .collect();

        let ranges: Vec<(&String, Option<(u32, u32)>)> = requests
            .par_iter()
            .map(|(variable, pattern)| match self.stats.min_max(variable, pattern) {
                Ok(range) => (*variable, Some(range)),
                Err(err) => {
                    warn!(
                        "No bounds for {} in {}: {}",
                        variable,
                        render_pattern(pattern),
                        err
                    );
                    (*variable, None)
                }
            })
            .collect();

        let mut minima = VariableBounds::new();
        let mut maxima = VariableBounds::new();
        for (variable, range) in ranges {
            if let Some((min, max)) = range {
                let lower = minima.entry(variable.clone()).or_insert(min);
                *lower = (*lower).max(min);
                let upper = maxima.entry(variable.clone()).or_insert(max);
                *upper = (*upper).min(max);
            }
        }
        (minima, maxima)
    }

    /// Builds one leaf plan per pattern, spawning at most `leaf_workers` threads
    fn build_leaves(
        &self,
        estimator: &CostEstimator<'_>,
        patterns: Vec<TriplePattern>,
        join_partners: &BTreeSet<String>,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Vec<Plan> {
        let budget = WorkerBudget::new(self.config.leaf_workers);
        let built: Mutex<Vec<(usize, Plan)>> = Mutex::new(Vec::with_capacity(patterns.len()));

        let result = crossbeam::scope(|scope| {
            for (index, pattern) in patterns.into_iter().enumerate() {
                match budget.try_acquire() {
                    Some(slot) => {
                        let built = &built;
                        scope.spawn(move |_| {
                            let _slot = slot;
                            let leaf = self.build_leaf(estimator, pattern, join_partners, minima, maxima);
                            built
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push((index, leaf));
                        });
                    }
                    None => {
                        let leaf = self.build_leaf(estimator, pattern, join_partners, minima, maxima);
                        built
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((index, leaf));
                    }
                }
            }
        });
        join_scope(result);

        let mut built = built.into_inner().unwrap_or_else(PoisonError::into_inner);
        built.sort_by_key(|(index, _)| *index);
        built.into_iter().map(|(_, leaf)| leaf).collect()
    }

    fn build_leaf(
        &self,
        estimator: &CostEstimator<'_>,
        pattern: TriplePattern,
        join_partners: &BTreeSet<String>,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Plan {
        let variables: Vec<String> = pattern_variables(&pattern)
            .into_iter()
            .filter(|variable| join_partners.contains(variable))
            .collect();

        let selectivity = match self.stats.histogram(&pattern, &variables, minima, maxima) {
            Ok(selectivity) => Some(selectivity),
            Err(err) => {
                warn!("No histogram for {}: {}", render_pattern(&pattern), err);
                None
            }
        };
        estimator.leaf(pattern, selectivity)
    }

    fn solve(&self, enumerator: &Enumerator<'_, '_>, leaves: Vec<Plan>) -> Plan {
        let groups = CartesianProductSplit.split(leaves);
        debug!("{} connected groups", groups.len());

        let heuristics = size_heuristics(self.config.split_threshold);
        let plans = groups
            .into_iter()
            .map(|group| self.solve_group(enumerator, &heuristics, group))
            .collect();
        self.combine(enumerator, plans)
    }

    /// Enumerates small groups directly and splits larger ones
    fn solve_group(
        &self,
        enumerator: &Enumerator<'_, '_>,
        heuristics: &[Box<dyn SplitHeuristic>],
        group: Vec<Plan>,
    ) -> Plan {
        if group.len() <= self.config.split_threshold {
            return enumerator.enumerate(group);
        }

        let mut group = group;
        for heuristic in heuristics {
            let size = group.len();
            let mut parts = heuristic.split(group);
            if parts.len() > 1 {
                debug!(
                    "{} split {} leaves into groups of {:?}",
                    heuristic.name(),
                    size,
                    parts.iter().map(Vec::len).collect::<Vec<_>>()
                );
                let plans = parts
                    .into_iter()
                    .map(|part| self.solve_group(enumerator, heuristics, part))
                    .collect();
                return self.combine(enumerator, plans);
            }
            group = parts.pop().unwrap_or_default();
        }
        self.combine(enumerator, group)
    }

    /// Joins plans covering disjoint patterns into one
    ///
    /// More plans than the split threshold are combined in chunks of similar
    /// cardinality until few enough remain for one enumeration.
    fn combine(&self, enumerator: &Enumerator<'_, '_>, mut plans: Vec<Plan>) -> Plan {
        let threshold = self.config.split_threshold;
        while plans.len() > threshold {
            plans.sort_by(|a, b| {
                a.cardinality()
                    .total_cmp(&b.cardinality())
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            });
            debug!("Combining {} plans in chunks of at most {}", plans.len(), threshold);

            let mut remaining = plans.into_iter();
            plans = balanced_chunk_sizes(remaining.len(), threshold)
                .into_iter()
                .map(|size| enumerator.enumerate(remaining.by_ref().take(size).collect()))
                .collect();
        }
        enumerator.enumerate(plans)
    }
}

/// Keeps the first occurrence of every pattern
fn deduplicate(patterns: &[TriplePattern]) -> Vec<TriplePattern> {
    let mut seen = BTreeSet::new();
    let unique: Vec<TriplePattern> = patterns
        .iter()
        .filter(|pattern| seen.insert((*pattern).clone()))
        .cloned()
        .collect();
    if unique.len() < patterns.len() {
        debug!("Ignoring {} duplicate patterns", patterns.len() - unique.len());
    }
    unique
}

/// Variables occurring in more than one pattern
fn join_partner_variables(patterns: &[TriplePattern]) -> BTreeSet<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for pattern in patterns {
        for variable in pattern_variables(pattern) {
            *counts.entry(variable).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(variable, _)| variable)
        .collect()
}
