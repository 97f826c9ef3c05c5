/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::super::config::OptimizerConfig;
use super::super::plan::{Plan, PlanNode};
use super::super::stats::{Selectivity, Statistics};
use super::ordering::{apply_ordering, merge_join_ordering};
use log::warn;
use shared::terms::TriplePattern;
use std::collections::BTreeSet;

/// Cost model constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostConstants {
    pub cartesian_penalty: f64,
    pub default_join_penalty: f64,
    pub nearly_key_ratio: f64,
    pub leaf_cost_factor: f64,
}

impl Default for CostConstants {
    fn default() -> Self {
        Self {
            cartesian_penalty: 10.0,
            default_join_penalty: 3.0,
            nearly_key_ratio: 1.2,
            leaf_cost_factor: 1.0,
        }
    }
}

impl From<&OptimizerConfig> for CostConstants {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            cartesian_penalty: config.cartesian_penalty,
            default_join_penalty: config.default_join_penalty,
            nearly_key_ratio: config.nearly_key_ratio,
            leaf_cost_factor: config.leaf_cost_factor,
        }
    }
}

/// Builds plans and estimates their cost from the statistics capability
pub struct CostEstimator<'a> {
    stats: &'a dyn Statistics,
    constants: CostConstants,
}

impl<'a> CostEstimator<'a> {
    /// Creates a new cost estimator with the given statistics
    pub fn new(stats: &'a dyn Statistics, constants: CostConstants) -> Self {
        Self { stats, constants }
    }

    /// Builds a leaf plan; `None` selectivity means no histogram is known
    pub fn leaf(&self, pattern: TriplePattern, selectivity: Option<Selectivity>) -> Plan {
        let mut plan = Plan::new_leaf(pattern, selectivity);
        plan.cost = self.estimate_cost(&plan);
        plan
    }

    /// Joins two plans over disjoint pattern sets
    ///
    /// Without an estimate for either side, cardinality and cost collapse to 0
    /// and the join is treated as maximally attractive.
    pub fn join(&self, mut left: Plan, mut right: Plan) -> Plan {
        let selectivity = match (&left.selectivity, &right.selectivity) {
            (Some(left_sel), Some(right_sel)) => {
                match self.stats.join_selectivity(left_sel, right_sel) {
                    Ok(selectivity) => Some(selectivity),
                    Err(err) => {
                        warn!("join selectivity unavailable, assuming no estimate: {}", err);
                        None
                    }
                }
            }
            _ => None,
        };

        let join_partner: BTreeSet<String> = left
            .variables
            .intersection(&right.variables)
            .cloned()
            .collect();
        // children only receive an imposed ordering once it is proven feasible
        let ordering = merge_join_ordering(&left, &right, &join_partner);
        if let Some((ordering, _)) = &ordering {
            apply_ordering(&mut left, ordering);
            apply_ordering(&mut right, ordering);
        }

        let mut plan = Plan::new_inner(left, right, selectivity);
        if let Some((ordering, merges)) = ordering {
            plan.order = Some(ordering);
            plan.number_merge_joins = merges;
        }
        plan.cost = self.estimate_cost(&plan);
        plan
    }

    /// Estimates the cost of executing a plan
    pub fn estimate_cost(&self, plan: &Plan) -> f64 {
        self.cost_with_bound(plan, None)
    }

    /// Cost of `plan` when at most `bound` of its rows are needed
    ///
    /// The bound is the sideways information a nearly-key merge join passes
    /// from its smaller operand into the larger one.
    fn cost_with_bound(&self, plan: &Plan, bound: Option<f64>) -> f64 {
        if plan.selectivity.is_none() {
            return 0.0;
        }
        let cardinality = Self::bounded(plan.cardinality, bound);

        match &plan.node {
            PlanNode::Leaf { .. } => cardinality * self.constants.leaf_cost_factor,
            PlanNode::Inner {
                left,
                right,
                join_partner,
            } => {
                let child_cost = |child: &Plan| match bound {
                    Some(_) => self.cost_with_bound(child, bound),
                    None => child.cost,
                };
                let left_cost = child_cost(left.as_ref());
                let right_cost = child_cost(right.as_ref());

                if join_partner.is_empty() {
                    let passed_up = Self::bounded(left.cardinality.min(right.cardinality), bound);
                    return (passed_up + left_cost + right_cost) * self.constants.cartesian_penalty;
                }
                if plan.order.is_none() {
                    return (cardinality + left_cost + right_cost)
                        * self.constants.default_join_penalty;
                }

                let (smaller, smaller_cost, larger, larger_cost) =
                    if left.cardinality <= right.cardinality {
                        (left, left_cost, right, right_cost)
                    } else {
                        (right, right_cost, left, left_cost)
                    };
                if self.is_nearly_key(larger, join_partner) {
                    let sip = Self::bounded(smaller.cardinality, bound);
                    cardinality + smaller_cost + self.cost_with_bound(larger, Some(sip))
                } else {
                    cardinality + smaller_cost + larger_cost
                }
            }
        }
    }

    /// True if every join variable has close to one occurrence per distinct value in `plan`
    fn is_nearly_key(&self, plan: &Plan, join_partner: &BTreeSet<String>) -> bool {
        let selectivity = match &plan.selectivity {
            Some(selectivity) => selectivity,
            None => return false,
        };
        join_partner.iter().all(|variable| {
            selectivity
                .buckets
                .get(variable)
                .and_then(|bucket| bucket.occurrence_ratio())
                .map_or(false, |ratio| ratio <= self.constants.nearly_key_ratio)
        })
    }

    fn bounded(cardinality: f64, bound: Option<f64>) -> f64 {
        match bound {
            Some(bound) => cardinality.min(bound),
            None => cardinality,
        }
    }
}
