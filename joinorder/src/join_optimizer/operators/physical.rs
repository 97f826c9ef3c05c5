/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::super::plan::{Plan, PlanNode};
use super::super::stats::VariableBounds;
use super::{IndexScan, OperatorGraphBuilder};
use serde::Serialize;
use shared::terms::{pattern_variables, TriplePattern};

/// Physical operators represent the execution plan after join ordering
#[derive(Debug, Clone, Serialize)]
pub enum PhysicalOperator<H> {
    IndexScan {
        pattern: TriplePattern,
        collation: Vec<String>,
        handle: H,
    },
    MergeJoin {
        left: Box<PhysicalOperator<H>>,
        right: Box<PhysicalOperator<H>>,
        join_vars: Vec<String>,
    },
    HashJoin {
        left: Box<PhysicalOperator<H>>,
        right: Box<PhysicalOperator<H>>,
        join_vars: Vec<String>,
    },
    CartesianProduct {
        left: Box<PhysicalOperator<H>>,
        right: Box<PhysicalOperator<H>>,
    },
}

impl<H> PhysicalOperator<H> {
    /// Creates a new index scan physical operator
    pub fn index_scan(pattern: TriplePattern, collation: Vec<String>, handle: H) -> Self {
        Self::IndexScan {
            pattern,
            collation,
            handle,
        }
    }

    /// Creates a new merge join physical operator
    pub fn merge_join(left: Self, right: Self, join_vars: Vec<String>) -> Self {
        Self::MergeJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_vars,
        }
    }

    /// Creates a new hash join physical operator
    pub fn hash_join(left: Self, right: Self, join_vars: Vec<String>) -> Self {
        Self::HashJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_vars,
        }
    }

    /// Creates a new cartesian product physical operator
    pub fn cartesian_product(left: Self, right: Self) -> Self {
        Self::CartesianProduct {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Patterns scanned by this operator tree, left to right
    pub fn scanned_patterns(&self) -> Vec<&TriplePattern> {
        match self {
            Self::IndexScan { pattern, .. } => vec![pattern],
            Self::MergeJoin { left, right, .. }
            | Self::HashJoin { left, right, .. }
            | Self::CartesianProduct { left, right } => {
                let mut patterns = left.scanned_patterns();
                patterns.extend(right.scanned_patterns());
                patterns
            }
        }
    }

    pub fn count_merge_joins(&self) -> usize {
        match self {
            Self::IndexScan { .. } => 0,
            Self::MergeJoin { left, right, .. } => {
                1 + left.count_merge_joins() + right.count_merge_joins()
            }
            Self::HashJoin { left, right, .. } | Self::CartesianProduct { left, right } => {
                left.count_merge_joins() + right.count_merge_joins()
            }
        }
    }
}

/// Default operator-graph builder
///
/// Merge joins become [`PhysicalOperator::MergeJoin`], other joins on shared
/// variables become hash joins and joins without shared variables become
/// cartesian products. Leaves are scanned in the collation the plan imposed
/// on them, or in pattern order if none was imposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalPlanBuilder;

impl PhysicalPlanBuilder {
    fn translate<S: IndexScan>(
        plan: &Plan,
        index_scan: &S,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> PhysicalOperator<S::Handle> {
        match plan.node() {
            PlanNode::Leaf { pattern } => {
                let collation = plan
                    .order()
                    .map(<[String]>::to_vec)
                    .unwrap_or_else(|| pattern_variables(pattern));
                let handle = index_scan.scan(pattern, minima, maxima);
                PhysicalOperator::index_scan(pattern.clone(), collation, handle)
            }
            PlanNode::Inner {
                left,
                right,
                join_partner,
            } => {
                let left_op = Self::translate(left, index_scan, minima, maxima);
                let right_op = Self::translate(right, index_scan, minima, maxima);
                if join_partner.is_empty() {
                    PhysicalOperator::cartesian_product(left_op, right_op)
                } else if plan.is_merge_join() {
                    let join_vars = plan
                        .order()
                        .map(|order| order[..join_partner.len()].to_vec())
                        .unwrap_or_else(|| join_partner.iter().cloned().collect());
                    PhysicalOperator::merge_join(left_op, right_op, join_vars)
                } else {
                    let join_vars = join_partner.iter().cloned().collect();
                    PhysicalOperator::hash_join(left_op, right_op, join_vars)
                }
            }
        }
    }
}

impl<S: IndexScan> OperatorGraphBuilder<S> for PhysicalPlanBuilder {
    type Graph = PhysicalOperator<S::Handle>;

    fn build(
        &self,
        plan: &Plan,
        index_scan: &S,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Self::Graph {
        Self::translate(plan, index_scan, minima, maxima)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join_optimizer::cost::{CostConstants, CostEstimator};
    use crate::join_optimizer::stats::{Statistics, TripleStatistics};
    use shared::terms::Term;
    use shared::triple::Triple;

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    fn stats() -> TripleStatistics {
        TripleStatistics::from_triples(vec![
            Triple::new(1, 10, 2),
            Triple::new(2, 11, 3),
            Triple::new(4, 12, 5),
            Triple::new(2, 10, 6),
        ])
    }

    fn leaf(estimator: &CostEstimator<'_>, stats: &TripleStatistics, pattern: TriplePattern) -> Plan {
        let variables = pattern_variables(&pattern);
        let selectivity = stats
            .histogram(&pattern, &variables, &VariableBounds::new(), &VariableBounds::new())
            .ok();
        estimator.leaf(pattern, selectivity)
    }

    #[test]
    fn test_merge_join_and_cartesian_product_are_translated() {
        let stats = stats();
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let joined = estimator.join(
            leaf(&estimator, &stats, (var("?a"), Term::Constant(10), var("?x"))),
            leaf(&estimator, &stats, (var("?x"), Term::Constant(11), var("?b"))),
        );
        let plan = estimator.join(
            joined,
            leaf(&estimator, &stats, (var("?c"), Term::Constant(12), var("?d"))),
        );

        let mut minima = VariableBounds::new();
        minima.insert("?x".to_string(), 2);
        let graph = PhysicalPlanBuilder.build(&plan, &stats, &minima, &VariableBounds::new());

        match &graph {
            PhysicalOperator::CartesianProduct { left, .. } => match left.as_ref() {
                PhysicalOperator::MergeJoin {
                    left: scan,
                    join_vars,
                    ..
                } => {
                    assert_eq!(join_vars, &vec!["?x".to_string()]);
                    match scan.as_ref() {
                        PhysicalOperator::IndexScan {
                            collation, handle, ..
                        } => {
                            assert_eq!(collation[0], "?x");
                            assert_eq!(handle.lower.get("?x"), Some(&2));
                        }
                        other => panic!("expected an index scan, got {:?}", other),
                    }
                }
                other => panic!("expected a merge join, got {:?}", other),
            },
            other => panic!("expected a cartesian product, got {:?}", other),
        }
        assert_eq!(graph.scanned_patterns().len(), 3);
        assert_eq!(graph.count_merge_joins(), 1);
    }
}
