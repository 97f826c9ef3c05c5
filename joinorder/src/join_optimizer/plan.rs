/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::cost::CostEstimator;
use super::stats::Selectivity;
use serde::Serialize;
use shared::terms::{pattern_variables, render_pattern, TriplePattern};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Shape of a plan node
#[derive(Debug, Clone, Serialize)]
pub enum PlanNode {
    /// Index scan of a single triple pattern
    Leaf { pattern: TriplePattern },
    /// Binary join; both children are owned exclusively by their parent
    Inner {
        left: Box<Plan>,
        right: Box<Plan>,
        /// Variables shared by both children, empty for a cartesian product
        join_partner: BTreeSet<String>,
    },
}

/// A (sub-)plan of the join tree with its cached estimates
///
/// Plans are values: every field is derived when the plan is built and
/// cloning a plan clones the whole subtree.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub(crate) node: PlanNode,
    pub(crate) triple_patterns: Vec<TriplePattern>,
    pub(crate) variables: BTreeSet<String>,
    pub(crate) order: Option<Vec<String>>,
    pub(crate) selectivity: Option<Selectivity>,
    pub(crate) cardinality: f64,
    pub(crate) cost: f64,
    pub(crate) number_joins: usize,
    pub(crate) number_merge_joins: usize,
    pub(crate) number_cartesian_products: usize,
}

impl Plan {
    /// Structural part of a leaf; cost is filled in by the estimator
    pub(crate) fn new_leaf(pattern: TriplePattern, selectivity: Option<Selectivity>) -> Self {
        let variables = pattern_variables(&pattern).into_iter().collect();
        let cardinality = selectivity.as_ref().map_or(0.0, |s| s.cardinality);
        Self {
            node: PlanNode::Leaf {
                pattern: pattern.clone(),
            },
            triple_patterns: vec![pattern],
            variables,
            order: None,
            selectivity,
            cardinality,
            cost: 0.0,
            number_joins: 0,
            number_merge_joins: 0,
            number_cartesian_products: 0,
        }
    }

    /// Structural part of an inner node; ordering and cost are filled in by the estimator
    pub(crate) fn new_inner(left: Plan, right: Plan, selectivity: Option<Selectivity>) -> Self {
        debug_assert!(
            left.triple_patterns
                .iter()
                .all(|pattern| !right.triple_patterns.contains(pattern)),
            "children of a join must cover disjoint triple patterns"
        );

        let join_partner: BTreeSet<String> = left
            .variables
            .intersection(&right.variables)
            .cloned()
            .collect();
        let variables = left.variables.union(&right.variables).cloned().collect();
        let triple_patterns = left
            .triple_patterns
            .iter()
            .chain(right.triple_patterns.iter())
            .cloned()
            .collect();
        let cardinality = selectivity.as_ref().map_or(0.0, |s| s.cardinality);
        let number_joins = left.number_joins + right.number_joins + 1;
        let number_cartesian_products = left.number_cartesian_products
            + right.number_cartesian_products
            + usize::from(join_partner.is_empty());
        let number_merge_joins = left.number_merge_joins + right.number_merge_joins;

        Self {
            node: PlanNode::Inner {
                left: Box::new(left),
                right: Box::new(right),
                join_partner,
            },
            triple_patterns,
            variables,
            order: None,
            selectivity,
            cardinality,
            cost: 0.0,
            number_joins,
            number_merge_joins,
            number_cartesian_products,
        }
    }

    /// Builds the join of two plans, see [`CostEstimator::join`]
    pub fn join(left: Plan, right: Plan, estimator: &CostEstimator<'_>) -> Plan {
        estimator.join(left, right)
    }

    pub fn node(&self) -> &PlanNode {
        &self.node
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node, PlanNode::Leaf { .. })
    }

    pub fn left(&self) -> Option<&Plan> {
        match &self.node {
            PlanNode::Inner { left, .. } => Some(left),
            PlanNode::Leaf { .. } => None,
        }
    }

    pub fn right(&self) -> Option<&Plan> {
        match &self.node {
            PlanNode::Inner { right, .. } => Some(right),
            PlanNode::Leaf { .. } => None,
        }
    }

    /// Shared variables of the two children; `None` for a leaf
    pub fn join_partner(&self) -> Option<&BTreeSet<String>> {
        match &self.node {
            PlanNode::Inner { join_partner, .. } => Some(join_partner),
            PlanNode::Leaf { .. } => None,
        }
    }

    pub fn is_cartesian_product(&self) -> bool {
        self.join_partner().map_or(false, |partner| partner.is_empty())
    }

    /// True for an inner node whose operands can be produced in a common order
    pub fn is_merge_join(&self) -> bool {
        !self.is_leaf() && self.order.is_some()
    }

    pub fn triple_patterns(&self) -> &[TriplePattern] {
        &self.triple_patterns
    }

    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    pub fn order(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    pub fn selectivity(&self) -> Option<&Selectivity> {
        self.selectivity.as_ref()
    }

    pub fn cardinality(&self) -> f64 {
        self.cardinality
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn number_joins(&self) -> usize {
        self.number_joins
    }

    pub fn number_merge_joins(&self) -> usize {
        self.number_merge_joins
    }

    pub fn number_cartesian_products(&self) -> usize {
        self.number_cartesian_products
    }

    /// Total order used to keep the better of two plans over the same patterns
    ///
    /// `Less` means `self` is better: fewer cartesian products, then more merge
    /// joins, then fewer joins, then lower cost, then the rendering.
    pub fn compare(&self, other: &Plan) -> Ordering {
        self.number_cartesian_products
            .cmp(&other.number_cartesian_products)
            .then_with(|| other.number_merge_joins.cmp(&self.number_merge_joins))
            .then_with(|| self.number_joins.cmp(&other.number_joins))
            .then_with(|| self.cost.total_cmp(&other.cost))
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }

    /// Indented tree with the estimates of every node
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let order = self
            .order
            .as_ref()
            .map(|order| format!(" order=[{}]", order.join(",")))
            .unwrap_or_default();
        match &self.node {
            PlanNode::Leaf { pattern } => {
                out.push_str(&format!(
                    "{}Scan {} card={:.1} cost={:.1}{}\n",
                    indent,
                    render_pattern(pattern),
                    self.cardinality,
                    self.cost,
                    order
                ));
            }
            PlanNode::Inner {
                left,
                right,
                join_partner,
            } => {
                let kind = if join_partner.is_empty() {
                    "CartesianProduct"
                } else if self.order.is_some() {
                    "MergeJoin"
                } else {
                    "Join"
                };
                let partner: Vec<&str> = join_partner.iter().map(String::as_str).collect();
                out.push_str(&format!(
                    "{}{} on [{}] card={:.1} cost={:.1}{}\n",
                    indent,
                    kind,
                    partner.join(","),
                    self.cardinality,
                    self.cost,
                    order
                ));
                left.explain_into(out, depth + 1);
                right.explain_into(out, depth + 1);
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            PlanNode::Leaf { pattern } => write!(f, "{}", render_pattern(pattern)),
            PlanNode::Inner {
                left,
                right,
                join_partner,
            } => {
                let partner: Vec<&str> = join_partner.iter().map(String::as_str).collect();
                write!(f, "Join[{}]({}, {})", partner.join(","), left, right)
            }
        }
    }
}
