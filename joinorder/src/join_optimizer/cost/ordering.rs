/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Merge-join ordering search
//!
//! A merge join needs both operands sorted by the join variables. A leaf can
//! be scanned in any collation of its variables; an inner node can only
//! deliver an ordering if it is itself a merge join whose output order starts
//! with its join variables, followed by the private variables of one side and
//! then those of the other side.

use super::super::plan::{Plan, PlanNode};
use log::trace;
use std::collections::BTreeSet;

/// Finds the first permutation of the join partner both children can be sorted by
///
/// Returns the ordering and the number of merge joins in the subtree rooted
/// at `plan` when that ordering is used, or `None` if no permutation works.
/// Permutations are tried in lexicographic order and the first feasible one
/// wins; merge-join counts of different feasible permutations are not compared.
pub fn find_best_merge_join_ordering(plan: &Plan) -> Option<(Vec<String>, usize)> {
    match &plan.node {
        PlanNode::Leaf { .. } => None,
        PlanNode::Inner {
            left,
            right,
            join_partner,
        } => merge_join_ordering(left, right, join_partner),
    }
}

/// Ordering search for a join of `left` and `right` that is not built yet
pub(crate) fn merge_join_ordering(
    left: &Plan,
    right: &Plan,
    join_partner: &BTreeSet<String>,
) -> Option<(Vec<String>, usize)> {
    if join_partner.is_empty() {
        return None;
    }

    let candidates: Vec<String> = join_partner.iter().cloned().collect();
    let mut used = vec![false; candidates.len()];
    let mut prefix = Vec::with_capacity(candidates.len());
    search(left, right, join_partner, &candidates, &mut used, &mut prefix)
}

/// Depth-first walk over the permutations of `candidates` in lexicographic order
///
/// A prefix that one operand cannot start its ordering with rules out every
/// permutation extending it, so the whole subtree is skipped.
fn search(
    left: &Plan,
    right: &Plan,
    join_partner: &BTreeSet<String>,
    candidates: &[String],
    used: &mut [bool],
    prefix: &mut Vec<String>,
) -> Option<(Vec<String>, usize)> {
    if prefix.len() == candidates.len() {
        let left_merges = match feasible(left, prefix) {
            Some(count) => count,
            None => {
                trace!("ordering {:?} infeasible for left operand", prefix);
                return None;
            }
        };
        let right_merges = match feasible(right, prefix) {
            Some(count) => count,
            None => {
                trace!("ordering {:?} infeasible for right operand", prefix);
                return None;
            }
        };
        return Some((prefix.clone(), 1 + left_merges + right_merges));
    }

    for index in 0..candidates.len() {
        if used[index] {
            continue;
        }
        prefix.push(candidates[index].clone());
        if admits_prefix(left, prefix, join_partner) && admits_prefix(right, prefix, join_partner) {
            used[index] = true;
            let found = search(left, right, join_partner, candidates, used, prefix);
            used[index] = false;
            if found.is_some() {
                return found;
            }
        } else {
            trace!("prefix {:?} rejected", prefix);
        }
        prefix.pop();
    }
    None
}

/// Whether `plan` could deliver some ordering that starts with `prefix`
///
/// `universe` holds every variable the final ordering can contain. Never
/// rejects a prefix of an ordering [`feasible`] accepts. Once the prefix
/// holds all of the plan's variables from `universe` the ordering is final
/// and the exact check applies.
fn admits_prefix(plan: &Plan, prefix: &[String], universe: &BTreeSet<String>) -> bool {
    let prefix = restrict(plan, prefix);
    let complete = universe
        .iter()
        .filter(|variable| plan.variables.contains(*variable))
        .count();
    if prefix.len() == complete {
        return feasible(plan, &prefix).is_some();
    }

    match &plan.node {
        PlanNode::Leaf { .. } => true,
        PlanNode::Inner {
            left,
            right,
            join_partner,
        } => {
            if join_partner.is_empty() {
                return false;
            }
            // children always receive the full join partner ahead of their tail
            let below: BTreeSet<String> = join_partner.union(universe).cloned().collect();
            if prefix.len() <= join_partner.len() {
                return prefix.iter().all(|variable| join_partner.contains(variable))
                    && admits_prefix(left, &prefix, &below)
                    && admits_prefix(right, &prefix, &below);
            }
            match split_ordering(&prefix, join_partner, left, right) {
                Some((left_prefix, right_prefix)) => {
                    admits_prefix(left, &left_prefix, &below)
                        && admits_prefix(right, &right_prefix, &below)
                }
                None => false,
            }
        }
    }
}

/// Number of merge joins below `plan` if it can deliver `ordering`
fn feasible(plan: &Plan, ordering: &[String]) -> Option<usize> {
    let ordering = restrict(plan, ordering);
    match &plan.node {
        PlanNode::Leaf { .. } => Some(0),
        PlanNode::Inner {
            left,
            right,
            join_partner,
        } => {
            let (left_ordering, right_ordering) =
                split_ordering(&ordering, join_partner, left, right)?;
            let left_merges = feasible(left, &left_ordering)?;
            let right_merges = feasible(right, &right_ordering)?;
            Some(1 + left_merges + right_merges)
        }
    }
}

/// Fixes the ordering every node below `plan` produces so that `plan` delivers `ordering`
///
/// Must only be called after [`feasible`] accepted the ordering.
pub(crate) fn apply_ordering(plan: &mut Plan, ordering: &[String]) {
    let ordering = restrict(plan, ordering);
    match &mut plan.node {
        PlanNode::Leaf { .. } => {
            plan.order = Some(ordering);
        }
        PlanNode::Inner {
            left,
            right,
            join_partner,
        } => {
            if let Some((left_ordering, right_ordering)) =
                split_ordering(&ordering, join_partner, left, right)
            {
                apply_ordering(left, &left_ordering);
                apply_ordering(right, &right_ordering);
                let head_len = join_partner.len();
                let mut own = left_ordering[..head_len].to_vec();
                own.extend(ordering.iter().skip(head_len).cloned());
                plan.order = Some(own);
                plan.number_merge_joins = 1 + left.number_merge_joins + right.number_merge_joins;
            }
        }
    }
}

/// Keeps the variables of `ordering` that `plan` produces
fn restrict(plan: &Plan, ordering: &[String]) -> Vec<String> {
    ordering
        .iter()
        .filter(|variable| plan.variables.contains(*variable))
        .cloned()
        .collect()
}

/// Derives the orderings the children of a merge join must deliver
///
/// The requested ordering must start with join variables only. Once the join
/// variables are exhausted, the remainder must be the private variables of
/// one side followed by the private variables of the other side.
fn split_ordering(
    ordering: &[String],
    join_partner: &BTreeSet<String>,
    left: &Plan,
    right: &Plan,
) -> Option<(Vec<String>, Vec<String>)> {
    if join_partner.is_empty() {
        return None;
    }

    let head_len = ordering.len().min(join_partner.len());
    if !ordering[..head_len]
        .iter()
        .all(|variable| join_partner.contains(variable))
    {
        return None;
    }

    let mut head: Vec<String> = ordering[..head_len].to_vec();
    for variable in join_partner {
        if !head.contains(variable) {
            head.push(variable.clone());
        }
    }

    let tail = &ordering[head_len..];
    let mut switches = 0;
    let mut previous_side: Option<bool> = None;
    for variable in tail {
        let on_left = left.variables.contains(variable);
        if let Some(previous) = previous_side {
            if previous != on_left {
                switches += 1;
            }
        }
        previous_side = Some(on_left);
    }
    if switches > 1 {
        return None;
    }

    let mut left_ordering = head.clone();
    let mut right_ordering = head;
    for variable in tail {
        if left.variables.contains(variable) {
            left_ordering.push(variable.clone());
        } else if right.variables.contains(variable) {
            right_ordering.push(variable.clone());
        }
    }
    Some((left_ordering, right_ordering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join_optimizer::cost::{CostConstants, CostEstimator};
    use crate::join_optimizer::stats::{Bucket, Selectivity, Statistics, VariableBounds};
    use crate::join_optimizer::StatisticsError;
    use shared::terms::{pattern_variables, Term, TriplePattern};

    struct FlatStats;

    impl Statistics for FlatStats {
        fn min_max(&self, _: &str, _: &TriplePattern) -> Result<(u32, u32), StatisticsError> {
            Ok((0, 99))
        }

        fn histogram(
            &self,
            pattern: &TriplePattern,
            _: &[String],
            _: &VariableBounds,
            _: &VariableBounds,
        ) -> Result<Selectivity, StatisticsError> {
            let mut selectivity = Selectivity::new(100.0);
            for variable in pattern_variables(pattern) {
                selectivity = selectivity.with_bucket(&variable, Bucket::new(0, 99, 100.0, 50.0));
            }
            Ok(selectivity)
        }
    }

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    fn leaf(estimator: &CostEstimator<'_>, pattern: TriplePattern) -> Plan {
        let selectivity = FlatStats
            .histogram(&pattern, &[], &VariableBounds::new(), &VariableBounds::new())
            .ok();
        estimator.leaf(pattern, selectivity)
    }

    fn grid(estimator: &CostEstimator<'_>) -> Vec<Plan> {
        [
            ("?a", "?b", "?c"),
            ("?d", "?e", "?f"),
            ("?g", "?h", "?i"),
            ("?a", "?d", "?g"),
            ("?b", "?e", "?h"),
            ("?c", "?f", "?i"),
            ("?a", "?e", "?i"),
        ]
        .iter()
        .map(|(s, p, o)| leaf(estimator, (var(s), var(p), var(o))))
        .collect()
    }

    fn left_deep(estimator: &CostEstimator<'_>, plans: Vec<Plan>) -> Option<Plan> {
        plans
            .into_iter()
            .reduce(|left, right| Plan::join(left, right, estimator))
    }

    fn all_orderings(items: &[String]) -> Vec<Vec<String>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut result = Vec::new();
        for (index, first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(index);
            for mut ordering in all_orderings(&rest) {
                ordering.insert(0, first.clone());
                result.push(ordering);
            }
        }
        result
    }

    /// First feasible ordering found by checking every permutation in full
    fn exhaustive(left: &Plan, right: &Plan, partner: &BTreeSet<String>) -> Option<(Vec<String>, usize)> {
        let candidates: Vec<String> = partner.iter().cloned().collect();
        all_orderings(&candidates).into_iter().find_map(|ordering| {
            let left_merges = feasible(left, &ordering)?;
            let right_merges = feasible(right, &ordering)?;
            Some((ordering, 1 + left_merges + right_merges))
        })
    }

    #[test]
    fn test_first_ordering_is_sorted_join_partner() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let left = leaf(&estimator, (var("?z"), var("?x"), var("?y")));
        let right = leaf(&estimator, (var("?y"), var("?z"), var("?x")));
        let partner: BTreeSet<String> = ["?x", "?y", "?z"].iter().map(|v| v.to_string()).collect();

        let (ordering, merges) = merge_join_ordering(&left, &right, &partner).unwrap();
        assert_eq!(ordering, vec!["?x".to_string(), "?y".to_string(), "?z".to_string()]);
        assert_eq!(merges, 1);
    }

    #[test]
    fn test_pruned_search_matches_exhaustive_search() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let n = grid(&estimator).len();
        let mut compared = 0;

        for mask in 1u32..(1 << n) - 1 {
            let (left, right): (Vec<(usize, Plan)>, Vec<(usize, Plan)>) = grid(&estimator)
                .into_iter()
                .enumerate()
                .partition(|(i, _)| mask & (1 << *i) != 0);
            let left = left_deep(&estimator, left.into_iter().map(|(_, plan)| plan).collect()).unwrap();
            let right = left_deep(&estimator, right.into_iter().map(|(_, plan)| plan).collect()).unwrap();
            let partner: BTreeSet<String> = left.variables.intersection(&right.variables).cloned().collect();
            if partner.is_empty() || partner.len() > 5 {
                continue;
            }

            assert_eq!(
                merge_join_ordering(&left, &right, &partner),
                exhaustive(&left, &right, &partner),
                "mask {:#b}",
                mask
            );
            compared += 1;
        }
        assert!(compared > 0);
    }

    #[test]
    fn test_wide_join_partner_matches_exhaustive_search() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let plans = grid(&estimator);
        let pick = |indices: &[usize]| -> Vec<Plan> { indices.iter().map(|i| plans[*i].clone()).collect() };
        // merge chains on ?a, ?d, ?g and on ?e, ?i
        let left = left_deep(&estimator, pick(&[0, 3, 1, 2])).unwrap();
        let right = left_deep(&estimator, pick(&[6, 4, 5])).unwrap();
        let partner: BTreeSet<String> = left.variables.intersection(&right.variables).cloned().collect();
        assert_eq!(partner.len(), 7);

        let start = std::time::Instant::now();
        let found = merge_join_ordering(&left, &right, &partner);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(1),
            "ordering search took {:?}",
            start.elapsed()
        );
        assert_eq!(found, exhaustive(&left, &right, &partner));
    }

    #[test]
    fn test_single_join_variable_is_merge_join() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let plan = Plan::join(
            leaf(&estimator, (var("?a"), Term::Constant(1), var("?x"))),
            leaf(&estimator, (var("?x"), Term::Constant(2), var("?b"))),
            &estimator,
        );

        let (ordering, merges) = find_best_merge_join_ordering(&plan).unwrap();
        assert_eq!(ordering, vec!["?x".to_string()]);
        assert_eq!(merges, 1);
        assert!(plan.number_merge_joins() >= 1);
        assert_eq!(plan.left().unwrap().order(), Some(&["?x".to_string()][..]));
    }

    #[test]
    fn test_cartesian_product_has_no_ordering() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let plan = Plan::join(
            leaf(&estimator, (var("?a"), Term::Constant(1), var("?b"))),
            leaf(&estimator, (var("?c"), Term::Constant(2), var("?d"))),
            &estimator,
        );
        assert!(find_best_merge_join_ordering(&plan).is_none());
        assert_eq!(plan.number_merge_joins(), 0);
    }

    #[test]
    fn test_chain_on_same_variable_is_all_merge_joins() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let inner = Plan::join(
            leaf(&estimator, (var("?x"), Term::Constant(1), var("?a"))),
            leaf(&estimator, (var("?x"), Term::Constant(2), var("?b"))),
            &estimator,
        );
        let plan = Plan::join(
            inner,
            leaf(&estimator, (var("?x"), Term::Constant(3), var("?c"))),
            &estimator,
        );
        assert_eq!(plan.number_merge_joins(), 2);
        assert!(plan.is_merge_join());
    }

    #[test]
    fn test_child_join_on_other_variable_blocks_merge_join() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        // the inner join is on ?y, so it cannot deliver rows sorted by ?x alone
        let inner = Plan::join(
            leaf(&estimator, (var("?x"), Term::Constant(1), var("?y"))),
            leaf(&estimator, (var("?y"), Term::Constant(2), var("?z"))),
            &estimator,
        );
        assert!(inner.is_merge_join());

        let plan = Plan::join(
            inner,
            leaf(&estimator, (var("?x"), Term::Constant(3), var("?w"))),
            &estimator,
        );
        assert!(find_best_merge_join_ordering(&plan).is_none());
        assert!(!plan.is_merge_join());
        assert_eq!(plan.number_merge_joins(), 1);
    }

    #[test]
    fn test_tail_may_not_interleave_sides() {
        let stats = FlatStats;
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        let left = leaf(&estimator, (var("?x"), var("?a"), var("?c")));
        let right = leaf(&estimator, (var("?x"), Term::Constant(2), var("?b")));
        let partner: BTreeSet<String> = ["?x".to_string()].into_iter().collect();

        let ok = vec!["?x".to_string(), "?a".to_string(), "?c".to_string(), "?b".to_string()];
        let (left_ordering, right_ordering) =
            split_ordering(&ok, &partner, &left, &right).unwrap();
        assert_eq!(left_ordering, vec!["?x".to_string(), "?a".to_string(), "?c".to_string()]);
        assert_eq!(right_ordering, vec!["?x".to_string(), "?b".to_string()]);

        let interleaved = vec!["?x".to_string(), "?a".to_string(), "?b".to_string(), "?c".to_string()];
        assert!(split_ordering(&interleaved, &partner, &left, &right).is_none());

        let starts_private = vec!["?a".to_string(), "?x".to_string()];
        assert!(split_ordering(&starts_private, &partner, &left, &right).is_none());
    }
}
