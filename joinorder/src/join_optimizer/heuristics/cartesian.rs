/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{connected_components, partition, SplitHeuristic};
use crate::join_optimizer::plan::Plan;

/// Puts every connected component of the join graph into its own group
///
/// Two patterns are connected if they share a variable, transitively. Joins
/// between the resulting groups are exactly the unavoidable cartesian products.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartesianProductSplit;

impl SplitHeuristic for CartesianProductSplit {
    fn name(&self) -> &'static str {
        "cartesian-product"
    }

    fn split(&self, leaves: Vec<Plan>) -> Vec<Vec<Plan>> {
        let components = connected_components(&leaves, None);
        if components.len() <= 1 {
            return vec![leaves];
        }
        partition(leaves, &components)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{leaf, predicates};
    use super::*;

    #[test]
    fn test_transitively_connected_patterns_stay_together() {
        // A-B share ?x, B-C share ?y, A and C only meet through B
        let leaves = vec![leaf("?a", 1, "?x"), leaf("?x", 2, "?y"), leaf("?y", 3, "?c")];
        let groups = CartesianProductSplit.split(leaves);
        assert_eq!(predicates(&groups), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_disjoint_patterns_are_separated() {
        let leaves = vec![leaf("?a", 1, "?b"), leaf("?c", 2, "?d")];
        let groups = CartesianProductSplit.split(leaves);
        assert_eq!(predicates(&groups), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_components_keep_input_order() {
        let leaves = vec![
            leaf("?a", 1, "?x"),
            leaf("?c", 2, "?d"),
            leaf("?x", 3, "?b"),
            leaf("?d", 4, "?e"),
        ];
        let groups = CartesianProductSplit.split(leaves);
        assert_eq!(predicates(&groups), vec![vec![1, 3], vec![2, 4]]);
    }
}
