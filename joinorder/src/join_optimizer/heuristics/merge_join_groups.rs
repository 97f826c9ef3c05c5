/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{partition, variable_occurrences, SplitHeuristic};
use crate::join_optimizer::plan::Plan;

/// Separates the largest set of patterns sharing one variable
///
/// All patterns of such a set can be combined with merge joins on that
/// variable, so they form one group and everything else forms the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMergeJoinGroupSplit;

impl SplitHeuristic for MaxMergeJoinGroupSplit {
    fn name(&self) -> &'static str {
        "max-merge-join-group"
    }

    fn split(&self, leaves: Vec<Plan>) -> Vec<Vec<Plan>> {
        let total = leaves.len();
        let mut largest: Vec<usize> = Vec::new();
        for (_, indices) in variable_occurrences(&leaves) {
            if indices.len() > largest.len() {
                largest = indices;
            }
        }

        if largest.len() < 2 || largest.len() >= total {
            return vec![leaves];
        }
        let rest: Vec<usize> = (0..total).filter(|index| !largest.contains(index)).collect();
        partition(leaves, &[largest, rest])
    }
}
