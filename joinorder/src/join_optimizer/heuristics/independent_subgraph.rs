/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{connected_components, partition, variable_occurrences, SplitHeuristic};
use crate::join_optimizer::plan::Plan;

/// Splits the join graph at a single variable that holds it together
///
/// For every variable shared by several patterns, the graph is re-computed
/// without the edges that variable induces. If that leaves more than one
/// component, those subgraphs only interact through the variable and are
/// optimized independently. The variable giving the most balanced split wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndependentSubgraphSplit;

impl SplitHeuristic for IndependentSubgraphSplit {
    fn name(&self) -> &'static str {
        "independent-subgraph"
    }

    fn split(&self, leaves: Vec<Plan>) -> Vec<Vec<Plan>> {
        let mut best: Option<(usize, Vec<Vec<usize>>)> = None;

        for (variable, indices) in variable_occurrences(&leaves) {
            if indices.len() < 2 {
                continue;
            }
            let components = connected_components(&leaves, Some(variable));
            if components.len() < 2 {
                continue;
            }
            let largest = components.iter().map(Vec::len).max().unwrap_or(0);
            // strictly smaller keeps the first variable in name order on ties
            if best.as_ref().map_or(true, |(size, _)| largest < *size) {
                best = Some((largest, components));
            }
        }

        match best {
            Some((_, components)) => partition(leaves, &components),
            None => vec![leaves],
        }
    }
}
