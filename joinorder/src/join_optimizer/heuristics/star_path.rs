/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{adjacency, balanced_chunk_sizes, partition, SplitHeuristic};
use crate::join_optimizer::plan::Plan;
use std::collections::VecDeque;

/// Cuts a traversal of the join graph into pieces of bounded size
///
/// The traversal is breadth-first and starts at the most selective pattern,
/// so stars stay together and paths are cut into consecutive segments. The
/// last resort for groups nothing else could split: any input larger than
/// `max_group_size` is split.
#[derive(Debug, Clone, Copy)]
pub struct StarPathSplit {
    max_group_size: usize,
}

impl StarPathSplit {
    pub fn new(max_group_size: usize) -> Self {
        StarPathSplit {
            max_group_size: max_group_size.max(1),
        }
    }

    fn traversal(leaves: &[Plan]) -> Vec<usize> {
        let neighbours = adjacency(leaves, None);
        let mut by_cardinality: Vec<usize> = (0..leaves.len()).collect();
        by_cardinality.sort_by(|&a, &b| {
            leaves[a]
                .cardinality()
                .total_cmp(&leaves[b].cardinality())
                .then(a.cmp(&b))
        });

        let mut visited = vec![false; leaves.len()];
        let mut order = Vec::with_capacity(leaves.len());
        for start in by_cardinality {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                order.push(current);
                for &next in &neighbours[current] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }
}

impl SplitHeuristic for StarPathSplit {
    fn name(&self) -> &'static str {
        "star-path"
    }

    fn split(&self, leaves: Vec<Plan>) -> Vec<Vec<Plan>> {
        let total = leaves.len();
        if total <= self.max_group_size {
            return vec![leaves];
        }

        let order = Self::traversal(&leaves);
        let mut groups = Vec::new();
        let mut start = 0;
        for size in balanced_chunk_sizes(total, self.max_group_size) {
            groups.push(order[start..start + size].to_vec());
            start += size;
        }
        partition(leaves, &groups)
    }
}
