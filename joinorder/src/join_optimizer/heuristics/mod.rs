/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Split heuristics
//!
//! A heuristic partitions leaf plans into disjoint groups whose union is the
//! input. Returning a single group means "no split".

pub mod cartesian;
pub mod independent_subgraph;
pub mod merge_join_groups;
pub mod star_path;

pub use cartesian::CartesianProductSplit;
pub use independent_subgraph::IndependentSubgraphSplit;
pub use merge_join_groups::MaxMergeJoinGroupSplit;
pub use star_path::StarPathSplit;

use super::plan::Plan;
use std::collections::{BTreeMap, VecDeque};

pub trait SplitHeuristic: Send + Sync {
    fn name(&self) -> &'static str;

    fn split(&self, leaves: Vec<Plan>) -> Vec<Vec<Plan>>;
}

/// Heuristics applied to every group whose size exceeds `threshold`, in order
pub fn size_heuristics(threshold: usize) -> Vec<Box<dyn SplitHeuristic>> {
    vec![
        Box::new(IndependentSubgraphSplit),
        Box::new(MaxMergeJoinGroupSplit),
        Box::new(StarPathSplit::new(threshold)),
    ]
}

/// Moves the leaves into the groups given by index lists
///
/// Every index must appear in exactly one group.
pub(crate) fn partition(leaves: Vec<Plan>, groups: &[Vec<usize>]) -> Vec<Vec<Plan>> {
    let mut slots: Vec<Option<Plan>> = leaves.into_iter().map(Some).collect();
    groups
        .iter()
        .map(|group| group.iter().filter_map(|&index| slots[index].take()).collect())
        .filter(|group: &Vec<Plan>| !group.is_empty())
        .collect()
}

/// Sizes of the fewest pieces of at most `max` items covering `total`, as even as possible
pub(crate) fn balanced_chunk_sizes(total: usize, max: usize) -> Vec<usize> {
    let max = max.max(1);
    if total == 0 {
        return Vec::new();
    }
    let pieces = (total + max - 1) / max;
    let base = total / pieces;
    let extra = total % pieces;
    (0..pieces).map(|piece| base + usize::from(piece < extra)).collect()
}

/// Indices of the leaves containing each variable
pub(crate) fn variable_occurrences(leaves: &[Plan]) -> BTreeMap<&str, Vec<usize>> {
    let mut occurrences: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, leaf) in leaves.iter().enumerate() {
        for variable in leaf.variables() {
            occurrences.entry(variable.as_str()).or_default().push(index);
        }
    }
    occurrences
}

/// Adjacency lists of the "shares a variable" graph, ignoring `skip`
pub(crate) fn adjacency(leaves: &[Plan], skip: Option<&str>) -> Vec<Vec<usize>> {
    let mut neighbours = vec![Vec::new(); leaves.len()];
    for (variable, indices) in variable_occurrences(leaves) {
        if skip == Some(variable) {
            continue;
        }
        for &a in &indices {
            for &b in &indices {
                if a != b && !neighbours[a].contains(&b) {
                    neighbours[a].push(b);
                }
            }
        }
    }
    for list in &mut neighbours {
        list.sort_unstable();
    }
    neighbours
}

/// Connected components of the leaf graph, each sorted, ordered by smallest member
pub(crate) fn connected_components(leaves: &[Plan], skip: Option<&str>) -> Vec<Vec<usize>> {
    let neighbours = adjacency(leaves, skip);
    let mut visited = vec![false; leaves.len()];
    let mut components = Vec::new();

    for start in 0..leaves.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in &neighbours[current] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}
