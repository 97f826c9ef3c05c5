/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::super::error::StatisticsError;
use super::super::operators::IndexScan;
use super::{Bucket, Selectivity, Statistics, VariableBounds};
use rayon::prelude::*;
use serde::Serialize;
use shared::terms::{render_pattern, TriplePattern};
use shared::triple::Triple;
use std::collections::{BTreeSet, HashSet};

/// Exact statistics over an in-memory set of triples
#[derive(Debug, Clone, Default)]
pub struct TripleStatistics {
    triples: Vec<Triple>,
}

/// Index range handed to the operator graph for one leaf
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRange {
    pub pattern: TriplePattern,
    pub lower: VariableBounds,
    pub upper: VariableBounds,
}

impl TripleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds statistics over a deduplicated, sorted copy of `triples`
    pub fn from_triples<I: IntoIterator<Item = Triple>>(triples: I) -> Self {
        let unique: BTreeSet<Triple> = triples.into_iter().collect();
        Self {
            triples: unique.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, triple: Triple) {
        if let Err(position) = self.triples.binary_search(&triple) {
            self.triples.insert(position, triple);
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Slot positions holding `variable` in `pattern`
    fn positions(pattern: &TriplePattern, variable: &str) -> Vec<usize> {
        [&pattern.0, &pattern.1, &pattern.2]
            .iter()
            .enumerate()
            .filter(|(_, term)| term.as_variable() == Some(variable))
            .map(|(position, _)| position)
            .collect()
    }

    fn matching(&self, pattern: &TriplePattern) -> Vec<&Triple> {
        self.triples
            .par_iter()
            .filter(|triple| triple.matches(pattern))
            .collect()
    }

    /// Checks every bounded variable of `pattern` against the global bounds
    fn within_bounds(
        triple: &Triple,
        bounded: &[(usize, Option<u32>, Option<u32>)],
    ) -> bool {
        bounded.iter().all(|(position, min, max)| {
            let value = triple.slot(*position);
            min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
        })
    }
}

impl Statistics for TripleStatistics {
    fn min_max(
        &self,
        variable: &str,
        pattern: &TriplePattern,
    ) -> Result<(u32, u32), StatisticsError> {
        let position = *Self::positions(pattern, variable)
            .first()
            .ok_or_else(|| StatisticsError::UnknownVariable(variable.to_string()))?;

        let (min, max) = self
            .matching(pattern)
            .par_iter()
            .map(|triple| {
                let value = triple.slot(position);
                (value, value)
            })
            .reduce_with(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
            .ok_or_else(|| StatisticsError::NoMatchingTriples(render_pattern(pattern)))?;

        Ok((min, max))
    }

    fn histogram(
        &self,
        pattern: &TriplePattern,
        variables: &[String],
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Result<Selectivity, StatisticsError> {
        let mut requested = Vec::with_capacity(variables.len());
        for variable in variables {
            let position = *Self::positions(pattern, variable)
                .first()
                .ok_or_else(|| StatisticsError::UnknownVariable(variable.clone()))?;
            requested.push((variable, position));
        }

        let bounded: Vec<(usize, Option<u32>, Option<u32>)> = shared::terms::pattern_variables(pattern)
            .into_iter()
            .filter_map(|variable| {
                let min = minima.get(&variable).copied();
                let max = maxima.get(&variable).copied();
                if min.is_none() && max.is_none() {
                    return None;
                }
                Self::positions(pattern, &variable)
                    .first()
                    .map(|position| (*position, min, max))
            })
            .collect();

        let matches: Vec<&Triple> = self
            .matching(pattern)
            .into_par_iter()
            .filter(|triple| Self::within_bounds(triple, &bounded))
            .collect();

        let cardinality = matches.len() as f64;
        let mut selectivity = Selectivity::new(cardinality);
        for (variable, position) in requested {
            let values: HashSet<u32> = matches.iter().map(|triple| triple.slot(position)).collect();
            let bucket = Bucket::new(
                values.iter().copied().min().unwrap_or(0),
                values.iter().copied().max().unwrap_or(0),
                cardinality,
                values.len() as f64,
            );
            selectivity = selectivity.with_bucket(variable, bucket);
        }
        Ok(selectivity)
    }
}

impl IndexScan for TripleStatistics {
    type Handle = IndexRange;

    fn scan(
        &self,
        pattern: &TriplePattern,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> IndexRange {
        let variables = shared::terms::pattern_variables(pattern);
        let restrict = |bounds: &VariableBounds| -> VariableBounds {
            bounds
                .iter()
                .filter(|(variable, _)| variables.contains(variable))
                .map(|(variable, value)| (variable.clone(), *value))
                .collect()
        };
        IndexRange {
            pattern: pattern.clone(),
            lower: restrict(minima),
            upper: restrict(maxima),
        }
    }
}
