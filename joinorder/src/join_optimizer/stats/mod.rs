/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Statistics capability consumed by the cost model
//!
//! The optimizer only ever talks to [`Statistics`]; histogram estimation and
//! bound computation live behind it. [`TripleStatistics`] is an exact,
//! in-memory implementation over a set of triples.

pub mod triple_stats;

pub use triple_stats::{IndexRange, TripleStatistics};

use super::error::StatisticsError;
use serde::Serialize;
use shared::terms::TriplePattern;
use std::collections::BTreeMap;

/// Global lower or upper bound per join variable
pub type VariableBounds = BTreeMap<String, u32>;

/// Histogram summary of one variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub min: u32,
    pub max: u32,
    /// Sum of occurrences of all values
    pub occurrences: f64,
    /// Sum of distinct values
    pub distinct: f64,
}

impl Bucket {
    pub fn new(min: u32, max: u32, occurrences: f64, distinct: f64) -> Self {
        Self {
            min,
            max,
            occurrences,
            distinct,
        }
    }

    /// Average number of occurrences per distinct value, undefined without distinct values
    pub fn occurrence_ratio(&self) -> Option<f64> {
        if self.distinct > 0.0 {
            Some(self.occurrences / self.distinct)
        } else {
            None
        }
    }

    fn overlaps(&self, other: &Bucket) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// Estimated result size of a (sub-)plan with per-variable histograms
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Selectivity {
    pub cardinality: f64,
    pub buckets: BTreeMap<String, Bucket>,
}

impl Selectivity {
    pub fn new(cardinality: f64) -> Self {
        Self {
            cardinality,
            buckets: BTreeMap::new(),
        }
    }

    pub fn with_bucket(mut self, variable: &str, bucket: Bucket) -> Self {
        self.buckets.insert(variable.to_string(), bucket);
        self
    }
}

/// Source of cardinality estimates
///
/// Failures never abort an optimization; the caller degrades to "no estimate".
pub trait Statistics: Send + Sync {
    /// Smallest and largest value `variable` takes in the matches of `pattern`
    fn min_max(&self, variable: &str, pattern: &TriplePattern)
        -> Result<(u32, u32), StatisticsError>;

    /// Histogram of `pattern` restricted to `variables` and to the global bounds
    fn histogram(
        &self,
        pattern: &TriplePattern,
        variables: &[String],
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Result<Selectivity, StatisticsError>;

    /// Combines the estimates of two join operands
    fn join_selectivity(
        &self,
        left: &Selectivity,
        right: &Selectivity,
    ) -> Result<Selectivity, StatisticsError> {
        Ok(estimate_join(left, right))
    }
}

/// Textbook join estimate: `|L|·|R| / max(d_L, d_R)` for every shared variable,
/// the plain product when nothing is shared
pub fn estimate_join(left: &Selectivity, right: &Selectivity) -> Selectivity {
    let product = left.cardinality * right.cardinality;
    let mut cardinality = product;

    for (variable, left_bucket) in &left.buckets {
        if let Some(right_bucket) = right.buckets.get(variable) {
            if !left_bucket.overlaps(right_bucket) {
                cardinality = 0.0;
                continue;
            }
            let distinct = left_bucket.distinct.max(right_bucket.distinct);
            if distinct > 0.0 {
                cardinality = cardinality.min(product / distinct);
            }
        }
    }

    let mut buckets = BTreeMap::new();
    for (variable, left_bucket) in &left.buckets {
        let bucket = match right.buckets.get(variable) {
            Some(right_bucket) => {
                let min = left_bucket.min.max(right_bucket.min);
                Bucket::new(
                    min,
                    left_bucket.max.min(right_bucket.max).max(min),
                    cardinality,
                    left_bucket.distinct.min(right_bucket.distinct).min(cardinality),
                )
            }
            None => Bucket::new(
                left_bucket.min,
                left_bucket.max,
                cardinality,
                left_bucket.distinct.min(cardinality),
            ),
        };
        buckets.insert(variable.clone(), bucket);
    }
    for (variable, right_bucket) in &right.buckets {
        buckets.entry(variable.clone()).or_insert_with(|| {
            Bucket::new(
                right_bucket.min,
                right_bucket.max,
                cardinality,
                right_bucket.distinct.min(cardinality),
            )
        });
    }

    Selectivity {
        cardinality,
        buckets,
    }
}
