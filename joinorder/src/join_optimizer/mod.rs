/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Cost-based join-order optimizer for basic graph patterns
//!
//! Given the triple patterns of a query, the optimizer produces one binary
//! join tree that fixes the join order, tells for every join whether a
//! sort-free merge join is possible and which ordering flows upward.
//!
//! ## Architecture
//!
//! - `plan`: the immutable plan tree with cached cost, cardinality and ordering
//! - `cost`: cardinality/cost estimation and the merge-join ordering search
//! - `heuristics`: split strategies that keep the exhaustive search small
//! - `enumerator`: bounded dynamic programming over subsets of leaf plans
//! - `optimizer`: the driver tying leaf construction, splitting and enumeration together
//! - `stats`: the statistics capability and an in-memory implementation
//! - `operators`: index-scan and operator-graph capabilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kolibrie_joinorder::join_optimizer::{JoinOrderOptimizer, TripleStatistics};
//!
//! let statistics = TripleStatistics::from_triples(triples);
//! let optimizer = JoinOrderOptimizer::new(&statistics);
//! let plan = optimizer.optimize(&patterns)?;
//! println!("{}", plan.explain());
//! ```

pub mod config;
pub mod cost;
pub mod enumerator;
pub mod error;
pub mod heuristics;
pub mod operators;
pub mod optimizer;
pub mod plan;
pub mod stats;
pub mod workers;

pub use config::OptimizerConfig;
pub use cost::{find_best_merge_join_ordering, CostEstimator};
pub use enumerator::Enumerator;
pub use error::{OptimizerError, StatisticsError};
pub use heuristics::{
    CartesianProductSplit, IndependentSubgraphSplit, MaxMergeJoinGroupSplit, SplitHeuristic,
    StarPathSplit,
};
pub use operators::{
    IndexScan, OperatorGraphBuilder, PhysicalOperator, PhysicalPlanBuilder,
};
pub use optimizer::JoinOrderOptimizer;
pub use plan::{Plan, PlanNode};
pub use stats::{Bucket, IndexRange, Selectivity, Statistics, TripleStatistics, VariableBounds};
