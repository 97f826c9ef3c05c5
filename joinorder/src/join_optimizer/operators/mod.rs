/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod physical;

pub use physical::{PhysicalOperator, PhysicalPlanBuilder};

use super::plan::Plan;
use super::stats::VariableBounds;
use shared::terms::TriplePattern;
use std::fmt::Debug;

/// Opens an index range for one triple pattern
///
/// The minima and maxima are the global bounds of the join variables; an
/// implementation restricts the scanned range to them.
pub trait IndexScan: Send + Sync {
    type Handle: Clone + Debug + Send;

    fn scan(
        &self,
        pattern: &TriplePattern,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Self::Handle;
}

/// Turns an optimized plan into an executable operator graph
pub trait OperatorGraphBuilder<S: IndexScan> {
    type Graph;

    fn build(
        &self,
        plan: &Plan,
        index_scan: &S,
        minima: &VariableBounds,
        maxima: &VariableBounds,
    ) -> Self::Graph;
}
