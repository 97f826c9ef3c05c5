/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

/// Failures reported by a statistics capability
///
/// The optimizer never surfaces these; each one degrades the affected
/// estimate to "no estimate".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsError {
    #[error("variable {0} does not occur in the triple pattern")]
    UnknownVariable(String),
    #[error("no triples match pattern {0}")]
    NoMatchingTriples(String),
    #[error("statistics unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("cannot optimize an empty set of triple patterns")]
    EmptyQuery,
    #[error("invalid optimizer configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OptimizerError {
    fn from(err: serde_json::Error) -> Self {
        OptimizerError::Config(err.to_string())
    }
}
