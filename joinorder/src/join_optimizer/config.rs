/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::error::OptimizerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the join-order optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Groups with more leaves than this are split before enumeration
    pub split_threshold: usize,
    /// Max number of threads building leaf plans at the same time
    pub leaf_workers: usize,
    /// Max number of extra threads exploring DP branches (0 = sequential)
    pub enumeration_workers: usize,
    /// Multiplier applied to the cost of a cartesian product
    pub cartesian_penalty: f64,
    /// Multiplier applied to the cost of a join that cannot be a merge join
    pub default_join_penalty: f64,
    /// Occurrences/distinct ratio up to which a join variable counts as nearly a key
    pub nearly_key_ratio: f64,
    /// Cost per estimated row of an index scan
    pub leaf_cost_factor: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let threads = rayon::current_num_threads();
        Self {
            split_threshold: 7,
            leaf_workers: threads,
            enumeration_workers: threads,
            cartesian_penalty: 10.0,
            default_join_penalty: 3.0,
            nearly_key_ratio: 1.2,
            leaf_cost_factor: 1.0,
        }
    }
}

impl OptimizerConfig {
    /// Parses a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, OptimizerError> {
        let config: OptimizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, OptimizerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String, OptimizerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings the search cannot work with
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.split_threshold < 2 {
            return Err(OptimizerError::Config(format!(
                "split_threshold must be at least 2, got {}",
                self.split_threshold
            )));
        }
        // the DP keys subsets by a u64 bitmask
        if self.split_threshold > 63 {
            return Err(OptimizerError::Config(format!(
                "split_threshold must not exceed 63, got {}",
                self.split_threshold
            )));
        }
        let factors = [
            ("cartesian_penalty", self.cartesian_penalty),
            ("default_join_penalty", self.default_join_penalty),
            ("nearly_key_ratio", self.nearly_key_ratio),
            ("leaf_cost_factor", self.leaf_cost_factor),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(OptimizerError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn set_split_threshold(mut self, threshold: usize) -> Self {
        self.split_threshold = threshold;
        self
    }

    pub fn set_leaf_workers(mut self, workers: usize) -> Self {
        self.leaf_workers = workers;
        self
    }

    pub fn set_enumeration_workers(mut self, workers: usize) -> Self {
        self.enumeration_workers = workers;
        self
    }

    /// Disables every worker thread; useful for reproducible profiling
    pub fn sequential(self) -> Self {
        self.set_leaf_workers(0).set_enumeration_workers(0)
    }
}
