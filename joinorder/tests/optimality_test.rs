/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate kolibrie_joinorder;
use kolibrie_joinorder::join_optimizer::cost::CostConstants;
use kolibrie_joinorder::join_optimizer::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::terms::{pattern_variables, Term, TriplePattern};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed random cardinality for every subset of the synthetic patterns
    ///
    /// Patterns share no variables, so a subset is identified by its variables.
    struct CostTable {
        cardinalities: BTreeMap<BTreeSet<String>, f64>,
    }

    impl CostTable {
        fn new(n: usize, seed: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut cardinalities = BTreeMap::new();
            for mask in 1u32..(1 << n) {
                let variables: BTreeSet<String> = (0..n)
                    .filter(|i| mask & (1 << *i) != 0)
                    .flat_map(|i| vec![format!("?s{}", i), format!("?o{}", i)])
                    .collect();
                cardinalities.insert(variables, f64::from(rng.gen_range(1..=1000u32)));
            }
            CostTable { cardinalities }
        }

        fn selectivity(&self, variables: BTreeSet<String>) -> Result<Selectivity, StatisticsError> {
            let cardinality = *self
                .cardinalities
                .get(&variables)
                .ok_or_else(|| StatisticsError::Unavailable(format!("{:?}", variables)))?;
            Ok(variables.iter().fold(Selectivity::new(cardinality), |sel, variable| {
                sel.with_bucket(variable, Bucket::new(0, 1000, cardinality, cardinality))
            }))
        }
    }

    impl Statistics for CostTable {
        fn min_max(&self, _: &str, _: &TriplePattern) -> Result<(u32, u32), StatisticsError> {
            Ok((0, 1000))
        }

        fn histogram(
            &self,
            pattern: &TriplePattern,
            _: &[String],
            _: &VariableBounds,
            _: &VariableBounds,
        ) -> Result<Selectivity, StatisticsError> {
            self.selectivity(pattern_variables(pattern).into_iter().collect())
        }

        fn join_selectivity(
            &self,
            left: &Selectivity,
            right: &Selectivity,
        ) -> Result<Selectivity, StatisticsError> {
            let variables = left
                .buckets
                .keys()
                .chain(right.buckets.keys())
                .cloned()
                .collect();
            self.selectivity(variables)
        }
    }

    fn leaves(estimator: &CostEstimator<'_>, stats: &CostTable, n: usize) -> Vec<Plan> {
        (0..n)
            .map(|i| {
                let pattern = (
                    Term::Variable(format!("?s{}", i)),
                    Term::Constant(i as u32),
                    Term::Variable(format!("?o{}", i)),
                );
                let selectivity = stats
                    .histogram(&pattern, &[], &VariableBounds::new(), &VariableBounds::new())
                    .ok();
                estimator.leaf(pattern, selectivity)
            })
            .collect()
    }

    /// Every binary join tree over every permutation of `plans`
    fn all_trees(estimator: &CostEstimator<'_>, plans: &[Plan]) -> Vec<Plan> {
        if plans.len() == 1 {
            return vec![plans[0].clone()];
        }
        let n = plans.len();
        let mut trees = Vec::new();
        for mask in 1usize..(1 << n) - 1 {
            let (left, right): (Vec<(usize, &Plan)>, Vec<(usize, &Plan)>) =
                plans.iter().enumerate().partition(|(i, _)| mask & (1 << *i) != 0);
            let left: Vec<Plan> = left.into_iter().map(|(_, plan)| plan.clone()).collect();
            let right: Vec<Plan> = right.into_iter().map(|(_, plan)| plan.clone()).collect();
            for l in all_trees(estimator, &left) {
                for r in all_trees(estimator, &right) {
                    trees.push(estimator.join(l.clone(), r));
                }
            }
        }
        trees
    }

    fn assert_matches_oracle(n: usize, seed: u64, workers: usize) {
        let stats = CostTable::new(n, seed);
        let estimator = CostEstimator::new(&stats, CostConstants::default());

        let oracle = all_trees(&estimator, &leaves(&estimator, &stats, n))
            .iter()
            .map(Plan::cost)
            .fold(f64::INFINITY, f64::min);
        let plan = Enumerator::new(&estimator, workers).enumerate(leaves(&estimator, &stats, n));

        assert_eq!(plan.triple_patterns().len(), n);
        assert!(
            (plan.cost() - oracle).abs() <= 1e-9 * oracle.max(1.0),
            "n = {}, seed = {}: enumerator found {}, oracle {}",
            n,
            seed,
            plan.cost(),
            oracle
        );
    }

    #[test]
    fn test_enumerator_matches_brute_force() {
        for n in 3..=5 {
            for seed in 0..4 {
                assert_matches_oracle(n, seed, 0);
            }
        }
    }

    #[test]
    fn test_parallel_enumerator_matches_brute_force() {
        for seed in 10..13 {
            assert_matches_oracle(5, seed, 4);
        }
    }

    #[test]
    fn test_oracle_counts_all_trees() {
        let stats = CostTable::new(3, 0);
        let estimator = CostEstimator::new(&stats, CostConstants::default());
        // 3! orderings times 2 shapes
        assert_eq!(all_trees(&estimator, &leaves(&estimator, &stats, 3)).len(), 12);
    }
}
