/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crate::terms::{Term, TriplePattern};
use serde::{Deserialize, Serialize};

#[derive(PartialEq, Debug, Clone, Copy, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: u32,
    pub predicate: u32,
    pub object: u32,
}

impl Triple {
    pub fn new(subject: u32, predicate: u32, object: u32) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns the id in the slot at `position` (0 subject, 1 predicate, 2 object)
    pub fn slot(&self, position: usize) -> u32 {
        match position {
            0 => self.subject,
            1 => self.predicate,
            _ => self.object,
        }
    }

    /// Checks the constants of a pattern and the consistency of repeated variables
    pub fn matches(&self, pattern: &TriplePattern) -> bool {
        let terms = [&pattern.0, &pattern.1, &pattern.2];
        for (position, term) in terms.iter().enumerate() {
            match term {
                Term::Constant(id) => {
                    if self.slot(position) != *id {
                        return false;
                    }
                }
                Term::Variable(name) => {
                    for (other, other_term) in terms.iter().enumerate().skip(position + 1) {
                        if matches!(other_term, Term::Variable(v) if v == name)
                            && self.slot(other) != self.slot(position)
                        {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}
