/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// A slot of a triple pattern: either an unbound variable or a dictionary-encoded constant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(String),
    Constant(u32),
}

/// Subject, predicate and object slots of an elementary graph match
pub type TriplePattern = (Term, Term, Term);

impl Term {
    /// Returns the variable name if this term is a variable
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name.as_str()),
            Term::Constant(_) => None,
        }
    }

    /// Returns the constant id if this term is bound
    pub fn as_constant(&self) -> Option<u32> {
        match self {
            Term::Constant(id) => Some(*id),
            Term::Variable(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) if name.starts_with('?') => write!(f, "{}", name),
            Term::Variable(name) => write!(f, "?{}", name),
            Term::Constant(id) => write!(f, "<{}>", id),
        }
    }
}

/// Collects the distinct variables of a pattern in subject, predicate, object order
pub fn pattern_variables(pattern: &TriplePattern) -> Vec<String> {
    let mut variables: Vec<String> = Vec::with_capacity(3);
    for term in [&pattern.0, &pattern.1, &pattern.2] {
        if let Term::Variable(name) = term {
            if !variables.iter().any(|v| v == name) {
                variables.push(name.clone());
            }
        }
    }
    variables
}

/// Checks if a pattern contains a specific variable
pub fn pattern_contains_variable(pattern: &TriplePattern, var: &str) -> bool {
    [&pattern.0, &pattern.1, &pattern.2]
        .iter()
        .any(|term| term.as_variable() == Some(var))
}

/// Renders a pattern as `(s p o)`; the output is stable across runs
pub fn render_pattern(pattern: &TriplePattern) -> String {
    format!("({} {} {})", pattern.0, pattern.1, pattern.2)
}
