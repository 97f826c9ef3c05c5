/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

/// Caps the number of worker threads spawned by one optimization call
///
/// A unit of work that cannot acquire a slot runs inline on the caller's thread.
#[derive(Debug)]
pub struct WorkerBudget {
    active: AtomicUsize,
    max_workers: usize,
}

/// Releases its slot when dropped
#[derive(Debug)]
pub struct WorkerSlot<'a> {
    budget: &'a WorkerBudget,
}

impl WorkerBudget {
    pub fn new(max_workers: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max_workers,
        }
    }

    /// Takes a slot if fewer than `max_workers` are in use
    pub fn try_acquire(&self) -> Option<WorkerSlot<'_>> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max_workers {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(WorkerSlot { budget: self }),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

impl Drop for WorkerSlot<'_> {
    fn drop(&mut self) {
        self.budget.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Re-raises the panic of a scoped worker on the joining thread
pub(crate) fn join_scope<T>(result: std::thread::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
