// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::backtrack::Backtracker;
use crate::gen::Gen;
use crate::generate::{generate, GenerateOptions};
use crate::script::Script;
use crate::shrink::shrink;

/// A property violation, reduced to a locally minimal counterexample
#[derive(Debug)]
pub struct Failure<T> {
    /// Which rep failed first
    pub rep: usize,

    /// Seed that reproduces the run
    pub seed: u64,

    /// The shrunken counterexample
    pub gen: Gen<T>,
}

/// Drives reps of random values through a property
///
/// Values are drawn with a seeded sampling backtracker, so runs are
/// reproducible. On the first violation the counterexample is shrunk
/// against the negated property and returned.
#[derive(Copy, Clone, Debug)]
pub struct Runner {
    seed: u64,
    reps: usize,
    limit: Option<usize>,
}

impl Runner {
    /// A runner with the default 100 reps.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            reps: 100,
            limit: None,
        }
    }

    /// Sets how many values are tried.
    #[must_use]
    pub fn reps(mut self, reps: usize) -> Self {
        self.reps = reps;
        self
    }

    /// Caps picks per playout, bounding the size of generated values.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks `property` against generated values.
    ///
    /// Returns the first failure, shrunk, or `None` if every rep passed.
    /// A script whose value set runs out early just ends the run. Panics
    /// inside the property propagate unchanged.
    ///
    /// # Errors
    ///
    /// Forwards generation errors such as [`Error::GiveUp`](crate::Error).
    pub fn check<T, P>(&self, script: &Script<T>, property: P) -> crate::Result<Option<Failure<T>>>
    where
        T: Clone,
        P: Fn(&T) -> bool,
    {
        let mut backtracker = Backtracker::sampled(self.seed);
        let options = GenerateOptions { limit: self.limit };

        for rep in 0..self.reps {
            let Some(gen) = generate(script, &mut backtracker, &options)? else {
                log::debug!(
                    "{:?}: value set exhausted after {rep} reps",
                    script.name(),
                );
                return Ok(None);
            };

            if !property(&gen.val()) {
                log::info!("{:?}: rep {rep} failed, shrinking", script.name());

                let shrunk = shrink(&gen, |value| !property(value));

                return Ok(Some(Failure {
                    rep,
                    seed: self.seed,
                    gen: shrunk,
                }));
            }
        }

        Ok(None)
    }
}
