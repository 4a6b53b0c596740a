// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::backtrack::Backtracker;
use crate::error::{Error, Filtered};
use crate::gen::Gen;
use crate::picks::PickFn;
use crate::script::Script;

/// Generation knobs
#[derive(Copy, Clone, Debug, Default)]
pub struct GenerateOptions {
    /// Cap on picks per playout; past it, requests are forced to their
    /// minimum
    pub limit: Option<usize>,
}

/// Knobs for [`take_all`]
#[derive(Copy, Clone, Debug)]
pub struct TakeOptions {
    /// Most values a finite set may hold before enumeration errors
    pub limit: usize,
}

impl Default for TakeOptions {
    fn default() -> Self {
        Self { limit: 1_000 }
    }
}

/// Knobs for [`find`]
#[derive(Copy, Clone, Debug)]
pub struct FindOptions {
    /// Most values examined before the search errors
    pub limit: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self { limit: 1_000 }
    }
}

/// Runs playouts until one is accepted, yielding its [`Gen`].
///
/// `Ok(None)` means the search is exhausted.
///
/// # Errors
///
/// Fails with [`Error::GiveUp`] when an `accept` filter rejects past its
/// retry cap. User panics propagate unchanged.
pub fn generate<T>(
    script: &Script<T>,
    backtracker: &mut Backtracker,
    options: &GenerateOptions,
) -> crate::Result<Option<Gen<T>>> {
    while backtracker.start_at(0) {
        let mut pick = PickFn::new(backtracker, options.limit, script.options().log_calls);

        let built = script.build(&mut pick);
        let fatal = pick.take_fatal();
        let log = pick.into_log();

        match built {
            Ok(value) => {
                if backtracker.end_playout() {
                    return Ok(Some(Gen::new(script.clone(), log, value)));
                }
            }
            Err(Filtered) => {
                if let Some(error) = fatal {
                    return Err(error);
                }
            }
        }
    }

    Ok(None)
}

/// Yields the script's first value in ordered enumeration.
///
/// # Errors
///
/// Fails with [`Error::Exhausted`] if every playout filters.
pub fn generate_default<T>(script: &Script<T>) -> crate::Result<Gen<T>> {
    let mut backtracker = Backtracker::ordered();

    generate(script, &mut backtracker, &GenerateOptions::default())?.ok_or_else(|| {
        Error::Exhausted {
            script: script.name().to_string(),
        }
    })
}

/// Enumerates every reachable value, shortest playouts first.
///
/// Infinite scripts yield an infinite iterator.
pub fn generate_all<T>(script: &Script<T>) -> GenAll<T> {
    GenAll {
        script: script.clone(),
        backtracker: Backtracker::ordered(),
        options: GenerateOptions::default(),
        done: false,
    }
}

/// Iterator over ordered enumeration, see [`generate_all`]
pub struct GenAll<T> {
    script: Script<T>,
    backtracker: Backtracker,
    options: GenerateOptions,
    done: bool,
}

impl<T> Iterator for GenAll<T> {
    type Item = crate::Result<Gen<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match generate(&self.script, &mut self.backtracker, &self.options) {
            Ok(Some(gen)) => Some(Ok(gen)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// Collects the first `n` values of ordered enumeration.
///
/// # Errors
///
/// Forwards generation errors.
pub fn take<T: Clone>(script: &Script<T>, n: usize) -> crate::Result<Vec<T>> {
    let mut values = Vec::with_capacity(n);

    for gen in generate_all(script).take(n) {
        values.push(gen?.val());
    }

    Ok(values)
}

/// Collects every value of a finite script.
///
/// # Errors
///
/// Fails with [`Error::TooManyValues`] when the set exceeds
/// `options.limit`.
pub fn take_all<T: Clone>(script: &Script<T>, options: &TakeOptions) -> crate::Result<Vec<T>> {
    let mut values = Vec::new();

    for gen in generate_all(script) {
        values.push(gen?.val());

        if values.len() > options.limit {
            return Err(Error::TooManyValues {
                script: script.name().to_string(),
                limit: options.limit,
            });
        }
    }

    Ok(values)
}

/// Searches ordered enumeration for a value satisfying `predicate`.
///
/// `Ok(None)` means the script's whole value set was examined without a
/// match.
///
/// # Errors
///
/// Fails with [`Error::NoMatch`] once `options.limit` values were
/// examined.
pub fn find<T, P>(
    script: &Script<T>,
    predicate: P,
    options: &FindOptions,
) -> crate::Result<Option<Gen<T>>>
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    let mut examined = 0;

    for gen in generate_all(script) {
        let gen = gen?;

        if predicate(&gen.val()) {
            return Ok(Some(gen));
        }

        examined += 1;

        if examined >= options.limit {
            return Err(Error::NoMatch {
                script: script.name().to_string(),
                limit: options.limit,
            });
        }
    }

    Ok(None)
}
