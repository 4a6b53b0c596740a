// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::error::BuildResult;
use crate::picks::PickFn;
use std::sync::Arc;

/// How a script's output may be reused
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Whether the output is immutable and may be shared instead of being
    /// rebuilt from recorded picks on each access
    pub cachable: bool,

    /// Whether top-level calls made by this script are recorded as
    /// editable units for shrinking
    pub log_calls: bool,
}

trait ScriptImpl<T> {
    fn build(&self, pick: &mut PickFn<'_>) -> BuildResult<T>;
}

struct BuildFn<F>(F);

impl<T, F> ScriptImpl<T> for BuildFn<F>
where
    F: Fn(&mut PickFn<'_>) -> BuildResult<T>,
{
    fn build(&self, pick: &mut PickFn<'_>) -> BuildResult<T> {
        (self.0)(pick)
    }
}

/// A pipeline: builds the base, then feeds it through a step
///
/// Treated as a single logical build; the boundary between the segments is
/// recorded in the call log so shrinking can tell them apart.
struct Piped<T, U> {
    base: Script<T>,
    #[allow(clippy::type_complexity)]
    step: Arc<dyn Fn(T, &mut PickFn<'_>) -> BuildResult<U>>,
}

impl<T, U> ScriptImpl<U> for Piped<T, U> {
    fn build(&self, pick: &mut PickFn<'_>) -> BuildResult<U> {
        let base = self.base.build(pick)?;
        pick.mark_segment();
        (self.step)(base, pick)
    }
}

/// A named build function
///
/// The sole way values get made: a build function reads picks through a
/// [`PickFn`] and produces a value, or signals
/// [`Filtered`](crate::Filtered). Cloning is cheap; the build function is
/// shared.
pub struct Script<T> {
    name: Arc<str>,
    options: ScriptOptions,
    inner: Arc<dyn ScriptImpl<T>>,
}

impl<T> Clone for Script<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            options: self.options,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Script<T> {
    /// Wraps a build function with default options.
    #[must_use]
    pub fn of(
        name: &str,
        build: impl Fn(&mut PickFn<'_>) -> BuildResult<T> + 'static,
    ) -> Self {
        Self::with_options(name, ScriptOptions::default(), build)
    }

    /// Wraps a build function.
    #[must_use]
    pub fn with_options(
        name: &str,
        options: ScriptOptions,
        build: impl Fn(&mut PickFn<'_>) -> BuildResult<T> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            options,
            inner: Arc::new(BuildFn(build)),
        }
    }

    /// The script's name, used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The script's options.
    #[must_use]
    pub fn options(&self) -> ScriptOptions {
        self.options
    }

    /// Composes this script with a step consuming its output.
    ///
    /// The pipeline is not cachable (the step's output is arbitrary) but
    /// inherits call logging from the base.
    #[must_use]
    pub fn then<U: 'static>(
        &self,
        name: &str,
        step: impl Fn(T, &mut PickFn<'_>) -> BuildResult<U> + 'static,
    ) -> Script<U>
    where
        T: 'static,
    {
        Script {
            name: name.into(),
            options: ScriptOptions {
                cachable: false,
                log_calls: self.options.log_calls,
            },
            inner: Arc::new(Piped {
                base: self.clone(),
                step: Arc::new(step),
            }),
        }
    }

    pub(crate) fn build(&self, pick: &mut PickFn<'_>) -> BuildResult<T> {
        self.inner.build(pick)
    }
}

impl<T> std::fmt::Debug for Script<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}
