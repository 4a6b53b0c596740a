// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Signal that the current playout cannot produce a value
///
/// This is recoverable control flow, not an error: build functions and the
/// pick function return it, and the backtracker reacts by abandoning the
/// playout and trying another one. It never surfaces through
/// [`generate`](crate::generate).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Filtered;

/// Result of running a build function
pub type BuildResult<T> = std::result::Result<T, Filtered>;

/// Represents errors that can occur in the search-and-shrink core
#[derive(Debug)]
pub enum Error {
    /// Invalid pick request bounds
    InvalidRange {
        /// Lower bound as given
        min: i64,

        /// Upper bound as given
        max: i64,
    },

    /// Pick request default outside `[min, max]`
    InvalidDefault {
        /// Default as given
        default: i64,

        /// Lower bound
        min: i64,

        /// Upper bound
        max: i64,
    },

    /// An `accept` filter rejected every attempt up to the retry cap
    GiveUp {
        /// Name of the script whose filter kept rejecting
        script: String,

        /// Number of attempts made before giving up
        tries: usize,
    },

    /// Recorded replies did not satisfy the requests the script issued
    Playback {
        /// Name of the script being replayed
        script: String,

        /// Index of the first offending pick
        index: usize,

        /// What went wrong at that index
        message: String,
    },

    /// A finite value set exceeded the configured limit
    TooManyValues {
        /// Name of the script being enumerated
        script: String,

        /// Configured value limit
        limit: usize,
    },

    /// No value matched the predicate within the search limit
    NoMatch {
        /// Name of the script being searched
        script: String,

        /// Number of values examined
        limit: usize,
    },

    /// The search was exhausted before any value was produced
    Exhausted {
        /// Name of the script
        script: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { min, max } => {
                write!(f, "invalid pick range [{min}, {max}]")
            }
            Self::InvalidDefault { default, min, max } => {
                write!(f, "default {default} is outside pick range [{min}, {max}]")
            }
            Self::GiveUp { script, tries } => {
                write!(f, "{script:?} filtered all {tries} attempts; giving up")
            }
            Self::Playback { script, index, message } => {
                write!(f, "cannot replay {script:?}: pick {index}: {message}")
            }
            Self::TooManyValues { script, limit } => {
                write!(f, "{script:?} has more than {limit} values")
            }
            Self::NoMatch { script, limit } => {
                write!(f, "no match in the first {limit} values of {script:?}")
            }
            Self::Exhausted { script, .. } => {
                write!(f, "{script:?} has no values")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Search-and-shrink result
pub type Result<T> = std::result::Result<T, Error>;
