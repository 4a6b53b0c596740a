// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A K.I.S.S. search-and-shrink core for property-based testing.
//!
//! ##### NOTE
//!
//! > This crate only provides the core machinery: the pick tree, the
//! > search strategies and the shrinker. It does not ship a library of
//! > built-in generators; test inputs are described directly as scripts
//! > over integer pick requests.
//!
//! ##### About
//!
//! A [`Script`] is a named build function that reads integer picks from a
//! [`PickFn`] and produces a value. Running a script against a
//! [`Backtracker`] yields a stream of distinct values: ordered enumeration
//! explores shortest playouts first without duplicates, while seeded random
//! sampling avoids revisits by remembering its paths in a pick tree.
//!
//! Every accepted playout is captured as a [`Gen`]: the script, the pick
//! trace partitioned by call boundaries, and the value. Because the trace
//! regenerates the value deterministically, a failing value can be
//! [`shrink`]-reduced to a locally minimal counterexample by editing the
//! trace and replaying it.
//!
//! # Example usage
//!
//! ```
//! use pick_tree::{take, PickRequest, Runner, Script};
//!
//! // A script reads integer picks to build a value
//! let bits = Script::of("bits", |pick| {
//!     let bit = PickRequest::new(0, 1).expect("valid range");
//!     let a = pick.pick(&bit)?;
//!     let b = pick.pick(&bit)?;
//!     Ok((a, b))
//! });
//!
//! // Ordered enumeration yields distinct values, shortest playouts first
//! let values = take(&bits, 4).expect("generation succeeds");
//! assert_eq!(vec![(0, 0), (1, 0), (0, 1), (1, 1)], values);
//!
//! // A failing property is shrunk to a minimal counterexample
//! let failure = Runner::new(42)
//!     .check(&bits, |&(a, _)| a == 0)
//!     .expect("no errors")
//!     .expect("failure found");
//!
//! assert_eq!((1, 0), failure.gen.val());
//! ```

#![doc(html_logo_url = "https://raw.githubusercontent.com/fjall-rs/pick-tree/main/logo.png")]
#![doc(html_favicon_url = "https://raw.githubusercontent.com/fjall-rs/pick-tree/main/logo.png")]
#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

mod backtrack;
mod call_log;
mod error;
mod gen;
mod generate;
mod picker;
mod picks;
mod request;
mod runner;
mod script;
mod shrink;
mod tracker;
mod tree;

pub use {
    backtrack::{Backtracker, State},
    call_log::{CallLog, CallSpan, Group, PickView},
    error::{BuildResult, Error, Filtered, Result},
    gen::Gen,
    generate::{
        find, generate, generate_all, generate_default, take, take_all, FindOptions, GenAll,
        GenerateOptions, TakeOptions,
    },
    picker::{IntPicker, MinPicker, RandomPicker},
    picks::{PickFn, ACCEPT_TRIES},
    request::{BiasFn, PickRequest, MAX_PICK},
    runner::{Failure, Runner},
    script::{Script, ScriptOptions},
    shrink::shrink,
    tracker::{AnyTracker, OrderedTracker, PartialTracker, Tracker},
};
