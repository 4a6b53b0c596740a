// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Tracker;
use crate::request::PickRequest;
use crate::tree::Walk;

/// Iterative-deepening enumeration of all reachable playouts
///
/// Enumerates shortest playouts first, without duplicates across passes.
/// Each pass runs a depth-first search over a fresh pass tree whose
/// requests are narrowed to a per-depth width, while a shared tree carries
/// the prunes of accepted playouts across passes. A playout that lands on
/// a pruned shared branch is a duplicate; it is abandoned and its pass
/// branch pruned, so every attempt makes progress.
///
/// Width schedule: at `depth` during pass `p`, the width is
/// `p - depth + 1`, multiplied by `p - 10` once `p > 10` so that very wide
/// requests (16-bit chars, say) do not need thousands of passes. The
/// search ends when a pass completes without narrowing any request, or
/// when `max_passes` is reached.
pub struct OrderedTracker {
    shared: Walk,
    pass: Walk,
    current_pass: usize,
    filtered_this_pass: bool,
    max_passes: Option<usize>,
    done: bool,
}

impl OrderedTracker {
    /// Unbounded passes; the configuration used for default-value search.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Walk::new(),
            pass: Walk::new(),
            current_pass: 1,
            filtered_this_pass: false,
            max_passes: None,
            done: false,
        }
    }

    /// Stops after `max_passes` passes, found or not.
    #[must_use]
    pub fn with_max_passes(max_passes: usize) -> Self {
        let mut tracker = Self::new();
        tracker.max_passes = Some(max_passes);
        tracker
    }

    /// The pass currently being enumerated (starts at 1).
    #[must_use]
    pub fn current_pass(&self) -> usize {
        self.current_pass
    }

    fn pass_width(&self, depth: usize) -> Option<u64> {
        let base = self.current_pass as i64 - depth as i64 + 1;

        if base < 1 {
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let mut width = base as u64;

        if self.current_pass > 10 {
            width = width.saturating_mul((self.current_pass - 10) as u64);
        }

        Some(width)
    }

    fn next_pass(&mut self) -> bool {
        if !self.filtered_this_pass {
            // nothing was narrowed, so the space is fully enumerated
            return false;
        }

        if let Some(cap) = self.max_passes {
            if self.current_pass >= cap {
                return false;
            }
        }

        self.current_pass += 1;
        self.filtered_this_pass = false;
        self.pass = Walk::new();
        self.shared.trim(0);

        log::trace!("ordered search: starting pass {}", self.current_pass);

        true
    }
}

impl Default for OrderedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker for OrderedTracker {
    fn start_at(&mut self, depth: usize) -> bool {
        if self.done {
            return false;
        }

        if self.shared.pruned() {
            self.done = true;
            return false;
        }

        if self.pass.pruned() {
            if depth > 0 {
                // a mid-playout retry cannot cross into the next pass
                return false;
            }

            if !self.next_pass() {
                self.done = true;
                return false;
            }

            return true;
        }

        if depth > self.pass.depth() {
            return false;
        }

        self.pass.trim(depth);
        self.shared.trim(depth);

        true
    }

    fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
        let depth = self.pass.depth();

        let Some(width) = self.pass_width(depth) else {
            self.filtered_this_pass = true;
            return None;
        };

        if width < req.size() {
            self.filtered_this_pass = true;
        }

        let narrowed = req.narrowed(width);

        // every reply in the window already yielded: the prefix is dead
        // for this pass
        self.shared
            .first_unpruned_in_range(narrowed.min(), narrowed.max())?;

        let reply = self.pass.push_unpruned(narrowed.min(), &narrowed, true)?;

        if !self.shared.push(req, reply) {
            // already yielded in an earlier pass
            return None;
        }

        Some(reply)
    }

    fn end_playout(&mut self, accepted: bool) {
        if accepted {
            self.shared.prune();
        }
        self.pass.prune();
    }

    fn done(&self) -> bool {
        self.done || self.shared.pruned()
    }

    fn depth(&self) -> usize {
        self.pass.depth()
    }
}
