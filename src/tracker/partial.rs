// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Tracker;
use crate::picker::{IntPicker, RandomPicker};
use crate::request::PickRequest;
use crate::tree::Walk;

/// Branch odds below which new nodes stop being tracked
const TRACK_ODDS: f64 = 1e-6;

/// Random sampling that avoids revisits, tracking adaptively
///
/// Draws candidate replies from an [`IntPicker`] and steers them to the
/// nearest unpruned branch. Accepted and filtered playouts alike are pruned,
/// so no playout is drawn twice — as long as its prefix is tracked.
///
/// Tracking every node of a wide random walk would exhaust memory, so a
/// node is only tracked while the running product of `1/size` along the
/// path stays above a threshold; past that point the expected number of
/// alternative playouts forgone by forgetting is negligible. The walk
/// itself upgrades untracked branches that keep getting revisited.
pub struct PartialTracker {
    walk: Walk,
    picker: Box<dyn IntPicker>,
    odds: f64,
    done: bool,
}

impl PartialTracker {
    /// Samples through the given picker.
    #[must_use]
    pub fn new(picker: Box<dyn IntPicker>) -> Self {
        Self {
            walk: Walk::new(),
            picker,
            odds: 1.0,
            done: false,
        }
    }

    /// Samples randomly with a reproducible seed.
    #[must_use]
    pub fn sampled(seed: u64) -> Self {
        Self::new(Box::new(RandomPicker::new(seed)))
    }
}

impl Tracker for PartialTracker {
    fn start_at(&mut self, depth: usize) -> bool {
        if self.done {
            return false;
        }

        if self.walk.pruned() {
            self.done = true;
            return false;
        }

        if depth > self.walk.depth() {
            return false;
        }

        self.walk.trim(depth);

        if depth == 0 {
            self.odds = 1.0;
        }

        true
    }

    fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
        self.odds /= req.size() as f64;

        let track = self.odds > TRACK_ODDS;
        let candidate = self.picker.pick(req);

        self.walk.push_unpruned(candidate, req, track)
    }

    fn end_playout(&mut self, _accepted: bool) {
        // filtered playouts are deterministic, so prune those too
        self.walk.prune();
    }

    fn done(&self) -> bool {
        self.done || self.walk.pruned()
    }

    fn depth(&self) -> usize {
        self.walk.depth()
    }
}
