// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::picker::PickSource;
use crate::request::PickRequest;
use crate::tracker::{AnyTracker, Tracker};

/// Where a backtracker is in the playout lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// No playout has started yet
    Ready,

    /// A playout is in progress
    Picking,

    /// The last playout ended; another may be started
    PlayoutDone,

    /// The search is exhausted; all operations return none/false
    SearchDone,
}

/// Drives playouts over a tracker, enforcing the lifecycle
///
/// `Ready → Picking → (PlayoutDone | SearchDone)`: a playout begins with
/// [`Backtracker::start_at`], consumes picks through
/// [`Backtracker::next_pick`], and ends either by running out of picks
/// (abandoned) or by [`Backtracker::end_playout`] (accepted).
pub struct Backtracker {
    tracker: AnyTracker,
    state: State,
}

impl Backtracker {
    /// Hosts the given tracker.
    #[must_use]
    pub fn new(tracker: AnyTracker) -> Self {
        Self {
            tracker,
            state: State::Ready,
        }
    }

    /// Ordered enumeration, shortest playouts first.
    #[must_use]
    pub fn ordered() -> Self {
        Self::new(AnyTracker::ordered())
    }

    /// Seeded random sampling that avoids revisits.
    #[must_use]
    pub fn sampled(seed: u64) -> Self {
        Self::new(AnyTracker::sampled(seed))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Picks taken so far in the current playout.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tracker.depth()
    }

    /// Begins a new playout, reusing picks up to `depth` from the previous
    /// playout. Returns `false` iff the search is exhausted there.
    ///
    /// Starting while a playout is in progress abandons it first.
    pub fn start_at(&mut self, depth: usize) -> bool {
        if self.state == State::SearchDone {
            return false;
        }

        if self.state == State::Picking {
            self.tracker.end_playout(false);
        }

        if self.tracker.start_at(depth) {
            self.state = State::Picking;
            true
        } else {
            if self.tracker.done() {
                self.state = State::SearchDone;
            } else {
                self.state = State::PlayoutDone;
            }
            false
        }
    }

    /// Asks the tracker for the next reply.
    ///
    /// On `None` the playout is abandoned; call [`Backtracker::start_at`]
    /// to begin another.
    pub fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
        if self.state != State::Picking {
            return None;
        }

        match self.tracker.next_pick(req) {
            Some(reply) => Some(reply),
            None => {
                self.tracker.end_playout(false);
                self.state = if self.tracker.done() {
                    State::SearchDone
                } else {
                    State::PlayoutDone
                };
                None
            }
        }
    }

    /// Ends the current playout; returns `true` iff it was accepted.
    pub fn end_playout(&mut self) -> bool {
        if self.state != State::Picking {
            return false;
        }

        self.tracker.end_playout(true);
        self.state = if self.tracker.done() {
            State::SearchDone
        } else {
            State::PlayoutDone
        };

        true
    }
}

impl PickSource for Backtracker {
    fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
        Self::next_pick(self, req)
    }

    fn retry_from(&mut self, depth: usize) -> bool {
        self.start_at(depth)
    }

    fn depth(&self) -> usize {
        Self::depth(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{Backtracker, State};
    use crate::request::PickRequest;
    use test_log::test;

    fn bit() -> PickRequest {
        PickRequest::new(0, 1).expect("valid")
    }

    #[test]
    fn lifecycle_of_an_accepted_playout() {
        let mut bt = Backtracker::ordered();
        assert_eq!(State::Ready, bt.state());

        assert!(bt.start_at(0));
        assert_eq!(State::Picking, bt.state());

        assert_eq!(Some(0), bt.next_pick(&bit()));
        assert_eq!(1, bt.depth());

        assert!(bt.end_playout());
        assert_ne!(State::Picking, bt.state());
    }

    #[test]
    fn ending_twice_is_not_accepted() {
        let mut bt = Backtracker::ordered();

        assert!(bt.start_at(0));
        assert!(bt.end_playout());
        assert!(!bt.end_playout());
    }

    #[test]
    fn search_done_is_terminal() {
        let mut bt = Backtracker::ordered();

        // a zero-pick script has exactly one playout
        assert!(bt.start_at(0));
        assert!(bt.end_playout());
        assert_eq!(State::SearchDone, bt.state());

        assert!(!bt.start_at(0));
        assert_eq!(None, bt.next_pick(&bit()));
        assert!(!bt.end_playout());
        assert_eq!(State::SearchDone, bt.state());
    }

    #[test]
    fn picks_outside_a_playout_return_none() {
        let mut bt = Backtracker::ordered();
        assert_eq!(None, bt.next_pick(&bit()));
    }

    #[test]
    fn starting_mid_playout_abandons_it() {
        let mut bt = Backtracker::ordered();

        assert!(bt.start_at(0));
        assert_eq!(Some(0), bt.next_pick(&bit()));

        // abandoning [0] prunes it; the next playout starts at [1]
        assert!(bt.start_at(0));
        assert_eq!(Some(1), bt.next_pick(&bit()));
    }
}
