// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::request::PickRequest;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// One-shot integer picker
///
/// Proposes a candidate reply for a request. The tracker may end up taking a
/// nearby reply instead, if the candidate's branch is already pruned.
pub trait IntPicker {
    /// Picks one reply satisfying `req`.
    fn pick(&mut self, req: &PickRequest) -> i64;
}

/// Picks the default reply of every request
#[derive(Copy, Clone, Debug, Default)]
pub struct MinPicker;

impl IntPicker for MinPicker {
    fn pick(&mut self, req: &PickRequest) -> i64 {
        req.default()
    }
}

/// Seeded random picker, honoring request bias
pub struct RandomPicker {
    rng: SmallRng,
}

impl RandomPicker {
    /// Creates a picker with a reproducible seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl IntPicker for RandomPicker {
    fn pick(&mut self, req: &PickRequest) -> i64 {
        let rng = &mut self.rng;
        req.sample_with(&mut |lo, hi| rng.random_range(lo..=hi))
    }
}

/// Answers the pick function's requests for one playout
///
/// Implemented by the backtracker (live search) and by [`PlaybackPicker`]
/// (replaying a recorded trace).
pub(crate) trait PickSource {
    /// Answers one request, or `None` if the playout cannot continue.
    fn next_pick(&mut self, req: &PickRequest) -> Option<i64>;

    /// Abandons picks taken after `depth` and tries another branch.
    ///
    /// Returns `false` if no branch is left below `depth`.
    fn retry_from(&mut self, depth: usize) -> bool;

    /// Number of picks taken so far in the current playout.
    fn depth(&self) -> usize;
}

/// Why a strict playback stopped answering
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlaybackFault {
    pub index: usize,
    pub message: String,
}

/// Replays a recorded reply sequence
///
/// Strict mode insists that every reply matches its request and records a
/// fault otherwise; it is the engine behind [`Gen::build`](crate::Gen::build).
/// Lenient mode pads missing replies with the request minimum and silently
/// rejects mismatches, which is what shrink candidates need.
pub(crate) struct PlaybackPicker {
    replies: Vec<i64>,
    offset: usize,
    lenient: bool,
    fault: Option<PlaybackFault>,
}

impl PlaybackPicker {
    pub fn strict(replies: Vec<i64>) -> Self {
        Self {
            replies,
            offset: 0,
            lenient: false,
            fault: None,
        }
    }

    pub fn lenient(replies: Vec<i64>) -> Self {
        Self {
            replies,
            offset: 0,
            lenient: true,
            fault: None,
        }
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.len().saturating_sub(self.offset)
    }

    /// Index of the next reply to be served.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn fault(&self) -> Option<&PlaybackFault> {
        self.fault.as_ref()
    }
}

impl PickSource for PlaybackPicker {
    fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
        if self.fault.is_some() {
            return None;
        }

        let Some(&reply) = self.replies.get(self.offset) else {
            if self.lenient {
                self.offset += 1;
                return Some(req.min());
            }

            self.fault = Some(PlaybackFault {
                index: self.offset,
                message: "ran out of picks".to_string(),
            });

            return None;
        };

        if !req.contains(reply) {
            if !self.lenient {
                self.fault = Some(PlaybackFault {
                    index: self.offset,
                    message: format!(
                        "reply {reply} is not in [{}, {}]",
                        req.min(),
                        req.max(),
                    ),
                });
            }

            return None;
        }

        self.offset += 1;
        Some(reply)
    }

    fn retry_from(&mut self, _depth: usize) -> bool {
        // A recorded trace has exactly one branch
        false
    }

    fn depth(&self) -> usize {
        self.offset.min(self.replies.len())
    }
}
