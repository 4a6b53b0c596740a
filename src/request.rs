// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::error::Error;
use std::sync::Arc;

/// Largest magnitude a pick bound may have
///
/// Sizes and pick sums stay representable without overflow.
pub const MAX_PICK: i64 = (1 << 53) - 1;

/// Maps a uniform sampler to a reply
///
/// The sampler draws a uniform integer from an inclusive range. A bias
/// function may call it any number of times, but the final return value must
/// lie within the originating request's range.
pub type BiasFn = Arc<dyn Fn(&mut dyn FnMut(i64, i64) -> i64) -> i64>;

/// An inclusive integer range `[min, max]` requesting one reply
///
/// Carries an optional default (used when a playout is cut short) and an
/// optional bias function (used by random pickers). Immutable once built.
#[derive(Clone)]
pub struct PickRequest {
    min: i64,
    max: i64,
    default: i64,
    bias: Option<BiasFn>,
}

impl PickRequest {
    /// Creates a request for one integer in `[min, max]`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidRange`] if `min > max` or a bound exceeds
    /// [`MAX_PICK`] in magnitude.
    pub fn new(min: i64, max: i64) -> crate::Result<Self> {
        if min > max || min < -MAX_PICK || max > MAX_PICK {
            return Err(Error::InvalidRange { min, max });
        }

        Ok(Self {
            min,
            max,
            default: min,
            bias: None,
        })
    }

    /// Creates a request with an explicit default reply.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidDefault`] if the default is outside
    /// `[min, max]`, or [`Error::InvalidRange`] for invalid bounds.
    pub fn with_default(min: i64, max: i64, default: i64) -> crate::Result<Self> {
        let mut req = Self::new(min, max)?;

        if default < min || default > max {
            return Err(Error::InvalidDefault { default, min, max });
        }

        req.default = default;
        Ok(req)
    }

    /// Attaches a bias function consulted by random pickers.
    #[must_use]
    pub fn bias(mut self, bias: BiasFn) -> Self {
        self.bias = Some(bias);
        self
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// The reply used when a playout is cut short.
    #[must_use]
    pub fn default(&self) -> i64 {
        self.default
    }

    /// Number of possible replies.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.max.abs_diff(self.min) + 1
    }

    /// Whether `reply` satisfies this request.
    #[must_use]
    pub fn contains(&self, reply: i64) -> bool {
        self.min <= reply && reply <= self.max
    }

    pub(crate) fn same_range(&self, min: i64, max: i64) -> bool {
        self.min == min && self.max == max
    }

    /// Draws one reply, either through the bias function or uniformly.
    pub(crate) fn sample_with(&self, uniform: &mut dyn FnMut(i64, i64) -> i64) -> i64 {
        let reply = match &self.bias {
            Some(bias) => bias(uniform),
            None => uniform(self.min, self.max),
        };
        reply.clamp(self.min, self.max)
    }

    /// The first `width` replies of this request, as a request of its own.
    ///
    /// Narrowed requests drop the bias; enumeration ignores it anyway.
    pub(crate) fn narrowed(&self, width: u64) -> Self {
        debug_assert!(width >= 1);

        let max = if width >= self.size() {
            self.max
        } else {
            // width < size <= 2^54, so the cast and sum stay in range
            #[allow(clippy::cast_possible_wrap)]
            {
                self.min + (width as i64) - 1
            }
        };

        Self {
            min: self.min,
            max,
            default: self.default.clamp(self.min, max),
            bias: None,
        }
    }

    /// A single-reply request forcing the minimum, for playouts over the
    /// pick limit.
    pub(crate) fn forced_min(&self) -> Self {
        Self {
            min: self.min,
            max: self.min,
            default: self.min,
            bias: None,
        }
    }
}

impl std::fmt::Debug for PickRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickRequest")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("default", &self.default)
            .field("biased", &self.bias.is_some())
            .finish()
    }
}

impl PartialEq for PickRequest {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max && self.default == other.default
    }
}

impl Eq for PickRequest {}
