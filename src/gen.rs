// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::call_log::{CallLog, Group, PickView};
use crate::error::{Error, Filtered};
use crate::picker::PlaybackPicker;
use crate::picks::PickFn;
use crate::request::PickRequest;
use crate::script::Script;
use std::cell::RefCell;

#[derive(Clone, Debug)]
enum Stored<T> {
    /// Immutable output, shared on every access
    Frozen(T),

    /// Mutable output: handed out once, then rebuilt per access
    Once(RefCell<Option<T>>),
}

/// One generated value: a script, its recorded picks, and its output
///
/// Built exactly once per accepted playout and immutable afterwards. The
/// recorded trace regenerates the value deterministically, which is what
/// makes shrinking possible.
#[derive(Clone, Debug)]
pub struct Gen<T> {
    script: Script<T>,
    log: CallLog,
    value: Stored<T>,
}

impl<T> Gen<T> {
    pub(crate) fn new(script: Script<T>, log: CallLog, value: T) -> Self {
        let value = if script.options().cachable {
            Stored::Frozen(value)
        } else {
            Stored::Once(RefCell::new(Some(value)))
        };

        Self { script, log, value }
    }

    /// Runs `script` against a literal reply sequence.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Playback`] if the picks run out, a reply does
    /// not satisfy its request, extra replies remain unconsumed, or the
    /// script filters the playout. The message cites the script name and
    /// the first offending pick index.
    pub fn build(script: &Script<T>, replies: &[i64]) -> crate::Result<Self> {
        let mut source = PlaybackPicker::strict(replies.to_vec());
        let mut pick = PickFn::new(&mut source, None, script.options().log_calls);

        let built = script.build(&mut pick);
        let fatal = pick.take_fatal();
        let log = pick.into_log();

        match built {
            Ok(value) => {
                if source.remaining() > 0 {
                    return Err(Error::Playback {
                        script: script.name().to_string(),
                        index: source.offset(),
                        message: format!("{} picks left over", source.remaining()),
                    });
                }

                Ok(Self::new(script.clone(), log, value))
            }
            Err(Filtered) => {
                if let Some(error) = fatal {
                    return Err(error);
                }

                let (index, message) = match source.fault() {
                    Some(fault) => (fault.index, fault.message.clone()),
                    None => (
                        source.offset(),
                        "picks led to a filtered outcome".to_string(),
                    ),
                };

                Err(Error::Playback {
                    script: script.name().to_string(),
                    index,
                    message,
                })
            }
        }
    }

    /// Like [`Gen::build`], but panics on error.
    ///
    /// # Panics
    ///
    /// Panics if the replies cannot rebuild a value.
    #[must_use]
    pub fn must_build(script: &Script<T>, replies: &[i64]) -> Self {
        match Self::build(script, replies) {
            Ok(gen) => gen,
            Err(error) => panic!("{error}"),
        }
    }

    /// Runs `script` against an edited reply sequence, padding missing
    /// picks with the minimum and ignoring leftovers. `None` if the edits
    /// are inconsistent with the script's control flow.
    pub(crate) fn build_lenient(script: &Script<T>, replies: &[i64]) -> Option<Self> {
        let mut source = PlaybackPicker::lenient(replies.to_vec());
        let mut pick = PickFn::new(&mut source, None, script.options().log_calls);

        let built = script.build(&mut pick);
        let log = pick.into_log();

        built.ok().map(|value| Self::new(script.clone(), log, value))
    }

    /// The name of the script that produced this value.
    #[must_use]
    pub fn name(&self) -> &str {
        self.script.name()
    }

    /// The recorded trace, partitioned by call boundaries.
    #[must_use]
    pub fn call_log(&self) -> &CallLog {
        &self.log
    }

    /// The replies, in trace order.
    #[must_use]
    pub fn replies(&self) -> &[i64] {
        self.log.replies()
    }

    /// The requests, in trace order.
    #[must_use]
    pub fn requests(&self) -> &[PickRequest] {
        self.log.reqs()
    }

    /// Trace length in picks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Stable keys of the editable units of the trace.
    #[must_use]
    pub fn group_keys(&self) -> Vec<usize> {
        (0..self.log.groups().len()).collect()
    }

    /// The picks belonging to one editable unit.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not one of [`Gen::group_keys`].
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn group_picks(&self, key: usize) -> PickView<'_> {
        let groups = self.log.groups();
        self.log.view(groups[key])
    }

    pub(crate) fn groups(&self) -> Vec<Group> {
        self.log.groups()
    }

    pub(crate) fn segment_groups(&self) -> Vec<Group> {
        self.log.segment_groups()
    }

    pub(crate) fn script(&self) -> &Script<T> {
        &self.script
    }

    fn replay(&self) -> Option<T> {
        let mut source = PlaybackPicker::strict(self.log.replies().to_vec());
        let mut pick = PickFn::new(&mut source, None, false);
        self.script.build(&mut pick).ok()
    }
}

impl<T: Clone> Gen<T> {
    /// The generated value.
    ///
    /// Cachable scripts share their output. Everything else hands out the
    /// original once, then rebuilds a fresh value from the recorded picks
    /// on each access, so callers may mutate what they get.
    #[must_use]
    pub fn val(&self) -> T {
        match &self.value {
            Stored::Frozen(value) => value.clone(),
            Stored::Once(cell) => {
                if let Some(value) = cell.borrow_mut().take() {
                    return value;
                }

                self.replay()
                    .expect("recorded picks should replay deterministically")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Gen;
    use crate::error::Error;
    use crate::request::PickRequest;
    use crate::script::{Script, ScriptOptions};
    use test_log::test;

    fn digits() -> Script<Vec<i64>> {
        Script::of("digits", |pick| {
            let req = PickRequest::new(0, 9).expect("valid");
            let len = pick.pick(&PickRequest::new(0, 3).expect("valid"))?;
            (0..len).map(|_| pick.pick(&req)).collect()
        })
    }

    #[test]
    fn build_round_trips() {
        let gen = Gen::build(&digits(), &[2, 7, 3]).expect("valid picks");

        assert_eq!(vec![7, 3], gen.val());
        assert_eq!(&[2, 7, 3], gen.replies());
        assert_eq!(3, gen.len());
    }

    #[test]
    fn build_rejects_missing_picks() {
        let err = Gen::build(&digits(), &[2, 7]).expect_err("too few");

        match err {
            Error::Playback { script, index, .. } => {
                assert_eq!("digits", script);
                assert_eq!(2, index);
            }
            other => panic!("expected Playback, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_leftover_picks() {
        let err = Gen::build(&digits(), &[0, 7]).expect_err("too many");

        match err {
            Error::Playback { script, index, .. } => {
                assert_eq!("digits", script);
                assert_eq!(1, index);
            }
            other => panic!("expected Playback, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_mismatched_reply() {
        let err = Gen::build(&digits(), &[9, 7]).expect_err("out of range");

        match err {
            Error::Playback { index, .. } => assert_eq!(0, index),
            other => panic!("expected Playback, got {other:?}"),
        }
    }

    #[test]
    fn mutable_values_are_rebuilt_per_access() {
        let gen = Gen::build(&digits(), &[2, 7, 3]).expect("valid picks");

        let mut first = gen.val();
        first.push(999);

        // later accesses replay the recorded picks
        assert_eq!(vec![7, 3], gen.val());
        assert_eq!(vec![7, 3], gen.val());
    }

    #[test]
    fn cachable_values_are_shared() {
        let opts = ScriptOptions {
            cachable: true,
            log_calls: false,
        };
        let script = Script::with_options("three", opts, |pick| {
            pick.pick(&PickRequest::new(0, 9).expect("valid"))
        });

        let gen = Gen::build(&script, &[3]).expect("valid picks");
        assert_eq!(3, gen.val());
        assert_eq!(3, gen.val());
    }

    #[test]
    fn empty_trace_is_valid() {
        let script = Script::of("unit", |_| Ok(42));
        let gen = Gen::build(&script, &[]).expect("no picks needed");

        assert_eq!(42, gen.val());
        assert!(gen.is_empty());
        assert!(gen.group_keys().is_empty());
    }
}
