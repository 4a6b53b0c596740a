// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::call_log::CallLog;
use crate::error::{BuildResult, Error, Filtered};
use crate::picker::PickSource;
use crate::request::PickRequest;
use crate::script::Script;

/// How often an `accept` filter may reject before the build gives up
pub const ACCEPT_TRIES: usize = 1000;

/// The pick function: the sole API by which a build consumes entropy
///
/// Hands out single replies with [`PickFn::pick`] and evaluates nested
/// scripts with [`PickFn::pick_from`], recording everything in a
/// [`CallLog`] along the way.
pub struct PickFn<'a> {
    source: &'a mut dyn PickSource,
    log: CallLog,
    limit: Option<usize>,
    log_calls: bool,
    call_depth: usize,
    fatal: Option<Error>,
}

impl<'a> PickFn<'a> {
    pub(crate) fn new(
        source: &'a mut dyn PickSource,
        limit: Option<usize>,
        log_calls: bool,
    ) -> Self {
        Self {
            source,
            log: CallLog::new(),
            limit,
            log_calls,
            call_depth: 0,
            fatal: None,
        }
    }

    /// Takes one pick satisfying `req`.
    ///
    /// Once the playout's pick limit is reached, every request is forced
    /// to its minimum, bounding the size of generated values.
    ///
    /// # Errors
    ///
    /// Signals [`Filtered`] if the current playout cannot continue.
    pub fn pick(&mut self, req: &PickRequest) -> BuildResult<i64> {
        let over_limit = self.limit.is_some_and(|limit| self.log.len() >= limit);

        let effective = if over_limit {
            req.forced_min()
        } else {
            req.clone()
        };

        let Some(reply) = self.source.next_pick(&effective) else {
            return Err(Filtered);
        };

        self.log.push(effective, reply);
        Ok(reply)
    }

    /// Evaluates a nested script.
    ///
    /// If the script signals [`Filtered`], its picks are discarded and the
    /// build retries from the same depth on another branch; the signal
    /// propagates once no branch is left.
    ///
    /// # Errors
    ///
    /// Signals [`Filtered`] if no branch below this call yields a value.
    pub fn pick_from<T>(&mut self, script: &Script<T>) -> BuildResult<T> {
        self.call(script, None)
    }

    /// Evaluates a nested script, rejecting outputs that fail `accept`.
    ///
    /// Rejection retries on another branch, up to [`ACCEPT_TRIES`]
    /// attempts; past the cap the build fails with
    /// [`Error::GiveUp`] naming the script.
    ///
    /// # Errors
    ///
    /// Signals [`Filtered`] if no acceptable value can be produced.
    pub fn pick_from_accepted<T>(
        &mut self,
        script: &Script<T>,
        accept: &dyn Fn(&T) -> bool,
    ) -> BuildResult<T> {
        self.call(script, Some(accept))
    }

    fn call<T>(
        &mut self,
        script: &Script<T>,
        accept: Option<&dyn Fn(&T) -> bool>,
    ) -> BuildResult<T> {
        let start_len = self.log.len();
        let start_depth = self.source.depth();
        let record = self.log_calls && self.call_depth == 0;

        self.call_depth += 1;
        let result = self.run_call(script, accept, start_len, start_depth);
        self.call_depth -= 1;

        if result.is_ok() && record {
            self.log.push_span(start_len, self.log.len(), script.name());
        }

        result
    }

    fn run_call<T>(
        &mut self,
        script: &Script<T>,
        accept: Option<&dyn Fn(&T) -> bool>,
        start_len: usize,
        start_depth: usize,
    ) -> BuildResult<T> {
        let mut tries = 0;
        let mut filtered = 0;

        loop {
            match script.build(self) {
                Ok(value) => {
                    let Some(accept) = accept else {
                        return Ok(value);
                    };

                    if accept(&value) {
                        return Ok(value);
                    }

                    tries += 1;

                    if tries >= ACCEPT_TRIES {
                        log::debug!(
                            "{:?} rejected {tries} values; giving up",
                            script.name(),
                        );
                        self.fatal = Some(Error::GiveUp {
                            script: script.name().to_string(),
                            tries,
                        });
                        return Err(Filtered);
                    }
                }
                Err(Filtered) => {
                    if self.fatal.is_some() {
                        return Err(Filtered);
                    }

                    // below an untracked frontier the tree cannot run out,
                    // so bound these retries as well
                    filtered += 1;
                    if filtered >= ACCEPT_TRIES {
                        return Err(Filtered);
                    }
                }
            }

            // rejected or filtered: discard this call's picks and start a
            // new sub-playout from the same depth
            self.log.truncate(start_len);

            if !self.source.retry_from(start_depth) {
                return Err(Filtered);
            }
        }
    }

    /// Marks a pipeline step boundary; nested pipelines are opaque.
    pub(crate) fn mark_segment(&mut self) {
        if self.call_depth == 0 {
            self.log.mark_segment();
        }
    }

    pub(crate) fn take_fatal(&mut self) -> Option<Error> {
        self.fatal.take()
    }

    pub(crate) fn into_log(self) -> CallLog {
        self.log
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::{PickFn, ACCEPT_TRIES};
    use crate::error::{Error, Filtered};
    use crate::picker::PlaybackPicker;
    use crate::request::PickRequest;
    use crate::script::{Script, ScriptOptions};
    use test_log::test;

    fn digit() -> PickRequest {
        PickRequest::new(0, 9).expect("valid")
    }

    #[test]
    fn picks_are_logged() {
        let mut source = PlaybackPicker::strict(vec![3, 7]);
        let mut pick = PickFn::new(&mut source, None, false);

        assert_eq!(Ok(3), pick.pick(&digit()));
        assert_eq!(Ok(7), pick.pick(&digit()));

        let log = pick.into_log();
        assert_eq!(&[3, 7], log.replies());
    }

    #[test]
    fn limit_forces_minimum() {
        let mut source = PlaybackPicker::lenient(vec![3]);
        let mut pick = PickFn::new(&mut source, Some(1), false);

        assert_eq!(Ok(3), pick.pick(&digit()));

        // over the limit: the request collapses to [0, 0]
        assert_eq!(Ok(0), pick.pick(&digit()));
    }

    #[test]
    fn zero_limit_forces_every_request() {
        let req = PickRequest::new(2, 9).expect("valid");
        let mut source = PlaybackPicker::lenient(Vec::new());
        let mut pick = PickFn::new(&mut source, Some(0), false);

        assert_eq!(Ok(2), pick.pick(&req));
        assert_eq!(Ok(2), pick.pick(&req));
    }

    #[test]
    fn top_level_calls_are_recorded() {
        let pair = Script::of("pair", |pick| {
            let a = pick.pick(&PickRequest::new(0, 9).expect("valid"))?;
            let b = pick.pick(&PickRequest::new(0, 9).expect("valid"))?;
            Ok((a, b))
        });

        let mut source = PlaybackPicker::strict(vec![1, 2, 3]);
        let mut pick = PickFn::new(&mut source, None, true);

        assert_eq!(Ok(1), pick.pick(&digit()));
        assert_eq!(Ok((2, 3)), pick.pick_from(&pair));

        let log = pick.into_log();
        assert_eq!(1, log.spans().len());
        assert_eq!((1, 3), (log.spans()[0].start, log.spans()[0].end));
        assert_eq!("pair", log.spans()[0].name);
    }

    #[test]
    fn nested_calls_are_not_recorded() {
        let inner = Script::of("inner", |pick| {
            pick.pick(&PickRequest::new(0, 9).expect("valid"))
        });

        let outer_inner = inner.clone();
        let outer = Script::of("outer", move |pick| pick.pick_from(&outer_inner));

        let mut source = PlaybackPicker::strict(vec![4]);
        let mut pick = PickFn::new(&mut source, None, true);

        assert_eq!(Ok(4), pick.pick_from(&outer));

        let log = pick.into_log();
        assert_eq!(1, log.spans().len());
        assert_eq!("outer", log.spans()[0].name);
    }

    #[test]
    fn rejection_in_playback_filters() {
        let value = Script::of("value", |pick| {
            pick.pick(&PickRequest::new(0, 9).expect("valid"))
        });

        let mut source = PlaybackPicker::strict(vec![4]);
        let mut pick = PickFn::new(&mut source, None, false);

        // playback has a single branch, so rejection cannot recover
        let result = pick.pick_from_accepted(&value, &|&v| v > 4);
        assert_eq!(Err(Filtered), result);
    }

    #[test]
    fn giving_up_reports_the_script() {
        let value = Script::with_options(
            "unlucky",
            ScriptOptions::default(),
            |pick| pick.pick(&PickRequest::new(0, 9).expect("valid")),
        );

        // endless identical branches, all rejected
        let replies = vec![4; ACCEPT_TRIES + 1];
        let mut source = EndlessSource(replies);
        let mut pick = PickFn::new(&mut source, None, false);

        let result = pick.pick_from_accepted(&value, &|_| false);
        assert_eq!(Err(Filtered), result);

        match pick.take_fatal() {
            Some(Error::GiveUp { script, tries }) => {
                assert_eq!("unlucky", script);
                assert_eq!(ACCEPT_TRIES, tries);
            }
            other => panic!("expected GiveUp, got {other:?}"),
        }
    }

    /// A source with unlimited branches, for exercising retry loops.
    struct EndlessSource(Vec<i64>);

    impl crate::picker::PickSource for EndlessSource {
        fn next_pick(&mut self, req: &PickRequest) -> Option<i64> {
            let reply = self.0.pop()?;
            req.contains(reply).then_some(reply)
        }

        fn retry_from(&mut self, _depth: usize) -> bool {
            !self.0.is_empty()
        }

        fn depth(&self) -> usize {
            0
        }
    }
}
