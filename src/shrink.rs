// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::call_log::Group;
use crate::gen::Gen;

/// Edit attempts allowed per strategy per round
const STRATEGY_TRIES: usize = 100;

/// Searches for a smaller value that still satisfies `test`.
///
/// `test(seed.val())` must hold. Strategies run in a fixed order — remove
/// call groups, truncate tails, collapse options, lower single picks —
/// and the whole round repeats until none of them finds a smaller
/// accepted value. Every adopted candidate strictly decreases the trace
/// length or the distance of replies from their minimums, so the loop
/// terminates.
pub fn shrink<T, F>(seed: &Gen<T>, test: F) -> Gen<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    debug_assert!(test(&seed.val()), "the seed itself must satisfy the test");

    let mut best = seed.clone();

    loop {
        let mut improved = false;

        improved |= remove_groups(&mut best, &test);
        improved |= shrink_tails(&mut best, &test);
        improved |= shrink_options(&mut best, &test);
        improved |= shrink_picks(&mut best, &test);

        if !improved {
            break;
        }
    }

    log::debug!(
        "shrunk {:?} from {} to {} picks",
        best.name(),
        seed.len(),
        best.len(),
    );

    best
}

fn pick_total<T>(gen: &Gen<T>) -> u128 {
    gen.requests()
        .iter()
        .zip(gen.replies())
        .map(|(req, &reply)| u128::from(reply.abs_diff(req.min())))
        .sum()
}

fn is_smaller<T>(candidate: &Gen<T>, current: &Gen<T>) -> bool {
    (candidate.len(), pick_total(candidate)) < (current.len(), pick_total(current))
}

/// Regenerates an edited reply sequence and keeps it if it is a strictly
/// smaller value that still satisfies `test`.
fn try_edit<T, F>(current: &Gen<T>, replies: &[i64], test: &F) -> Option<Gen<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let candidate = Gen::build_lenient(current.script(), replies)?;

    if !is_smaller(&candidate, current) {
        return None;
    }

    test(&candidate.val()).then_some(candidate)
}

/// Call groups plus pipeline segments: everything the shrinker may edit
/// as a unit, in trace order, coarsest first.
fn editable_groups<T>(gen: &Gen<T>) -> Vec<Group> {
    let mut groups = gen.segment_groups();
    groups.extend(gen.groups().into_iter().filter(|g| g.call));
    groups
}

/// Deletes whole call groups and pipeline segments, first accepted
/// candidate wins.
fn remove_groups<T, F>(best: &mut Gen<T>, test: &F) -> bool
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut improved = false;
    let mut tries = 0;

    'scan: loop {
        let groups = editable_groups(best);

        for group in groups {
            if tries >= STRATEGY_TRIES {
                break 'scan;
            }
            tries += 1;

            let mut replies = best.replies().to_vec();
            replies.drain(group.start..group.end);

            if let Some(candidate) = try_edit(best, &replies, test) {
                *best = candidate;
                improved = true;
                continue 'scan;
            }
        }

        break;
    }

    improved
}

/// Truncates trailing picks — per call group, per pipeline segment, and
/// for the trace as a whole — bisecting on the kept length.
fn shrink_tails<T, F>(best: &mut Gen<T>, test: &F) -> bool
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut improved = false;
    let mut tries = 0;

    // the whole trace is the outermost truncatable group
    let whole = Group {
        start: 0,
        end: best.len(),
        call: true,
    };
    improved |= truncate_tail(best, whole, test, &mut tries);

    let groups = editable_groups(best);

    for group in groups.into_iter().rev() {
        if tries >= STRATEGY_TRIES || group.end > best.len() {
            break;
        }
        improved |= truncate_tail(best, group, test, &mut tries);
    }

    improved
}

#[allow(clippy::indexing_slicing)]
fn tail_candidate<T>(gen: &Gen<T>, group: Group, keep: usize) -> Vec<i64> {
    let mut replies = gen.replies().to_vec();

    for index in (group.start + keep)..group.end {
        replies[index] = gen.requests()[index].min();
    }

    replies
}

/// Finds the shortest kept prefix of `group` that still passes.
fn truncate_tail<T, F>(best: &mut Gen<T>, group: Group, test: &F, tries: &mut usize) -> bool
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let len = group.len();
    if len == 0 {
        return false;
    }

    let mut lo = 0;
    let mut hi = len;
    let mut found: Option<Gen<T>> = None;

    // probe the empty prefix before bisecting
    let mut keep = 0;

    loop {
        if *tries >= STRATEGY_TRIES {
            break;
        }
        *tries += 1;

        match try_edit(best, &tail_candidate(best, group, keep), test) {
            Some(candidate) => {
                hi = keep;
                found = Some(candidate);
            }
            None => lo = keep + 1,
        }

        if lo >= hi {
            break;
        }

        keep = lo + (hi - lo) / 2;
    }

    match found {
        Some(candidate) => {
            *best = candidate;
            true
        }
        None => false,
    }
}

/// Replaces options — call groups led by a non-default boolean-like pick —
/// with their default, removing the optional element.
#[allow(clippy::indexing_slicing)]
fn shrink_options<T, F>(best: &mut Gen<T>, test: &F) -> bool
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut improved = false;
    let mut tries = 0;

    'scan: loop {
        let groups: Vec<Group> = best.groups().into_iter().filter(|g| g.call).collect();

        for group in groups {
            if tries >= STRATEGY_TRIES {
                break 'scan;
            }

            let req = &best.requests()[group.start];

            if req.size() != 2 || best.replies()[group.start] == req.default() {
                continue;
            }
            tries += 1;

            let mut replies = best.replies().to_vec();
            replies.splice(group.start..group.end, [req.default()]);

            if let Some(candidate) = try_edit(best, &replies, test) {
                *best = candidate;
                improved = true;
                continue 'scan;
            }
        }

        break;
    }

    improved
}

/// Lowers individual picks toward their minimum, in trace order.
#[allow(clippy::indexing_slicing)]
fn shrink_picks<T, F>(best: &mut Gen<T>, test: &F) -> bool
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut improved = false;
    let mut tries = 0;
    let mut index = 0;

    while index < best.len() && tries < STRATEGY_TRIES {
        let target = best.requests()[index].min();

        if best.replies()[index] > target {
            if let Some(candidate) = shrink_pick_toward(best, index, target, test, &mut tries) {
                *best = candidate;
                improved = true;
            }
        }

        index += 1;
    }

    improved
}

#[allow(clippy::indexing_slicing)]
fn probe_pick<T, F>(gen: &Gen<T>, index: usize, value: i64, test: &F) -> Option<Gen<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut replies = gen.replies().to_vec();
    replies[index] = value;
    try_edit(gen, &replies, test)
}

/// Bisects one pick between `target` and its current reply, keeping the
/// lowest value that still passes.
#[allow(clippy::indexing_slicing)]
fn shrink_pick_toward<T, F>(
    gen: &Gen<T>,
    index: usize,
    target: i64,
    test: &F,
    tries: &mut usize,
) -> Option<Gen<T>>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let current = gen.replies()[index];

    if target >= current {
        return None;
    }

    *tries += 1;
    if let Some(candidate) = probe_pick(gen, index, target, test) {
        return Some(candidate);
    }

    let mut lo = target; // known to fail
    let mut hi = current; // known to pass
    let mut found = None;

    while hi - lo > 1 && *tries < STRATEGY_TRIES {
        *tries += 1;
        let mid = lo + (hi - lo) / 2;

        match probe_pick(gen, index, mid, test) {
            Some(candidate) => {
                hi = mid;
                found = Some(candidate);
            }
            None => lo = mid,
        }
    }

    found
}
