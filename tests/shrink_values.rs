mod common;

use common::{short_list_of, short_string};
use pick_tree::{shrink, Gen, PickRequest, Script};
use test_log::test;

#[test]
fn shrinks_an_integer_to_the_predicate_boundary() {
    let die = Script::of("die", |pick| {
        pick.pick(&PickRequest::new(1, 6).expect("valid range"))
    });

    let seed = Gen::must_build(&die, &[6]);
    let shrunk = shrink(&seed, |&n| n >= 3);

    assert_eq!(3, shrunk.val());
    assert_eq!(&[3], shrunk.replies());
}

#[test]
fn shrinks_a_string_to_its_prefix() {
    // "abc"
    let seed = Gen::must_build(&short_string(), &[1, 97, 1, 98, 1, 99, 0]);
    assert_eq!("abc", seed.val());

    let shrunk = shrink(&seed, |s| s.starts_with('a'));

    assert_eq!("a", shrunk.val());
}

#[test]
fn shrinks_a_list_by_removing_elements() {
    let list = short_list_of(short_string());

    // ["a", "b", "c"]
    let seed = Gen::must_build(
        &list,
        &[1, 1, 97, 0, 1, 1, 98, 0, 1, 1, 99, 0, 0],
    );
    assert_eq!(vec!["a", "b", "c"], seed.val());

    let shrunk = shrink(&seed, |items| items.iter().any(|s| s == "a"));

    assert_eq!(vec!["a"], shrunk.val());
}

#[test]
fn shrinks_an_option_to_its_default() {
    let list = short_list_of(short_string());

    // ["b"]; the predicate only cares about the list length
    let seed = Gen::must_build(&list, &[1, 1, 98, 0, 0]);
    let shrunk = shrink(&seed, |items| items.len() == 1);

    // the element stays, but collapses to the minimal string
    assert_eq!(vec![""], shrunk.val());
}

#[test]
fn shrunk_traces_never_grow() {
    let list = short_list_of(short_string());

    let seed = Gen::must_build(
        &list,
        &[1, 1, 120, 1, 121, 0, 1, 1, 122, 0, 0],
    );
    let shrunk = shrink(&seed, |items| !items.is_empty());

    assert!(shrunk.len() <= seed.len());
    assert!(!shrunk.val().is_empty());
    assert_eq!(vec![""], shrunk.val());
}

#[test]
fn shrinking_is_a_fixpoint() {
    let list = short_list_of(short_string());

    let seed = Gen::must_build(
        &list,
        &[1, 1, 97, 1, 98, 0, 1, 1, 99, 0, 0],
    );
    let test = |items: &Vec<String>| items.iter().any(|s| s.contains('c'));

    let once = shrink(&seed, test);
    let twice = shrink(&once, test);

    assert_eq!(once.val(), twice.val());
    assert_eq!(once.replies(), twice.replies());
}

#[test]
fn passing_seed_is_returned_when_nothing_is_smaller() {
    let seed = Gen::must_build(&short_string(), &[0]);
    assert_eq!("", seed.val());

    let shrunk = shrink(&seed, |s| s.is_empty());

    assert_eq!("", shrunk.val());
    assert_eq!(&[0], shrunk.replies());
}
