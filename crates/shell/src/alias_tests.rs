// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn aliases(pairs: &[(&str, &str)]) -> AliasMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn expands_first_token() {
    let map = aliases(&[("gs", "git status")]);
    assert_eq!(expand("gs", &map, 5), "git status");
    assert_eq!(expand("gs --short", &map, 5), "git status --short");
}

#[test]
fn no_alias_is_identity() {
    let map = aliases(&[("gs", "git status")]);
    assert_eq!(expand("ls -la", &map, 5), "ls -la");
    assert_eq!(expand("ls -la", &AliasMap::new(), 5), "ls -la");
}

#[test]
fn chained_expansion_bounded_by_depth() {
    let map = aliases(&[("a", "b"), ("b", "c"), ("c", "d one"), ("d", "echo")]);
    assert_eq!(expand("a", &map, 5), "echo one");
    // Depth 2 stops after expanding a -> b -> c.
    assert_eq!(expand("a", &map, 2), "c");
}

#[test]
fn cycle_stops_silently() {
    let map = aliases(&[("x", "y"), ("y", "x")]);
    // x -> y -> x, then x repeats and expansion stops.
    assert_eq!(expand("x", &map, 5), "x");
}

#[test]
fn self_alias_stops_after_one_round() {
    let map = aliases(&[("ls", "ls --color=auto")]);
    assert_eq!(expand("ls /tmp", &map, 5), "ls --color=auto /tmp");
}

#[test]
fn middle_tokens_never_expanded() {
    let map = aliases(&[("gs", "git status")]);
    assert_eq!(expand("echo gs", &map, 5), "echo gs");
}
