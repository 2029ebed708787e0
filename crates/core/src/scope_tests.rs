// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn dir_scope_key_prefixes() {
    assert_eq!(dir_scope_key("/home/u/proj"), "dir:/home/u/proj");
}

#[parameterized(
    global = { "global", ScopeKind::Global },
    repo = { "/home/u/proj", ScopeKind::Repo },
    home_repo = { "~/proj", ScopeKind::Repo },
    dir = { "dir:/home/u/proj/sub", ScopeKind::Dir },
    project_type = { "rust", ScopeKind::ProjectType },
    node_tag = { "node", ScopeKind::ProjectType },
)]
fn scope_kind_classification(key: &str, expected: ScopeKind) {
    assert_eq!(ScopeKind::of(key), expected);
}

#[test]
fn dir_key_never_classifies_as_repo() {
    let key = dir_scope_key("/home/u/proj");
    assert_eq!(ScopeKind::of(&key), ScopeKind::Dir);
}
