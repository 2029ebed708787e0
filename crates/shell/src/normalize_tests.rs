// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn norm(raw: &str) -> NormalizedCommand {
    prenormalize(raw, &AliasMap::new(), &NormalizeOptions::default())
}

use crate::alias::AliasMap;

#[parameterized(
    plain = { "git status", "git status" },
    whitespace = { "  git   status  ", "git status" },
    verb_lowercased = { "GIT Status", "git Status" },
    number = { "sleep 30", "sleep <NUM>" },
    flag_untouched = { "ls -la", "ls -la" },
    long_flag_untouched = { "cargo build --jobs=4", "cargo build --jobs=4" },
    abs_path = { "cat /etc/hosts", "cat <PATH>" },
    rel_path = { "cat ./notes.txt", "cat <PATH>" },
    home_path = { "cat ~/notes.txt", "cat <PATH>" },
    url = { "curl https://example.com/x", "curl <URL>" },
    http_url = { "curl http://localhost:8080", "curl <URL>" },
    uuid = { "kill-session 550e8400-e29b-41d4-a716-446655440000", "kill-session <UUID>" },
    windows_path = { "type C:\\temp\\x.txt", "type <PATH>" },
)]
fn normalization_cases(raw: &str, expected: &str) {
    assert_eq!(norm(raw).cmd_norm, expected);
}

#[test]
fn pipeline_with_placeholders() {
    let n = norm("cat /etc/hosts | grep 550e8400-e29b-41d4-a716-446655440000");
    assert_eq!(n.cmd_norm, "cat <PATH> | grep <UUID>");
    assert_eq!(n.segments.len(), 2);
    assert_eq!(n.segments[0].text, "cat <PATH>");
    assert_eq!(n.segments[0].op_following, Operator::Pipe);
    assert_eq!(n.segments[1].text, "grep <UUID>");
    assert_eq!(n.segments[1].op_following, Operator::None);
    for tag in ["shell", "file", "search"] {
        assert!(n.tags.iter().any(|t| t == tag), "missing tag {tag}");
    }
}

#[test]
fn template_id_is_sha256_of_cmd_norm() {
    let n = norm("git status");
    assert_eq!(n.template_id, template_id_of("git status"));
    assert_eq!(n.template_id.as_str().len(), 64);
    assert!(n
        .template_id
        .as_str()
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    // Different normalized commands hash to different templates.
    assert_ne!(n.template_id, template_id_of("git push"));
}

#[test]
fn segment_template_ids_match_segment_text() {
    let n = norm("make && make test");
    assert_eq!(n.segments[0].template_id, template_id_of("make"));
    assert_eq!(n.segments[1].template_id, template_id_of("make test"));
}

#[test]
fn truncation_sets_flag() {
    let opts = NormalizeOptions {
        max_bytes: 8,
        ..Default::default()
    };
    let n = prenormalize("echo aaaaaaaaaaaa", &AliasMap::new(), &opts);
    assert!(n.truncated);
    assert_eq!(n.cmd_norm, "echo aaa");
}

#[test]
fn truncation_respects_char_boundary() {
    let opts = NormalizeOptions {
        max_bytes: 6,
        ..Default::default()
    };
    // "héllo" is 6 bytes; cutting at 6 inside a later char must not panic.
    let n = prenormalize("héllo wörld", &AliasMap::new(), &opts);
    assert!(n.truncated);
}

#[test]
fn alias_expansion_applies_before_split() {
    let mut aliases = AliasMap::new();
    aliases.insert("gs".to_string(), "git status".to_string());
    let n = prenormalize("gs", &aliases, &NormalizeOptions::default());
    assert_eq!(n.cmd_norm, "git status");
}

#[test]
fn placeholders_survive_renormalization() {
    let n = norm("cat <PATH>");
    assert_eq!(n.cmd_norm, "cat <PATH>");
}

#[test]
fn quoted_operator_stays_one_segment() {
    let n = norm("echo 'a|b'");
    assert_eq!(n.segments.len(), 1);
    assert_eq!(n.cmd_norm, "echo 'a|b'");
}

#[test]
fn empty_input() {
    let n = norm("");
    assert_eq!(n.cmd_norm, "");
    assert!(n.segments.is_empty());
    assert!(n.tags.is_empty());
}

#[test]
fn simple_normalize_collapses_whitespace_only() {
    assert_eq!(simple_normalize("  Git   Status "), "Git Status");
}

#[parameterized(
    simple = { "git status" },
    pipeline = { "cat /etc/hosts | grep foo && echo 1" },
    quoted = { "echo 'a|b' \"c;d\"" },
    flags = { "rsync -avz --delete src/ dst/" },
    placeholders = { "curl <URL> | jq <PATH>" },
    verb_path = { "/usr/local/bin/tool --run" },
)]
fn two_pass_convergence(raw: &str) {
    let once = norm(raw);
    let twice = norm(&once.cmd_norm);
    assert_eq!(twice.cmd_norm, once.cmd_norm);
    assert_eq!(twice.template_id, once.template_id);
}

proptest! {
    #[test]
    fn convergence_holds_for_arbitrary_input(raw in "[ -~]{0,120}") {
        let once = norm(&raw);
        let twice = norm(&once.cmd_norm);
        prop_assert_eq!(twice.cmd_norm, once.cmd_norm);
    }

    #[test]
    fn template_purity(raw in "[ -~]{0,120}") {
        let once = norm(&raw);
        prop_assert_eq!(template_id_of(&once.cmd_norm), once.template_id);
    }
}
