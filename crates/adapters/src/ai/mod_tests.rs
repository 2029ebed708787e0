// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::fake::FakeProvider;
use super::*;

#[test]
fn parse_response_first_line_is_command() {
    let response = parse_response("test", "git push\nPushes the branch.\n").unwrap();
    assert_eq!(response.suggestions.len(), 1);
    assert_eq!(response.suggestions[0].text, "git push");
    assert_eq!(response.suggestions[0].description, "Pushes the branch.");
    assert_eq!(response.explanation.as_deref(), Some("Pushes the branch."));
}

#[test]
fn parse_response_strips_fences_and_prompts() {
    let raw = "```bash\n$ cargo test\n```\nRuns the tests.";
    let response = parse_response("test", raw).unwrap();
    assert_eq!(response.suggestions[0].text, "cargo test");
    assert_eq!(response.suggestions[0].description, "Runs the tests.");
}

#[test]
fn parse_response_empty_is_error() {
    assert!(matches!(
        parse_response("test", "\n```\n```\n"),
        Err(ProviderError::EmptyOutput)
    ));
}

#[test]
fn registry_auto_takes_first_available() {
    let registry = ProviderRegistry::with_providers(vec![
        Arc::new(FakeProvider::new("first", false)),
        Arc::new(FakeProvider::new("second", true)),
        Arc::new(FakeProvider::new("third", true)),
    ]);
    assert_eq!(registry.resolve("auto").unwrap().name(), "second");
    assert_eq!(registry.resolve("").unwrap().name(), "second");
}

#[test]
fn registry_by_name_requires_availability() {
    let registry = ProviderRegistry::with_providers(vec![
        Arc::new(FakeProvider::new("first", false)),
        Arc::new(FakeProvider::new("second", true)),
    ]);
    assert!(registry.resolve("first").is_none());
    assert_eq!(registry.resolve("second").unwrap().name(), "second");
    assert!(registry.resolve("unknown").is_none());
}

#[test]
fn registry_empty_when_nothing_installed() {
    let registry =
        ProviderRegistry::with_providers(vec![Arc::new(FakeProvider::new("only", false))]);
    assert!(registry.resolve("auto").is_none());
    assert!(registry.available_names().is_empty());
}

#[tokio::test]
async fn fake_provider_round_trip() {
    let provider = FakeProvider::new("fake", true).with_command("ls -la");
    let request = AiRequest {
        input: "list files".to_string(),
        ..Default::default()
    };
    let response = provider.text_to_command(&request).await.unwrap();
    assert_eq!(response.suggestions[0].text, "ls -la");
    assert_eq!(provider.calls.lock().as_slice(), ["text_to_command:list files"]);
}

#[test]
fn prompts_mention_context() {
    let request = AiRequest {
        input: "compress the logs".to_string(),
        detail: "exit 2".to_string(),
        cwd: "/var/log".to_string(),
        shell: "zsh".to_string(),
        recent: vec!["cd /var/log".to_string()],
    };
    let prompt = text_to_command_prompt(&request);
    assert!(prompt.contains("zsh"));
    assert!(prompt.contains("/var/log"));
    assert!(prompt.contains("compress the logs"));
    let prompt = diagnose_prompt(&request);
    assert!(prompt.contains("exit 2"));
}
