// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI provider adapters.
//!
//! Each provider wraps a locally installed CLI (claude, openai, gemini)
//! behind one capability set: text-to-command, next-step, and diagnosis.
//! Providers are looked up in a registry; `auto` takes the first available
//! in priority order. Provider failures are logged and surface as empty
//! suggestion lists, never as crashes.

pub mod claude;
pub mod fake;
pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::subprocess::SubprocessError;

/// Context handed to a provider call.
#[derive(Debug, Clone, Default)]
pub struct AiRequest {
    /// Natural-language prompt, last command, or failing command depending
    /// on the call.
    pub input: String,
    /// Captured stderr/exit detail for diagnosis.
    pub detail: String,
    pub cwd: String,
    pub shell: String,
    /// A few recent commands for context.
    pub recent: Vec<String>,
}

/// One provider suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSuggestion {
    pub text: String,
    pub description: String,
}

/// Provider call result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiResponse {
    pub suggestions: Vec<AiSuggestion>,
    pub explanation: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not installed: {0}")]
    NotInstalled(&'static str),

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    #[error("provider returned no usable output")]
    EmptyOutput,
}

/// The provider capability set.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap availability probe (PATH lookup); no subprocess spawned.
    fn available(&self) -> bool;

    async fn text_to_command(&self, request: &AiRequest) -> Result<AiResponse, ProviderError>;

    async fn next_step(&self, request: &AiRequest) -> Result<AiResponse, ProviderError>;

    async fn diagnose(&self, request: &AiRequest) -> Result<AiResponse, ProviderError>;
}

/// Name-keyed registry with a priority order for `auto`.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn AiProvider>>,
}

impl ProviderRegistry {
    /// The standard registry; priority order is claude, openai, gemini.
    pub fn standard(timeout: Duration) -> Self {
        Self {
            providers: vec![
                Arc::new(claude::ClaudeCli::new(timeout)),
                Arc::new(openai::OpenAiCli::new(timeout)),
                Arc::new(gemini::GeminiCli::new(timeout)),
            ],
        }
    }

    /// Registry over explicit providers (tests).
    pub fn with_providers(providers: Vec<Arc<dyn AiProvider>>) -> Self {
        Self { providers }
    }

    /// Resolve a provider by name, or the first available for `auto` /
    /// empty. Returns `None` when nothing is installed.
    pub fn resolve(&self, preferred: &str) -> Option<Arc<dyn AiProvider>> {
        if preferred.is_empty() || preferred == "auto" {
            return self.providers.iter().find(|p| p.available()).cloned();
        }
        self.providers
            .iter()
            .find(|p| p.name() == preferred && p.available())
            .cloned()
    }

    /// Names of installed providers, in priority order.
    pub fn available_names(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|p| p.available())
            .map(|p| p.name())
            .collect()
    }
}

/// Shared prompt templates. Providers receive one flattened prompt string;
/// the instruction keeps answers machine-parseable (first line = command).
pub(crate) fn text_to_command_prompt(request: &AiRequest) -> String {
    format!(
        "Convert this description into a single {} command. \
         Reply with the command on the first line, then a one-line explanation.\n\
         Working directory: {}\n\
         Recent commands: {}\n\
         Description: {}",
        shell_name(request),
        request.cwd,
        request.recent.join("; "),
        request.input,
    )
}

pub(crate) fn next_step_prompt(request: &AiRequest) -> String {
    format!(
        "Suggest the most likely next {} command after running: {}\n\
         Working directory: {}\n\
         Recent commands: {}\n\
         Reply with the command on the first line, then a one-line explanation.",
        shell_name(request),
        request.input,
        request.cwd,
        request.recent.join("; "),
    )
}

pub(crate) fn diagnose_prompt(request: &AiRequest) -> String {
    format!(
        "This {} command failed: {}\n\
         Failure detail: {}\n\
         Working directory: {}\n\
         Reply with a corrected command on the first line, then a short explanation.",
        shell_name(request),
        request.input,
        request.detail,
        request.cwd,
    )
}

fn shell_name(request: &AiRequest) -> &str {
    if request.shell.is_empty() {
        "shell"
    } else {
        &request.shell
    }
}

/// Parse CLI output: the first plain line is the command, the rest is
/// explanation. Markdown fences and shell prompts are stripped.
pub(crate) fn parse_response(provider: &'static str, raw: &str) -> Result<AiResponse, ProviderError> {
    let mut command: Option<String> = None;
    let mut explanation: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        let line = line.strip_prefix("$ ").unwrap_or(line);
        if command.is_none() {
            command = Some(line.to_string());
        } else {
            explanation.push(line);
        }
    }

    let Some(text) = command else {
        warn!(provider, "provider output had no command line");
        return Err(ProviderError::EmptyOutput);
    };

    let description = explanation.first().map(|s| s.to_string()).unwrap_or_default();
    Ok(AiResponse {
        suggestions: vec![AiSuggestion { text, description }],
        explanation: if explanation.is_empty() {
            None
        } else {
            Some(explanation.join(" "))
        },
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
