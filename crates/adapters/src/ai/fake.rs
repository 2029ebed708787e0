// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted provider for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AiProvider, AiRequest, AiResponse, AiSuggestion, ProviderError};

/// A provider that returns canned responses and records calls.
pub struct FakeProvider {
    name: &'static str,
    available: bool,
    response: Mutex<Option<AiResponse>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(name: &'static str, available: bool) -> Self {
        Self {
            name,
            available,
            response: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_command(self, text: &str) -> Self {
        *self.response.lock() = Some(AiResponse {
            suggestions: vec![AiSuggestion {
                text: text.to_string(),
                description: String::new(),
            }],
            explanation: None,
        });
        self
    }

    fn respond(&self, call: &str, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.calls.lock().push(format!("{}:{}", call, request.input));
        self.response
            .lock()
            .clone()
            .ok_or(ProviderError::EmptyOutput)
    }
}

#[async_trait]
impl AiProvider for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn available(&self) -> bool {
        self.available
    }

    async fn text_to_command(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.respond("text_to_command", request)
    }

    async fn next_step(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.respond("next_step", request)
    }

    async fn diagnose(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.respond("diagnose", request)
    }
}
