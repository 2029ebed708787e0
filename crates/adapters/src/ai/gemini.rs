// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gemini CLI adapter.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{
    diagnose_prompt, next_step_prompt, parse_response, text_to_command_prompt, AiProvider,
    AiRequest, AiResponse, ProviderError,
};
use crate::subprocess::{binary_on_path, run_with_limits};

const BINARY: &str = "gemini";
const MAX_OUTPUT: usize = 64 * 1024;

pub struct GeminiCli {
    timeout: Duration,
}

impl GeminiCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn ask(&self, prompt: String) -> Result<AiResponse, ProviderError> {
        if !self.available() {
            return Err(ProviderError::NotInstalled(BINARY));
        }
        let mut cmd = Command::new(BINARY);
        cmd.args(["-p", &prompt]);
        let output = run_with_limits(cmd, self.timeout, MAX_OUTPUT, "gemini cli").await?;
        parse_response(BINARY, &output)
    }
}

#[async_trait]
impl AiProvider for GeminiCli {
    fn name(&self) -> &'static str {
        BINARY
    }

    fn available(&self) -> bool {
        binary_on_path(BINARY)
    }

    async fn text_to_command(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.ask(text_to_command_prompt(request)).await
    }

    async fn next_step(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.ask(next_step_prompt(request)).await
    }

    async fn diagnose(&self, request: &AiRequest) -> Result<AiResponse, ProviderError> {
        self.ask(diagnose_prompt(request)).await
    }
}
