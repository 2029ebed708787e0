// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! clai daemon library
//!
//! Exposes the IPC protocol types for use by the CLI shim, plus the
//! lifecycle pieces the integration tests drive in-process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;

pub use protocol::{
    HistoryItemWire, Request, Response, SuggestionWire, DEFAULT_TIMEOUT, E_INVALID_REQUEST,
    E_NO_FEEDBACK_STORE, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
