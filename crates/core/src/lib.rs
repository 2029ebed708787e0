// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! clai-core: Core library for the clai command intelligence system

pub mod clock;
pub mod config;
pub mod dismissal;
pub mod event;
pub mod feedback;
pub mod id;
pub mod rank;
pub mod scope;
pub mod search;
pub mod suggest;
pub mod time_fmt;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::Config;
pub use dismissal::{DismissalEvent, DismissalState};
pub use event::{ClientInfo, CommandEvent, GitContext};
pub use feedback::FeedbackAction;
pub use id::{CommandId, IdGen, SequentialIdGen, SessionId, ShortId, TemplateId, UuidIdGen};
pub use rank::{Feature, RankWeights, FEATURE_COUNT};
pub use scope::{dir_scope_key, ScopeKind, SCOPE_GLOBAL};
pub use search::SearchMode;
pub use suggest::{Reason, SuggestContext, Suggestion};
pub use time_fmt::{format_elapsed, format_elapsed_ms, parse_duration};
