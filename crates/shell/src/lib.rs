// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! clai-shell: command normalization.
//!
//! Turns a raw command line into a normalized template: quote-aware pipeline
//! split, placeholder substitution, tag derivation, and the content-addressed
//! template id. Normalization is total (no error paths) and convergent:
//! normalizing an already-normalized command is the identity.

pub mod alias;
pub mod ansi;
pub mod normalize;
pub mod risk;
pub mod split;
pub mod tags;

pub use alias::AliasMap;
pub use ansi::strip_ansi;
pub use normalize::{
    prenormalize, simple_normalize, template_id_of, NormalizeOptions, NormalizedCommand,
    NormalizedSegment,
};
pub use risk::is_dangerous;
pub use split::{split_segments, Operator, Segment};
