// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod effort;

pub use activity::{ActivityRecord, ActivitySummary};
pub use effort::{ActivityPower, PowerEffort};
