// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local activity storage.

pub mod store;

pub use store::{ActivityStore, StoreIndex};
