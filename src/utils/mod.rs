// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Utility modules
//!
//! Terminal helpers for the artiflow CLI.

pub mod spinner;

pub use spinner::*;
