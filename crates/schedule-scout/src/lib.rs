// Copyright 2026 Schedule Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule Scout — acquire a dynamically rendered schedule from a web page.
//!
//! Responses observed while the page loads are scored by the document's own
//! update stamp; when none qualifies, the live page is searched instead.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod renderer;
pub mod schedule;
pub mod scrape;
