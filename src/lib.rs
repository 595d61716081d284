// SPDX-License-Identifier: PMPL-1.0-or-later

//! attack-diag: diagnosability benchmarking for timed attack trees.
//!
//! Random attack trees are encoded as TAPAAL timed-arc Petri nets with a CTL
//! diagnosability query, verified one by one under a timeout, and the
//! verdicts are collected in a CSV table for summary reporting.
//!
//! PIPELINE:
//! 1. **Generate** (`tree`, `tapaal`, `generate`): seeded random trees to
//!    model/query file pairs.
//! 2. **Run** (`verify`): the external verifier over every pair, one
//!    terminal state per tree.
//! 3. **Summarize** (`results`, `report`): counts, timing statistics, charts.

pub mod config;
pub mod diagnostics;
pub mod generate;
pub mod report;
pub mod results;
pub mod tapaal;
pub mod tree;
pub mod types;
pub mod usecase;
pub mod verify;
