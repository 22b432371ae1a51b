// ABOUTME: Library root for rollover - exposes the upgrade machinery for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod adapter;
pub mod diagnostics;
pub mod error;
pub mod notify;
pub mod output;
pub mod runtime;
pub mod template;
pub mod types;
pub mod upgrade;
