//! Shared glue for the challenger workspace.
//!
//! This crate is intentionally lightweight so that every other crate can
//! depend on it without pulling in heavy transitive costs.
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`report`]: the `>> MOTIVE [action]` runtime status line

pub mod observability;
pub mod report;
