//! # nsmount-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the nsmount workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and knows nothing about system calls. The ownership
//! triple and the mount-point configuration live here so that callers can
//! build and validate them without pulling in the Linux primitives.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
