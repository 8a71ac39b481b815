//! Core types and trait definitions for the Casebook record store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod activity;
pub mod actor;
pub mod attrs;
pub mod compose;
pub mod error;
pub mod incident;
pub mod link;
pub mod organization;
pub mod profile;
pub mod report;
pub mod store;

pub use error::{Error, FieldError, FieldErrors, Result};
