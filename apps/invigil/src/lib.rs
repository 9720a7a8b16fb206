//! # invigil
//!
//! HTTP API, CLI, configuration and debounced persistence around
//! `invigil-core`. The binary in `main.rs` is a thin wrapper; integration
//! tests reach the router through this library.

pub mod api;
pub mod cli;
pub mod config;
pub mod persist;
