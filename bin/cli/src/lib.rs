//! Command-line front-end for headless-auth.
//!
//! Wires one [`AuthContext`](context::AuthContext) per (namespace, base URL)
//! over a file-backed credential store so sessions survive between runs.

pub mod config;
pub mod context;
pub mod error;
