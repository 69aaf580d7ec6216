//! Shared test framework for dual-bench
//!
//! Builds throwaway workspaces (catalog, fake environments, config file) and
//! runs the `dual-bench` binary inside them.

pub mod framework;

#[allow(unused_imports)]
pub use framework::*;
