//! Utility modules for the harness.

pub mod path;
