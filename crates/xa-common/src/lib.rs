//! Shared runtime support for the extended API crates.

pub mod logging;
