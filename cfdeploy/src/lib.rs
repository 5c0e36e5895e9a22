//! Create, inspect, and change Cloud Foundry deployments through a BOSH
//! director.
//!
//! - **[`core`]**: attribute registry and store, size resolution, validation,
//!   and descriptor build/reconstruct. No I/O.
//! - **[`io`]**: config, director status, deploy execution, descriptor
//!   storage, manifest rendering, and operator prompts.
//!
//! The workflow modules ([`create`], [`show`], [`change`]) combine the two to
//! implement the CLI commands.

pub mod change;
pub mod core;
pub mod create;
pub mod deploy;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod show;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
