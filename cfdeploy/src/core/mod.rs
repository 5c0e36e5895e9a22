//! Deterministic, pure logic for deployment attributes and descriptors.
//!
//! Core modules must be free of I/O side effects. Facts from the director are
//! passed in as plain data so every check and transformation is reproducible
//! in tests.

pub mod attributes;
pub mod defaults;
pub mod descriptor;
pub mod sizing;
pub mod store;
pub mod types;
pub mod validator;
