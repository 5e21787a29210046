//! Crate-level tests: scripted collaborators, sequence checks, and the
//! behavioural scenarios.

mod behaviour;
pub(crate) mod support;
