//! Shared data model for the logwarden workspace.
//!
//! Log records, alert configuration, trigger payloads, and per-channel
//! notification outcomes live here so that the query compiler, storage
//! layer, notification dispatcher, and evaluation engine agree on one
//! set of types.

pub mod id;
pub mod types;
