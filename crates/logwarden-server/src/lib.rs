//! Server wiring: configuration, channel seeding, and the binary entry
//! point that assembles store, dispatcher, evaluator, and scheduler.

pub mod config;
pub mod seed;
