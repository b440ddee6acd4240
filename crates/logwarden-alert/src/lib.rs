//! Stateful alert evaluation over the log store.
//!
//! The [`engine::Evaluator`] runs one tick at a time: it loads every
//! enabled alert, classifies its cooldown state, and dispatches on the
//! alert type — any_match alerts look for the first qualifying record
//! past the cursor, velocity alerts count qualifying records in a
//! trailing window. Confirmed triggers are fanned out through the
//! notifier and recorded as immutable history. The [`scheduler::Scheduler`]
//! owns the single process-wide ticker.

pub mod clock;
pub mod cooldown;
pub mod engine;
pub mod scheduler;


pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{classify, CooldownState};
pub use engine::Evaluator;
pub use scheduler::Scheduler;
