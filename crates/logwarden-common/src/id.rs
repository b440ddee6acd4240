//! Process-wide snowflake ids for alerts, history rows, and channels.
//!
//! Log records are the exception: they keep the store's integer rowid
//! because the any-match cursor needs a monotonic integer to compare.

use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, OnceLock};

fn bucket() -> &'static Mutex<SnowflakeIdBucket> {
    static BUCKET: OnceLock<Mutex<SnowflakeIdBucket>> = OnceLock::new();
    BUCKET.get_or_init(|| Mutex::new(SnowflakeIdBucket::new(1, 1)))
}

/// Point the generator at this process's coordinates (each 0-31).
///
/// Single-node deployments can skip this and keep the `(1, 1)` default;
/// the server calls it with the values from its config file.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = bucket().lock().unwrap_or_else(|p| p.into_inner());
    *gen = SnowflakeIdBucket::new(machine_id, node_id);
}

/// Next unique id, rendered as a string for TEXT primary key columns.
pub fn next_id() -> String {
    bucket()
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .get_id()
        .to_string()
}
