use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Object store key for an upload: `{owner_id}/{millis}.{extension}`.
///
/// The extension is whatever follows the last `.` of the original name. A name
/// without a `.` yields an empty extension and the key ends in a bare `.`.
pub fn storage_key(owner_id: &str, millis: i64, file_name: &str) -> String {
    format!("{owner_id}/{millis}.{}", extension_of(file_name))
}

pub fn extension_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
}

/// Millisecond timestamps that never repeat within a process.
#[derive(Debug, Default)]
pub struct KeyClock {
    last: AtomicI64,
}

impl KeyClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock milliseconds, bumped past the previous value when the clock
    /// has not advanced (or went backwards).
    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
