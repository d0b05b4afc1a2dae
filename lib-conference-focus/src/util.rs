use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

pub(crate) fn generate_id() -> String {
  Uuid::new_v4().to_string()
}

/// Wall-clock seconds since the epoch, used for the pending-create and
/// linger timestamps stashed on `Room`. Clamped to 0 rather than propagated
/// as an error; a clock set before 1970 is not a case worth failing a turn
/// over.
pub(crate) fn now_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}
