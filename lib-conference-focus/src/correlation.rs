//! Correlation Table: associates an outgoing COLIBRI request id with the
//! room and ordered endpoint list it was allocating channels for.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEntry {
  pub room: String,
  pub nicknames: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CorrelationTable {
  entries: HashMap<String, CorrelationEntry>,
}

impl CorrelationTable {
  pub fn new() -> CorrelationTable {
    CorrelationTable::default()
  }

  pub fn insert(&mut self, request_id: impl Into<String>, room: impl Into<String>, nicknames: Vec<String>) {
    self.entries.insert(
      request_id.into(),
      CorrelationEntry {
        room: room.into(),
        nicknames,
      },
    );
  }

  /// Removes and returns the entry for a request id, if any. A later reply
  /// for a removed or never-installed id is stale and should be ignored.
  pub fn take(&mut self, request_id: &str) -> Option<CorrelationEntry> {
    self.entries.remove(request_id)
  }

  /// Drops every entry belonging to a room, called on room destruction.
  pub fn clear_room(&mut self, room: &str) {
    self.entries.retain(|_, entry| entry.room != room);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn take_removes_and_returns_the_entry() {
    let mut table = CorrelationTable::new();
    table.insert("req1", "room1", vec!["a".into(), "b".into()]);
    let entry = table.take("req1").unwrap();
    assert_eq!(entry.room, "room1");
    assert_eq!(entry.nicknames, vec!["a".to_string(), "b".to_string()]);
    assert!(table.take("req1").is_none());
  }

  #[test]
  fn take_on_an_unknown_id_is_none() {
    let mut table = CorrelationTable::new();
    assert!(table.take("missing").is_none());
  }

  #[test]
  fn clear_room_drops_only_that_rooms_entries() {
    let mut table = CorrelationTable::new();
    table.insert("req1", "room1", vec!["a".into()]);
    table.insert("req2", "room2", vec!["b".into()]);
    table.clear_room("room1");
    assert!(table.take("req1").is_none());
    assert!(table.take("req2").is_some());
  }
}
