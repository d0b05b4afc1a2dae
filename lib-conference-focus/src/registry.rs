//! Process-wide room registry: creates rooms on demand and drops them once
//! torn down.

use std::collections::HashMap;

use crate::room::Room;

/// Maps room identifiers (bare MUC JIDs, as strings) to their state.
#[derive(Debug, Default)]
pub struct RoomRegistry {
  rooms: HashMap<String, Room>,
}

impl RoomRegistry {
  pub fn new() -> RoomRegistry {
    RoomRegistry::default()
  }

  /// Returns the room for `id`, creating an empty one if this is its first
  /// mention.
  pub fn get_or_create(&mut self, id: &str) -> &mut Room {
    self.rooms.entry(id.to_owned()).or_insert_with(Room::new)
  }

  pub fn get(&self, id: &str) -> Option<&Room> {
    self.rooms.get(id)
  }

  pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
    self.rooms.get_mut(id)
  }

  /// Removes a torn-down room. Called once teardown has cleared its state,
  /// so there is nothing left worth keeping around for.
  pub fn remove(&mut self, id: &str) -> Option<Room> {
    self.rooms.remove(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.rooms.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.rooms.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rooms.is_empty()
  }

  /// Every tracked room id, snapshotted for the timeout/linger sweep so it
  /// can mutate individual rooms without holding a borrow of the whole map.
  pub fn ids(&self) -> Vec<String> {
    self.rooms.keys().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_or_create_creates_once_and_reuses_afterwards() {
    let mut registry = RoomRegistry::new();
    registry.get_or_create("room1@conference.example.org").bridge = Some("bridge1".into());
    assert_eq!(
      registry.get("room1@conference.example.org").unwrap().bridge,
      Some("bridge1".into())
    );
  }

  #[test]
  fn remove_drops_the_room() {
    let mut registry = RoomRegistry::new();
    registry.get_or_create("room1@conference.example.org");
    assert!(registry.remove("room1@conference.example.org").is_some());
    assert!(!registry.contains("room1@conference.example.org"));
  }
}
