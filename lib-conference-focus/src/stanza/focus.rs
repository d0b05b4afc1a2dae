//! Focus-to-room builders: the groupchat status message that tells clients
//! whether the room is currently relayed through the bridge (`relay`) or
//! still peer-to-peer (`p2p`), per §4.4's `pre_join` and §4.4.2's teardown.

use anyhow::{Context, Result};
use jid::Jid;
use jitsi_xmpp_parsers::ns::JITSI_FOCUS;
use xmpp_parsers::{
  message::{Message, MessageType},
  Element,
};

use crate::util::generate_id;

/// Whether a room is currently bridged through the media bridge, or left to
/// the clients to handle peer-to-peer (below `focus_min_participants`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomMode {
  Relay,
  P2p,
}

impl RoomMode {
  fn as_str(self) -> &'static str {
    match self {
      RoomMode::Relay => "relay",
      RoomMode::P2p => "p2p",
    }
  }
}

fn mode_element(mode: RoomMode) -> Element {
  Element::builder("conference-mode", JITSI_FOCUS)
    .attr("mode", mode.as_str())
    .build()
}

fn message(to: Jid, mode: RoomMode) -> Message {
  Message {
    from: None,
    to: Some(to),
    id: Some(generate_id()),
    type_: MessageType::Groupchat,
    bodies: Default::default(),
    subjects: Default::default(),
    thread: None,
    payloads: vec![mode_element(mode)],
  }
}

/// Broadcasts the room's mode to the whole room (addressed to the bare MUC
/// jid, as a groupchat message).
pub fn build_broadcast(room_id: &str, mode: RoomMode) -> Result<Element> {
  let to: Jid = room_id.parse().context("room id is not a valid bare jid")?;
  Ok(message(to, mode).into())
}

/// Unicasts the room's mode to a single joiner (addressed to their MUC
/// occupant jid), sent alongside the broadcast on `pre_join` so the joiner
/// doesn't have to wait for their own presence to round-trip.
pub fn build_unicast(room_id: &str, nick: &str, mode: RoomMode) -> Result<Element> {
  let to: Jid = format!("{}/{}", room_id, nick)
    .parse()
    .context("room id is not a valid bare jid")?;
  Ok(message(to, mode).into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn broadcast_is_addressed_to_the_bare_room_jid() {
    let element = build_broadcast("room1@conference.example.org", RoomMode::Relay).unwrap();
    assert_eq!(element.attr("to"), Some("room1@conference.example.org"));
    assert_eq!(element.attr("type"), Some("groupchat"));
  }

  #[test]
  fn unicast_is_addressed_to_the_joiners_occupant_jid() {
    let element = build_unicast("room1@conference.example.org", "alice", RoomMode::P2p).unwrap();
    assert_eq!(element.attr("to"), Some("room1@conference.example.org/alice"));
  }
}
