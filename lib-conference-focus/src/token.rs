//! Reversible encoding between a room's bare JID and the address this service
//! presents to the bridge as the `from` of a COLIBRI request.
//!
//! The bridge only round-trips whatever token it is given back to us in its
//! reply's `to`, so the encoding just has to survive that trip; hex-encoding
//! the node keeps the result a valid JID node itself.

use anyhow::{anyhow, Context, Result};
use jid::BareJid;

pub fn encode(room: &BareJid) -> String {
  let node = room.node.as_deref().unwrap_or("");
  format!("{}/{}", hex::encode(node.as_bytes()), room.domain)
}

pub fn decode(token: &str) -> Result<BareJid> {
  let (hex_node, domain) = token
    .split_once('/')
    .ok_or_else(|| anyhow!("malformed room token: {}", token))?;
  let node_bytes = hex::decode(hex_node).context("room token node is not valid hex")?;
  let node = String::from_utf8(node_bytes).context("room token node is not valid utf-8")?;
  format!("{}@{}", node, domain)
    .parse()
    .context("decoded room token is not a valid bare jid")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_a_room_jid() {
    let room: BareJid = "conferenceroom@conference.example.org".parse().unwrap();
    let token = encode(&room);
    assert_eq!(decode(&token).unwrap(), room);
  }

  #[test]
  fn rejects_a_token_without_a_separator() {
    assert!(decode("deadbeef").is_err());
  }
}
