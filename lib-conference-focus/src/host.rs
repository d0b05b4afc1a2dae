//! The boundary between this crate and whatever hosts its XMPP connection.
//! The focus agent never opens a socket or serializes a stanza itself; it
//! hands fully-addressed elements to a [`Host`] and receives parsed elements
//! back from whatever is driving it.

use anyhow::Result;
use async_trait::async_trait;
use xmpp_parsers::Element;

/// Implemented by whatever owns the XMPP connection this focus agent rides
/// on. Mirrors the outbound half of the teacher's `StanzaFilter`/
/// `mpsc::Sender<Element>` pairing, generalised to a trait so the controller
/// can be driven by a real connection in production and by a recording
/// double in tests.
#[async_trait]
pub trait Host: Send + Sync {
  /// Sends one fully-addressed stanza (iq, presence, or message) out over
  /// the wire.
  async fn send(&self, stanza: Element) -> Result<()>;

  /// Called after room state changes a participant's authoritative `msids`
  /// map (session-accept, source-add/-remove, session-info mute/unmute),
  /// so the host can re-stamp that occupant's MUC presence with fresh
  /// `mediastream` annotations and broadcast it (§4.4.3). `mediastreams` is
  /// the complete, already-restamped element set computed by
  /// [`crate::presence::restamp_mediastreams`]; the focus itself does not
  /// own the rest of the presence (show, status, caps), which is why this
  /// is a hook back into the host rather than a stanza the focus sends
  /// directly. The default implementation does nothing, for hosts that
  /// don't care to be told (e.g. a host that polls presence itself).
  async fn republish_presence(&self, room: &str, nick: &str, mediastreams: Vec<Element>) -> Result<()> {
    let _ = (room, nick, mediastreams);
    Ok(())
  }
}

/// An in-memory [`Host`] that records every stanza it is given, for use in
/// controller tests.
#[derive(Default)]
pub struct RecordingHost {
  pub sent: tokio::sync::Mutex<Vec<Element>>,
  pub republished: tokio::sync::Mutex<Vec<(String, String, Vec<Element>)>>,
}

#[async_trait]
impl Host for RecordingHost {
  async fn send(&self, stanza: Element) -> Result<()> {
    self.sent.lock().await.push(stanza);
    Ok(())
  }

  async fn republish_presence(&self, room: &str, nick: &str, mediastreams: Vec<Element>) -> Result<()> {
    self
      .republished
      .lock()
      .await
      .push((room.to_owned(), nick.to_owned(), mediastreams));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn recording_host_keeps_every_stanza_in_order() {
    let host = RecordingHost::default();
    host.send(Element::builder("a", "ns").build()).await.unwrap();
    host.send(Element::builder("b", "ns").build()).await.unwrap();
    let sent = host.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].name(), "a");
    assert_eq!(sent[1].name(), "b");
  }
}
