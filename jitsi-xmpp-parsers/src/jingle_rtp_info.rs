use crate::ns::{JINGLE_RTP_INFO, MEDIASTREAM};

/// Annotates one msid's current mute state. Used both as a selector inside a
/// `mute`/`unmute` session-info payload and, unwrapped, as a MUC presence
/// extension advertising current media state.
generate_element!(
  Mediastream, "mediastream", MEDIASTREAM,
  attributes: [
    /// The msid this annotation concerns.
    msid: Required<String> = "msid",

    /// `"true"` (live), `"muted"`, or absent (not applicable to this medium).
    audio: Option<String> = "audio",

    /// `"true"` (live), `"muted"`, or absent (not applicable to this medium).
    video: Option<String> = "video",
  ]
);

impl Mediastream {
  pub fn new(msid: impl Into<String>) -> Mediastream {
    Mediastream {
      msid: msid.into(),
      audio: None,
      video: None,
    }
  }

  pub fn with_audio(mut self, state: impl Into<String>) -> Mediastream {
    self.audio = Some(state.into());
    self
  }

  pub fn with_video(mut self, state: impl Into<String>) -> Mediastream {
    self.video = Some(state.into());
    self
  }
}

generate_attribute!(
  /// The medium a mute/unmute session-info applies to, when not restricted
  /// to specific msids via a `mediastream` child.
  Name, "name", {
    Audio => "audio",
    Video => "video",
  }
);

generate_element!(
  /// Session-info payload muting one or more of the sender's streams.
  Mute, "mute", JINGLE_RTP_INFO,
  attributes: [
    name: Option<Name> = "name",
  ],
  children: [
    mediastreams: Vec<Mediastream> = ("mediastream", MEDIASTREAM) => Mediastream,
  ]
);

generate_element!(
  /// Session-info payload unmuting one or more of the sender's streams.
  Unmute, "unmute", JINGLE_RTP_INFO,
  attributes: [
    name: Option<Name> = "name",
  ],
  children: [
    mediastreams: Vec<Mediastream> = ("mediastream", MEDIASTREAM) => Mediastream,
  ]
);
