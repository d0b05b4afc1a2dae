//! Feature & Presence Surface: disco feature publishing, the capability
//! probe, and mediastream (msid/mute) presence stamping.

use std::collections::HashMap;

use jitsi_xmpp_parsers::{jingle_rtp_info::Mediastream, ns::MMUC};
use once_cell::sync::Lazy;
use xmpp_parsers::{
  disco::{DiscoInfoResult, Feature},
  ns,
  presence::Presence,
  Element,
};

use crate::room::MsidState;

/// The fixed capability list this focus advertises in the room's
/// service-discovery info. COLIBRI is a focus-to-bridge concern and is
/// deliberately absent.
pub static DISCO_INFO: Lazy<DiscoInfoResult> = Lazy::new(|| DiscoInfoResult {
  node: None,
  identities: vec![],
  features: vec![
    Feature::new(ns::JINGLE),
    Feature::new(ns::JINGLE_ICE_UDP),
    Feature::new(ns::JINGLE_RTP),
    Feature::new(ns::JINGLE_DTLS),
    Feature::new(MMUC),
  ],
  extensions: vec![],
});

/// A joining presence is capable iff it carries a `conf` element in the
/// mmuc namespace with `bridged` equal to `"1"` or `"true"`.
pub fn is_capable(presence: &Presence) -> bool {
  presence.payloads.iter().any(|payload| {
    payload.is("conf", MMUC)
      && matches!(payload.attr("bridged"), Some("1") | Some("true"))
  })
}

/// Strips any existing `mediastream` annotations from `payloads` and
/// re-stamps them from the authoritative `msids` map, per §4.4.3: this runs
/// on every outgoing presence update that is not `unavailable`, so peers
/// always see consistent media metadata.
pub fn restamp_mediastreams(payloads: &mut Vec<Element>, msids: &HashMap<String, MsidState>) {
  payloads.retain(|el| !el.is("mediastream", jitsi_xmpp_parsers::ns::MEDIASTREAM));

  for (msid, state) in msids {
    let mut mediastream = Mediastream::new(msid.clone());
    if let Some(audio) = state.audio {
      mediastream = mediastream.with_audio(audio.as_str());
    }
    if let Some(video) = state.video {
      mediastream = mediastream.with_video(video.as_str());
    }
    payloads.push(mediastream.into());
  }
}
