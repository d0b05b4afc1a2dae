//! Jingle builders: session-initiate, source-add/source-remove, and
//! session-terminate requests sent focus-to-client.

use jid::Jid;
use jitsi_xmpp_parsers::{
  jingle::{Action, Content, Description, Jingle, Transport},
  jingle_ice_udp::Transport as IceUdpTransport,
  jingle_rtp::Description as RtpDescription,
};
use xmpp_parsers::{
  jingle::{ContentId, Creator, ReasonElement, Senders, SessionId},
  jingle_dtls_srtp::Setup,
  jingle_grouping::{Content as GroupContent, Group, Semantics as GroupSemantics},
  jingle_rtp::RtcpMux,
};

use crate::{
  codecs::{video_payload_types, AUDIO_PAYLOAD_TYPES, RTP_HDREXTS},
  room::{Medium, SourceSet},
};

fn rtp_description(medium: Medium, use_rtx: bool, sources: &SourceSet) -> RtpDescription {
  let mut description = RtpDescription::new(medium.as_str().to_owned());
  description.payload_types = match medium {
    Medium::Audio => AUDIO_PAYLOAD_TYPES.clone(),
    Medium::Video => video_payload_types(use_rtx),
    Medium::Data => vec![],
  };
  description.hdrexts = RTP_HDREXTS.clone();
  description.rtcp_mux = Some(RtcpMux);
  description.ssrcs = sources.sources.clone();
  description.ssrc_groups = sources.groups.clone();
  description
}

fn grouping(bundled_media: &[Medium]) -> Option<Group> {
  if bundled_media.len() < 2 {
    return None;
  }
  let group = Group {
    semantics: GroupSemantics::Bundle,
    contents: bundled_media.iter().map(|m| GroupContent::new(m.as_str())).collect(),
  };
  Some(group)
}

/// Builds the session-initiate offer sent to a newly-sessioned participant:
/// every bridged medium, the static codec table, a shared bundled transport,
/// and the cumulative sources already advertised by every other session
/// member (never including the recipient's own).
pub fn build_session_initiate(
  sid: SessionId,
  initiator: Jid,
  responder: Jid,
  transport: IceUdpTransport,
  use_bundle: bool,
  use_rtx: bool,
  remote_sources: &[(Medium, SourceSet)],
) -> Jingle {
  // The bridge's own fingerprint setup attribute (if any) reflects its role
  // towards the bridge's *own* DTLS peer, not towards this client; the
  // offer we hand the client always proposes actpass so the client can
  // pick active or passive per §4.2.
  let mut transport = transport;
  if let Some(fingerprint) = transport.fingerprint.as_mut() {
    fingerprint.setup = Some(Setup::Actpass);
  }

  let mut jingle = Jingle::new(Action::SessionInitiate, sid)
    .with_initiator(initiator)
    .with_responder(responder);

  let mut bundled_media = vec![];
  for (medium, sources) in remote_sources {
    if *medium == Medium::Data {
      continue;
    }
    let description = rtp_description(*medium, use_rtx, sources);
    let content = Content::new(Creator::Initiator, ContentId(medium.as_str().to_owned()))
      .with_senders(Senders::Both)
      .with_description(description)
      .with_transport(Transport::IceUdp(transport.clone()));
    jingle = jingle.add_content(content);
    bundled_media.push(*medium);
  }

  if use_bundle {
    if let Some(group) = grouping(&bundled_media) {
      jingle = jingle.set_group(group);
    }
  }

  jingle
}

/// Builds a source-add carrying only the delta of newly-advertised sources,
/// fanned out unchanged to every other session member.
pub fn build_source_add(sid: SessionId, added: &[(Medium, SourceSet)]) -> Jingle {
  build_source_delta(Action::SourceAdd, sid, added)
}

/// Builds a source-remove carrying the sources a participant just dropped,
/// fanned out unchanged to every other session member.
pub fn build_source_remove(sid: SessionId, removed: &[(Medium, SourceSet)]) -> Jingle {
  build_source_delta(Action::SourceRemove, sid, removed)
}

fn build_source_delta(action: Action, sid: SessionId, deltas: &[(Medium, SourceSet)]) -> Jingle {
  let mut jingle = Jingle::new(action, sid);
  for (medium, sources) in deltas {
    if *medium == Medium::Data || sources.is_empty() {
      continue;
    }
    let mut description = RtpDescription::new(medium.as_str().to_owned());
    description.ssrcs = sources.sources.clone();
    description.ssrc_groups = sources.groups.clone();
    let content = Content::new(Creator::Initiator, ContentId(medium.as_str().to_owned()))
      .with_description(description);
    jingle = jingle.add_content(content);
  }
  jingle
}

/// Builds the session-terminate sent when a participant's session ends,
/// whether from them leaving or the room tearing down.
pub fn build_session_terminate(sid: SessionId, reason: ReasonElement) -> Jingle {
  Jingle::new(Action::SessionTerminate, sid).set_reason(reason)
}

#[cfg(test)]
mod tests {
  use jitsi_xmpp_parsers::jingle_ssma::Source as SsrcSource;
  use xmpp_parsers::jingle::Reason;

  use super::*;

  fn sources(ssrc: u32) -> SourceSet {
    SourceSet {
      sources: vec![SsrcSource::new(ssrc)],
      groups: vec![],
    }
  }

  #[test]
  fn session_initiate_skips_the_data_medium_and_groups_the_rest_when_bundled() {
    let jingle = build_session_initiate(
      SessionId("sid1".into()),
      "focus@conference.example.org/focus".parse().unwrap(),
      "focus@conference.example.org/alice".parse().unwrap(),
      IceUdpTransport::new(),
      true,
      false,
      &[
        (Medium::Audio, sources(1)),
        (Medium::Video, sources(2)),
        (Medium::Data, SourceSet::default()),
      ],
    );
    assert_eq!(jingle.contents.len(), 2);
    assert!(jingle.group.is_some());
    assert_eq!(jingle.group.unwrap().contents.len(), 2);
  }

  #[test]
  fn session_initiate_forces_dtls_setup_to_actpass() {
    use jitsi_xmpp_parsers::jingle_dtls_srtp::Fingerprint;
    use xmpp_parsers::{hashes::Algo, jingle_dtls_srtp::Setup};

    let mut transport = IceUdpTransport::new();
    transport.fingerprint = Some(Fingerprint {
      hash: Algo::Sha_256,
      setup: Some(Setup::Passive),
      value: vec![1, 2, 3],
    });

    let jingle = build_session_initiate(
      SessionId("sid1".into()),
      "focus@conference.example.org/focus".parse().unwrap(),
      "focus@conference.example.org/alice".parse().unwrap(),
      transport,
      true,
      false,
      &[(Medium::Audio, sources(1))],
    );
    let content_transport = jingle.contents[0].transport.clone().unwrap();
    let Transport::IceUdp(transport) = content_transport else {
      panic!("expected an ice-udp transport");
    };
    assert_eq!(transport.fingerprint.unwrap().setup, Some(Setup::Actpass));
  }

  #[test]
  fn source_add_omits_empty_media() {
    let jingle = build_source_add(
      SessionId("sid1".into()),
      &[(Medium::Audio, sources(5)), (Medium::Video, SourceSet::default())],
    );
    assert_eq!(jingle.contents.len(), 1);
  }

  #[test]
  fn session_terminate_carries_the_reason() {
    let reason = ReasonElement {
      reason: Reason::Success,
      texts: Default::default(),
    };
    let jingle = build_session_terminate(SessionId("sid1".into()), reason);
    assert_eq!(jingle.action, Action::SessionTerminate);
    assert_eq!(jingle.reason.unwrap().reason, Reason::Success);
  }
}
