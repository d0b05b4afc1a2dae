//! Translates the `content` elements of an inbound session-accept,
//! source-add, or source-remove into the normalized per-medium source lists
//! and per-msid mute state that `Room` stores (§4.4.1).

use std::collections::HashMap;

use jitsi_xmpp_parsers::{
  jingle::{Content, Description},
  jingle_ssma::Source,
};

use crate::room::{Medium, MsidState, MuteState, SourceSet};

/// The msid an SSMA source belongs to, read from its `msid` parameter. The
/// parameter value is `"<msid> <track-label>"`; only the msid half matters
/// here.
fn source_msid(source: &Source) -> Option<String> {
  source
    .parameters
    .iter()
    .find(|parameter| parameter.name == "msid")
    .and_then(|parameter| parameter.value.as_deref())
    .and_then(|value| value.split_whitespace().next())
    .map(str::to_owned)
}

/// Parses every RTP content into (sources per medium, live/mute state per
/// msid implied by the sources' presence). Contents with a non-RTP
/// description, or a medium name this focus doesn't recognise, are skipped.
pub fn parse_sources(contents: &[Content]) -> (HashMap<Medium, SourceSet>, HashMap<String, MsidState>) {
  let mut sources: HashMap<Medium, SourceSet> = HashMap::new();
  let mut msids: HashMap<String, MsidState> = HashMap::new();

  for content in contents {
    let Some(Description::Rtp(description)) = &content.description else {
      continue;
    };
    let Some(medium) = Medium::from_name(&description.media) else {
      continue;
    };

    for source in &description.ssrcs {
      if let Some(msid) = source_msid(source) {
        let entry = msids.entry(msid).or_default();
        match medium {
          Medium::Audio => entry.audio = Some(MuteState::Live),
          Medium::Video => entry.video = Some(MuteState::Live),
          Medium::Data => {}
        }
      }
    }

    let set = sources.entry(medium).or_default();
    set.sources.extend(description.ssrcs.iter().cloned());
    set.groups.extend(description.ssrc_groups.iter().cloned());
  }

  (sources, msids)
}

#[cfg(test)]
mod tests {
  use jitsi_xmpp_parsers::{
    jingle_rtp::Description as RtpDescription,
    jingle_ssma::{Parameter, Source as SsrcSource},
  };
  use xmpp_parsers::jingle::{ContentId, Creator};

  use super::*;

  fn content_with_source(media: &str, ssrc: u32, msid: Option<&str>) -> Content {
    let mut source = SsrcSource::new(ssrc);
    if let Some(msid) = msid {
      source.parameters.push(Parameter {
        name: "msid".to_owned(),
        value: Some(format!("{} track1", msid)),
      });
    }
    let mut description = RtpDescription::new(media.to_owned());
    description.ssrcs.push(source);
    Content::new(Creator::Initiator, ContentId(media.to_owned())).with_description(description)
  }

  #[test]
  fn collects_sources_per_medium_and_msid_state() {
    let contents = vec![
      content_with_source("audio", 1, Some("m1")),
      content_with_source("video", 2, Some("m1")),
    ];
    let (sources, msids) = parse_sources(&contents);

    assert_eq!(sources[&Medium::Audio].sources.len(), 1);
    assert_eq!(sources[&Medium::Video].sources.len(), 1);

    let state = &msids["m1"];
    assert_eq!(state.audio, Some(MuteState::Live));
    assert_eq!(state.video, Some(MuteState::Live));
  }

  #[test]
  fn sources_without_an_msid_parameter_are_kept_but_unattributed() {
    let contents = vec![content_with_source("audio", 3, None)];
    let (sources, msids) = parse_sources(&contents);
    assert_eq!(sources[&Medium::Audio].sources.len(), 1);
    assert!(msids.is_empty());
  }

  #[test]
  fn unrecognised_media_names_are_skipped() {
    let contents = vec![content_with_source("application", 4, Some("m1"))];
    let (sources, msids) = parse_sources(&contents);
    assert!(sources.is_empty());
    assert!(msids.is_empty());
  }
}
