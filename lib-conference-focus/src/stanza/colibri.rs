//! COLIBRI request builders: translate room and participant state into the
//! create/update/expire requests sent to the selected bridge. These
//! functions are pure: they read state but never mutate it, so the
//! controller only commits a mutation after a build succeeds.

use jitsi_xmpp_parsers::colibri::{Channel, ChannelBundle, Conference, Content, SctpConnection};

use crate::{
  codecs::{video_payload_types, AUDIO_PAYLOAD_TYPES, RTP_HDREXTS},
  config::FocusConfig,
  room::{Medium, SourceSet},
};

/// One endpoint's channel allocation, addressed to a single medium.
pub struct ChannelUpdate<'a> {
  pub endpoint: &'a str,
  pub channel_id: &'a str,
  pub sources: &'a SourceSet,
}

fn audio_content(config: &FocusConfig, endpoints: &[String]) -> Content {
  let mut content = Content::new(Medium::Audio.as_str());
  for endpoint in endpoints {
    let mut channel = Channel::new_request(endpoint.clone())
      .with_payload_types(AUDIO_PAYLOAD_TYPES.clone())
      .with_rtp_hdrextensions(RTP_HDREXTS.clone())
      .with_rtcp_mux(true);
    if config.feature_bundle {
      channel = channel.with_channel_bundle_id(endpoint.clone());
    }
    content = content.with_channel(channel);
  }
  content
}

fn video_content(config: &FocusConfig, endpoints: &[String]) -> Content {
  let mut content = Content::new(Medium::Video.as_str());
  for endpoint in endpoints {
    let mut channel = Channel::new_request(endpoint.clone())
      .with_payload_types(video_payload_types(config.feature_rtx))
      .with_rtp_hdrextensions(RTP_HDREXTS.clone())
      .with_rtcp_mux(true);
    if config.feature_bundle {
      channel = channel.with_channel_bundle_id(endpoint.clone());
    }
    content = content.with_channel(channel);
  }
  content
}

fn data_content(config: &FocusConfig, endpoints: &[String]) -> Content {
  let mut content = Content::new(Medium::Data.as_str());
  for endpoint in endpoints {
    let mut sctp = SctpConnection::new_request(endpoint.clone());
    if config.feature_bundle {
      sctp = sctp.with_channel_bundle_id(endpoint.clone());
    }
    content = content.with_sctp_connection(sctp);
  }
  content
}

/// Builds a conference `create` request allocating one channel per medium
/// for every entry of `endpoints`, in order.
pub fn build_create(config: &FocusConfig, endpoints: &[String]) -> Conference {
  let mut conference = Conference::new()
    .with_content(audio_content(config, endpoints))
    .with_content(video_content(config, endpoints));

  if config.feature_datachannel {
    conference = conference.with_content(data_content(config, endpoints));
  }

  if config.feature_bundle {
    for endpoint in endpoints {
      conference = conference.with_channel_bundle(ChannelBundle::new(endpoint.clone()));
    }
  }

  conference
}

/// Builds a conference `update` request against an already-assigned
/// conference, allocating channels for newly-capable endpoints exactly as
/// `build_create` would, plus source updates for endpoints that already
/// have channels.
pub fn build_update(
  config: &FocusConfig,
  conference_id: &str,
  new_endpoints: &[String],
  source_updates: &[(Medium, ChannelUpdate<'_>)],
) -> Conference {
  let mut conference = Conference::new().with_id(conference_id);

  if !new_endpoints.is_empty() {
    conference = conference.with_content(audio_content(config, new_endpoints));
    conference = conference.with_content(video_content(config, new_endpoints));
    if config.feature_datachannel {
      conference = conference.with_content(data_content(config, new_endpoints));
    }
    if config.feature_bundle {
      for endpoint in new_endpoints {
        conference = conference.with_channel_bundle(ChannelBundle::new(endpoint.clone()));
      }
    }
  }

  for medium in [Medium::Audio, Medium::Video] {
    let updates: Vec<_> = source_updates.iter().filter(|(m, _)| *m == medium).collect();
    if updates.is_empty() {
      continue;
    }
    let mut content = Content::new(medium.as_str());
    for (_, update) in updates {
      let channel = Channel::new_request(update.endpoint.to_owned())
        .with_sources(update.sources.sources.clone())
        .with_ssrc_groups(update.sources.groups.clone());
      let mut channel = channel;
      channel.id = Some(update.channel_id.to_owned());
      channel.endpoint = None;
      content = content.with_channel(channel);
    }
    conference = conference.with_content(content);
  }

  conference
}

/// Builds a conference `expire` request: the minimal element set that
/// requests immediate teardown of every listed channel.
pub fn build_expire(conference_id: &str, channels: &[(Medium, String)]) -> Conference {
  let mut conference = Conference::new().with_id(conference_id);

  for medium in [Medium::Audio, Medium::Video, Medium::Data] {
    let ids: Vec<&str> = channels
      .iter()
      .filter(|(m, _)| *m == medium)
      .map(|(_, id)| id.as_str())
      .collect();
    if ids.is_empty() {
      continue;
    }
    let mut content = Content::new(medium.as_str());
    for id in ids {
      if medium == Medium::Data {
        content = content.with_sctp_connection(SctpConnection::expire_request(id));
      } else {
        content = content.with_channel(Channel::expire_request(id));
      }
    }
    conference = conference.with_content(content);
  }

  conference
}

#[cfg(test)]
mod tests {
  use crate::room::SourceSet;

  use super::*;

  fn config() -> FocusConfig {
    FocusConfig {
      media_bridge: "bridge1.example.org".into(),
      focus_domain: "focus.example.org".into(),
      feature_datachannel: true,
      feature_bundle: true,
      feature_rtx: false,
      pubsub_service: None,
      pubsub_node: "videobridge".into(),
      min_participants: 2,
      linger_time: std::time::Duration::from_secs(0),
      bridge_liveliness: std::time::Duration::from_secs(60),
      pending_create_timeout: std::time::Duration::from_secs(15),
    }
  }

  #[test]
  fn build_create_allocates_audio_video_and_data_per_endpoint() {
    let endpoints = vec!["alice".to_string(), "bob".to_string()];
    let conference = build_create(&config(), &endpoints);
    assert_eq!(conference.contents.len(), 3);
    assert_eq!(conference.contents[0].channels.len(), 2);
    assert_eq!(conference.channel_bundles.len(), 2);
  }

  #[test]
  fn build_create_without_bundle_omits_channel_bundles() {
    let mut config = config();
    config.feature_bundle = false;
    let endpoints = vec!["alice".to_string()];
    let conference = build_create(&config, &endpoints);
    assert!(conference.channel_bundles.is_empty());
    assert!(conference.contents[0].channels[0].channel_bundle_id.is_none());
  }

  #[test]
  fn build_expire_groups_channels_by_medium() {
    let channels = vec![
      (Medium::Audio, "c1".to_string()),
      (Medium::Video, "c2".to_string()),
      (Medium::Data, "c3".to_string()),
    ];
    let conference = build_expire("conf1", &channels);
    assert_eq!(conference.id.as_deref(), Some("conf1"));
    assert_eq!(conference.contents.len(), 3);
    assert_eq!(conference.contents[2].sctp_connections.len(), 1);
  }

  #[test]
  fn build_update_targets_an_existing_channel_without_reallocating() {
    let sources = SourceSet::default();
    let update = ChannelUpdate {
      endpoint: "alice",
      channel_id: "chan1",
      sources: &sources,
    };
    let conference = build_update(&config(), "conf1", &[], &[(Medium::Audio, update)]);
    assert_eq!(conference.contents.len(), 1);
    let channel = &conference.contents[0].channels[0];
    assert_eq!(channel.id.as_deref(), Some("chan1"));
    assert!(channel.endpoint.is_none());
  }
}
