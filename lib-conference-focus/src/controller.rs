//! Focus Controller: the per-process state machine that consumes room
//! events and inbound Jingle/COLIBRI stanzas, mutates [`Room`](crate::room)
//! state, and emits outbound stanzas through a [`Host`] (§4.4).
//!
//! Every public entry point follows §7's propagation policy: internal
//! failures are caught, logged with `tracing::error!`, and turned into a
//! `bool` ("was this event consumed") rather than escaping to the caller.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use anyhow::{bail, Context, Result};
use jid::{BareJid, FullJid, Jid};
use jitsi_xmpp_parsers::{
  colibri::Conference,
  jingle::{Action, Content},
  jingle_ice_udp::Transport as IceUdpTransport,
  jingle_rtp_info::{Mediastream, Mute, Name, Unmute},
};
use tracing::{debug, error, warn};
use xmpp_parsers::{
  iq::{Iq, IqType},
  jingle::{Reason, ReasonElement, SessionId},
  presence::Presence,
  stanza_error::{DefinedCondition, ErrorType, StanzaError},
  Element,
};

use crate::{
  bridge::BridgeSelector,
  config::FocusConfig,
  correlation::CorrelationTable,
  host::Host,
  parse::parse_sources,
  presence::{is_capable, restamp_mediastreams},
  registry::RoomRegistry,
  room::{ConferenceState, Medium, MuteState, Participant, SourceSet},
  stanza::{colibri as colibri_builders, focus::{self as focus_stanza, RoomMode}, jingle as jingle_builders},
  token,
  util::{generate_id, now_secs},
};

fn bare_room_jid(room_id: &str) -> Result<BareJid> {
  room_id
    .parse::<BareJid>()
    .with_context(|| format!("room id '{}' is not a valid bare jid", room_id))
}

/// The focus's own in-room address.
fn focus_jid(room: &BareJid) -> FullJid {
  room.clone().with_resource("focus")
}

/// An occupant's in-room address, keyed by their nickname.
fn occupant_jid(room: &BareJid, nick: &str) -> FullJid {
  room.clone().with_resource(nick)
}

/// The address this focus presents to the bridge as the `from` of a COLIBRI
/// request: a reversible encoding of the room jid (§6), so the bridge's
/// reply can be decoded back into a room identifier.
fn room_token_jid(room: &BareJid) -> Jid {
  Jid::Bare(BareJid::domain(token::encode(room)))
}

fn bridge_jid(bridge: &str) -> Jid {
  Jid::Bare(BareJid::domain(bridge.to_owned()))
}

/// Records a `mute`/`unmute` session-info's target: whether it applies to
/// every msid the sender has (an empty list) or only the named ones.
fn record_mute_selector(
  target: &mut Option<(bool, Vec<String>)>,
  mediastreams: &[Mediastream],
  muted: bool,
) {
  *target = Some((muted, mediastreams.iter().map(|m| m.msid.clone()).collect()));
}

/// The per-process conference focus state machine. Owns every tracked room,
/// the bridge selector, and the outstanding COLIBRI correlation table; reaches
/// the outside world only through `host`.
pub struct FocusController {
  config: FocusConfig,
  host: Arc<dyn Host>,
  rooms: RoomRegistry,
  bridges: BridgeSelector,
  correlations: CorrelationTable,
}

impl FocusController {
  pub fn new(config: FocusConfig, host: Arc<dyn Host>) -> FocusController {
    let bridges = BridgeSelector::new(config.media_bridge.clone(), config.bridge_liveliness);
    FocusController {
      config,
      host,
      rooms: RoomRegistry::new(),
      bridges,
      correlations: CorrelationTable::new(),
    }
  }

  pub fn rooms(&self) -> &RoomRegistry {
    &self.rooms
  }

  /// Exposes the bridge selector so a stats feed (§4.6) can feed it updates.
  pub fn bridge_selector_mut(&mut self) -> &mut BridgeSelector {
    &mut self.bridges
  }

  /// §4.4 `pre_join`: rejects a duplicate session outright, otherwise
  /// broadcasts and unicasts the room's relay/p2p mode to the joiner.
  pub async fn pre_join(
    &mut self,
    room_id: &str,
    nick: &str,
    real_address: &BareJid,
    presence: &Presence,
  ) -> bool {
    match self.try_pre_join(room_id, nick, real_address, presence).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(room_id, nick, error = ?e, "pre_join handling failed");
        false
      },
    }
  }

  async fn try_pre_join(
    &mut self,
    room_id: &str,
    nick: &str,
    real_address: &BareJid,
    presence: &Presence,
  ) -> Result<bool> {
    let capable = is_capable(presence);
    let room = self.rooms.get_or_create(room_id);

    let duplicate = room
      .participants
      .values()
      .any(|p| &p.real_address == real_address && p.session_id.is_some());
    if duplicate {
      self.reject_duplicate_session(room_id, nick).await?;
      return Ok(true);
    }

    let post_join_capable = room.capable_count() + usize::from(capable);
    let mode = if post_join_capable >= self.config.min_participants as usize {
      RoomMode::Relay
    }
    else {
      RoomMode::P2p
    };

    let broadcast = focus_stanza::build_broadcast(room_id, mode)?;
    self.host.send(broadcast).await?;
    let unicast = focus_stanza::build_unicast(room_id, nick, mode)?;
    self.host.send(unicast).await?;

    Ok(true)
  }

  async fn reject_duplicate_session(&mut self, room_id: &str, nick: &str) -> Result<()> {
    let to: Jid = format!("{}/{}", room_id, nick)
      .parse()
      .context("room id is not a valid bare jid")?;
    let error = StanzaError::new(
      ErrorType::Modify,
      DefinedCondition::ResourceConstraint,
      "en",
      "a session for this address is already active in this room",
    );
    let mut presence = Presence::new(xmpp_parsers::presence::Type::Error).with_to(to);
    presence.payloads.push(error.into());
    self.host.send(presence.into()).await?;
    Ok(())
  }

  /// §4.4 `joined`: materializes the participant record, then either
  /// no-ops, queues behind an in-flight create, or allocates channels.
  pub async fn joined(
    &mut self,
    room_id: &str,
    nick: &str,
    real_address: &BareJid,
    presence: &Presence,
  ) -> bool {
    match self.try_joined(room_id, nick, real_address, presence).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(room_id, nick, error = ?e, "joined handling failed");
        false
      },
    }
  }

  async fn try_joined(
    &mut self,
    room_id: &str,
    nick: &str,
    real_address: &BareJid,
    presence: &Presence,
  ) -> Result<bool> {
    let capable = is_capable(presence);
    let room = self.rooms.get_or_create(room_id);

    let participant = room
      .participants
      .entry(nick.to_owned())
      .or_insert_with(|| Participant::new(real_address.clone(), capable));
    participant.bridged = capable;
    if !room.join_order.iter().any(|n| n == nick) {
      room.join_order.push(nick.to_owned());
    }

    if !capable || room.capable_count() < self.config.min_participants as usize {
      return Ok(true);
    }

    if room.conference_state.is_pending() {
      if !room.pending_join_queue.iter().any(|n| n == nick) {
        room.pending_join_queue.push(nick.to_owned());
      }
      return Ok(true);
    }

    self.allocate_channels(room_id).await
  }

  /// Emits a COLIBRI create (if the room has no conference yet) or update
  /// (if it does) carrying every capable participant not already in
  /// `sessions`. No-ops if there is nobody left to allocate for.
  async fn allocate_channels(&mut self, room_id: &str) -> Result<bool> {
    let room_bare = bare_room_jid(room_id)?;

    let (endpoints, conference_state, existing_bridge) = {
      let room = self
        .rooms
        .get(room_id)
        .context("room missing during allocation")?;
      let endpoints: Vec<String> = room
        .join_order
        .iter()
        .filter(|nick| {
          room.participants.get(nick.as_str()).map_or(false, |p| p.bridged)
            && !room.sessions.contains(nick.as_str())
        })
        .cloned()
        .collect();
      (endpoints, room.conference_state.clone(), room.bridge.clone())
    };

    if endpoints.is_empty() {
      return Ok(true);
    }

    let bridge = existing_bridge.unwrap_or_else(|| self.bridges.select(now_secs()));

    let request_id = generate_id();
    let conference = match conference_state.conference_id() {
      Some(conf_id) => colibri_builders::build_update(&self.config, conf_id, &endpoints, &[]),
      None => colibri_builders::build_create(&self.config, &endpoints),
    };

    let stanza: Element = Iq::from_set(request_id.clone(), conference)
      .with_from(room_token_jid(&room_bare))
      .with_to(bridge_jid(&bridge))
      .into();
    self.host.send(stanza).await?;

    let room = self
      .rooms
      .get_mut(room_id)
      .context("room disappeared mid-allocation")?;
    room.bridge = Some(bridge);
    room.conference_state = ConferenceState::Pending;
    room.pending_since = Some(now_secs());
    room.pending_request_id = Some(request_id.clone());
    self.correlations.insert(request_id, room_id.to_owned(), endpoints);

    Ok(true)
  }

  /// §4.4 `colibri_result`: installs the assigned conference id and
  /// channels, sends session-initiate to every endpoint the reply covers,
  /// then drains the pending-join queue with a follow-up allocation.
  pub async fn colibri_result(&mut self, reply: &Iq) -> bool {
    match self.try_colibri_result(reply).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(error = ?e, "colibri_result handling failed");
        false
      },
    }
  }

  async fn try_colibri_result(&mut self, reply: &Iq) -> Result<bool> {
    let Some(entry) = self.correlations.take(&reply.id)
    else {
      debug!(id = %reply.id, "dropping colibri reply with no matching correlation entry");
      return Ok(false);
    };
    let room_id = entry.room.clone();

    let reply_from = match &reply.from {
      Some(jid) => jid.to_string(),
      None => bail!("colibri reply missing from"),
    };
    let expected_bridge = self.rooms.get(&room_id).and_then(|r| r.bridge.clone());
    if Some(reply_from) != expected_bridge {
      warn!(room = %room_id, "dropping colibri reply not from the room's selected bridge");
      return Ok(false);
    }

    let payload = match &reply.payload {
      IqType::Result(Some(payload)) => payload.clone(),
      _ => bail!("colibri result reply carries no conference payload"),
    };
    let conference =
      Conference::try_from(payload).context("colibri reply did not parse as a conference")?;
    let conf_id = conference
      .id
      .clone()
      .context("colibri reply missing conference id")?;

    let room_bare = bare_room_jid(&room_id)?;

    let mut bundle_transports: HashMap<String, IceUdpTransport> = HashMap::new();
    for bundle in &conference.channel_bundles {
      if let Some(transport) = &bundle.transport {
        bundle_transports.insert(bundle.id.clone(), transport.clone());
      }
    }

    // With `focus_feature_bundle` off the bridge has nothing to key a
    // channel-bundle transport by, so it returns the transport on the
    // channel itself instead.
    let mut per_channel_transports: HashMap<String, IceUdpTransport> = HashMap::new();
    let mut channel_ids: HashMap<(Medium, String), String> = HashMap::new();
    for content in &conference.contents {
      let Some(medium) = Medium::from_name(&content.name)
      else {
        continue;
      };
      for channel in &content.channels {
        if let (Some(endpoint), Some(id)) = (&channel.endpoint, &channel.id) {
          channel_ids.insert((medium, endpoint.clone()), id.clone());
        }
        if let (Some(endpoint), Some(transport)) = (&channel.endpoint, &channel.transport) {
          per_channel_transports.insert(endpoint.clone(), transport.clone());
        }
      }
    }

    {
      let room = self.rooms.get_mut(&room_id).context("room already destroyed")?;
      room.conference_state = ConferenceState::Assigned(conf_id);

      for nick in &entry.nicknames {
        let Some(participant) = room.participants.get_mut(nick)
        else {
          continue;
        };
        for medium in [Medium::Audio, Medium::Video, Medium::Data] {
          if let Some(channel_id) = channel_ids.get(&(medium, nick.clone())) {
            participant.channels.insert(medium, channel_id.clone());
          }
        }
        participant.sources.entry(Medium::Audio).or_default();
        participant.sources.entry(Medium::Video).or_default();
        if participant.has_channels() {
          participant.session_id.get_or_insert_with(generate_id);
          room.sessions.insert(nick.clone());
        }
      }
    }

    for nick in &entry.nicknames {
      let (remote_sources, session_id, transport) = {
        let Some(room) = self.rooms.get(&room_id)
        else {
          continue;
        };
        let Some(participant) = room.participants.get(nick)
        else {
          continue;
        };
        let Some(session_id) = participant.session_id.clone()
        else {
          continue;
        };
        (
          room.merged_sources_excluding(nick),
          session_id,
          bundle_transports
            .get(nick)
            .or_else(|| per_channel_transports.get(nick))
            .cloned()
            .unwrap_or_else(IceUdpTransport::new),
        )
      };

      let initiator = Jid::Full(focus_jid(&room_bare));
      let responder = occupant_jid(&room_bare, nick);
      let offer = jingle_builders::build_session_initiate(
        SessionId(session_id),
        initiator.clone(),
        Jid::Full(responder.clone()),
        transport,
        self.config.feature_bundle,
        self.config.feature_rtx,
        &remote_sources,
      );
      let stanza: Element = Iq::from_set(generate_id(), offer)
        .with_from(initiator)
        .with_to(Jid::Full(responder))
        .into();
      self.host.send(stanza).await?;
    }

    let queued = {
      let room = self.rooms.get_mut(&room_id).context("room already destroyed")?;
      std::mem::take(&mut room.pending_join_queue)
    };
    if !queued.is_empty() {
      self.allocate_channels(&room_id).await?;
    }

    Ok(true)
  }

  /// A COLIBRI error reply to an in-flight request (§10.4): marks the
  /// targeted bridge unhealthy, resets the room to `absent`, and retries
  /// allocation immediately against whichever bridge is now selected.
  pub async fn colibri_error(&mut self, reply: &Iq) -> bool {
    match self.try_colibri_error(reply).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(error = ?e, "colibri_error handling failed");
        false
      },
    }
  }

  async fn try_colibri_error(&mut self, reply: &Iq) -> Result<bool> {
    let Some(entry) = self.correlations.take(&reply.id)
    else {
      return Ok(false);
    };
    let room_id = entry.room;

    if let Some(bridge) = self.rooms.get(&room_id).and_then(|r| r.bridge.clone()) {
      self.bridges.mark_unhealthy(&bridge);
    }

    if let Some(room) = self.rooms.get_mut(&room_id) {
      room.conference_state = ConferenceState::Absent;
      room.bridge = None;
      room.pending_since = None;
      room.pending_request_id = None;
    }

    warn!(room = %room_id, "bridge returned a colibri error; marked unhealthy and retrying allocation");
    self.allocate_channels(&room_id).await?;
    Ok(true)
  }

  /// §4.4 `left`: drops the session, fans out a source-remove for whatever
  /// the leaver had advertised, expires their channels, and re-checks the
  /// teardown precondition.
  pub async fn left(&mut self, room_id: &str, nick: &str) -> bool {
    match self.try_left(room_id, nick).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(room_id, nick, error = ?e, "left handling failed");
        false
      },
    }
  }

  async fn try_left(&mut self, room_id: &str, nick: &str) -> Result<bool> {
    let Some(participant) = (match self.rooms.get_mut(room_id) {
      Some(room) => {
        let participant = room.participants.remove(nick);
        room.join_order.retain(|n| n != nick);
        room.pending_join_queue.retain(|n| n != nick);
        if participant.is_some() {
          room.sessions.remove(nick);
        }
        participant
      },
      None => None,
    })
    else {
      return Ok(false);
    };

    if participant.session_id.is_some() {
      self
        .fan_out_source_delta(room_id, nick, Action::SourceRemove, &participant.sources)
        .await?;
    }
    let channels: Vec<(Medium, String)> =
      participant.channels.iter().map(|(m, id)| (*m, id.clone())).collect();

    let teardown_needed = self.rooms.get(room_id).map_or(false, |room| {
      room.capable_count() < self.config.min_participants as usize
        && !matches!(room.conference_state, ConferenceState::Absent)
    });

    if teardown_needed {
      // `destroy` expires every remaining channel in one conference IQ;
      // fold the leaver's own channels in instead of expiring them here
      // too.
      if !channels.is_empty() {
        if let Some(room) = self.rooms.get_mut(room_id) {
          room.pending_expire_channels.extend(channels);
        }
      }
      self.maybe_destroy(room_id).await?;
    }
    else {
      if participant.session_id.is_some() {
        self.send_expire(room_id, &channels).await?;
      }
      if self.rooms.get(room_id).map_or(false, |room| room.is_empty_of_state()) {
        self.rooms.remove(room_id);
        self.correlations.clear_room(room_id);
      }
    }

    Ok(true)
  }

  /// §4.4.1 Jingle handling, dispatched on `action`.
  pub async fn jingle(
    &mut self,
    room_id: &str,
    nick: &str,
    iq_id: &str,
    jingle: &jitsi_xmpp_parsers::jingle::Jingle,
  ) -> bool {
    match self.try_jingle(room_id, nick, iq_id, jingle).await {
      Ok(consumed) => consumed,
      Err(e) => {
        error!(room_id, nick, error = ?e, "jingle handling failed");
        false
      },
    }
  }

  async fn try_jingle(
    &mut self,
    room_id: &str,
    nick: &str,
    iq_id: &str,
    jingle: &jitsi_xmpp_parsers::jingle::Jingle,
  ) -> Result<bool> {
    match &jingle.action {
      Action::SessionAccept => {
        self
          .handle_source_update(room_id, nick, Action::SessionAccept, &jingle.contents)
          .await?;
      },
      Action::SourceAdd => {
        self
          .handle_source_update(room_id, nick, Action::SourceAdd, &jingle.contents)
          .await?;
      },
      Action::SourceRemove => {
        self
          .handle_source_update(room_id, nick, Action::SourceRemove, &jingle.contents)
          .await?;
      },
      Action::SessionInfo => {
        self.handle_session_info(room_id, nick, jingle).await?;
      },
      Action::SessionTerminate => {
        self.try_left(room_id, nick).await?;
      },
      other => {
        debug!(room_id, nick, action = ?other, "ignoring unsupported jingle action");
        return Ok(false);
      },
    }
    self.ack_jingle(room_id, nick, iq_id).await?;
    Ok(true)
  }

  async fn ack_jingle(&mut self, room_id: &str, nick: &str, iq_id: &str) -> Result<()> {
    let room_bare = bare_room_jid(room_id)?;
    let to = Jid::Full(occupant_jid(&room_bare, nick));
    let result = Iq::empty_result(to, iq_id.to_owned()).with_from(Jid::Full(focus_jid(&room_bare)));
    self.host.send(result.into()).await?;
    Ok(())
  }

  /// `session-accept` (fanned out as a `source-add`), `source-add`, and
  /// `source-remove`: mutates the sender's recorded sources/msids, sends a
  /// COLIBRI channel update for the affected media, republishes the
  /// sender's presence, then fans the delta out to every other session
  /// member.
  async fn handle_source_update(
    &mut self,
    room_id: &str,
    nick: &str,
    action: Action,
    contents: &[Content],
  ) -> Result<()> {
    let room_bare = bare_room_jid(room_id)?;
    let (parsed_sources, parsed_msids) = parse_sources(contents);

    let (conf_id, bridge, source_updates_data, mediastreams) = {
      let room = self.rooms.get_mut(room_id).context("room not tracked")?;
      let participant = room
        .participants
        .get_mut(nick)
        .context("jingle from an untracked participant")?;

      match action {
        Action::SourceRemove => {
          for (medium, removed) in &parsed_sources {
            if let Some(existing) = participant.sources.get_mut(medium) {
              let removed_ids: HashSet<u32> = removed.sources.iter().map(|s| s.id).collect();
              existing.sources.retain(|s| !removed_ids.contains(&s.id));
              existing
                .groups
                .retain(|g| !g.sources.iter().any(|s| removed_ids.contains(&s.id)));
            }
          }
          for msid in parsed_msids.keys() {
            participant.msids.remove(msid);
          }
        },
        Action::SessionAccept => {
          participant.sources = parsed_sources.clone();
          participant.msids = parsed_msids.clone();
        },
        _ => {
          for (medium, added) in &parsed_sources {
            let entry = participant.sources.entry(*medium).or_default();
            entry.sources.extend(added.sources.iter().cloned());
            entry.groups.extend(added.groups.iter().cloned());
          }
          for (msid, state) in &parsed_msids {
            participant.msids.insert(msid.clone(), state.clone());
          }
        },
      }

      let source_updates_data: Vec<(Medium, String, SourceSet)> = parsed_sources
        .keys()
        .filter_map(|medium| {
          participant.channels.get(medium).map(|channel_id| {
            (
              *medium,
              channel_id.clone(),
              participant.sources.get(medium).cloned().unwrap_or_default(),
            )
          })
        })
        .collect();

      let mut mediastreams = Vec::new();
      restamp_mediastreams(&mut mediastreams, &participant.msids);

      (
        room.conference_state.conference_id().map(str::to_owned),
        room.bridge.clone(),
        source_updates_data,
        mediastreams,
      )
    };

    if let (Some(conf_id), Some(bridge)) = (conf_id, bridge) {
      if !source_updates_data.is_empty() {
        let updates: Vec<(Medium, colibri_builders::ChannelUpdate)> = source_updates_data
          .iter()
          .map(|(medium, channel_id, sources)| {
            (
              *medium,
              colibri_builders::ChannelUpdate {
                endpoint: nick,
                channel_id: channel_id.as_str(),
                sources,
              },
            )
          })
          .collect();
        let conference = colibri_builders::build_update(&self.config, &conf_id, &[], &updates);
        let stanza: Element = Iq::from_set(generate_id(), conference)
          .with_from(room_token_jid(&room_bare))
          .with_to(bridge_jid(&bridge))
          .into();
        self.host.send(stanza).await?;
      }
    }

    self.host.republish_presence(room_id, nick, mediastreams).await?;

    let fan_action = match action {
      Action::SourceRemove => Action::SourceRemove,
      _ => Action::SourceAdd,
    };
    self
      .fan_out_source_delta(room_id, nick, fan_action, &parsed_sources)
      .await?;

    Ok(())
  }

  /// `session-info` `mute`/`unmute`: mutates the sender's `msids` entries
  /// (restricted to named mediastreams, or every msid they have if none
  /// are named) and republishes their presence. No Jingle fan-out.
  async fn handle_session_info(
    &mut self,
    room_id: &str,
    nick: &str,
    jingle: &jitsi_xmpp_parsers::jingle::Jingle,
  ) -> Result<()> {
    let mut mute_audio: Option<(bool, Vec<String>)> = None;
    let mut mute_video: Option<(bool, Vec<String>)> = None;

    for other in &jingle.other {
      if let Ok(mute) = Mute::try_from(other.clone()) {
        match mute.name {
          Some(Name::Audio) => record_mute_selector(&mut mute_audio, &mute.mediastreams, true),
          Some(Name::Video) => record_mute_selector(&mut mute_video, &mute.mediastreams, true),
          None => {
            record_mute_selector(&mut mute_audio, &mute.mediastreams, true);
            record_mute_selector(&mut mute_video, &mute.mediastreams, true);
          },
        }
      }
      else if let Ok(unmute) = Unmute::try_from(other.clone()) {
        match unmute.name {
          Some(Name::Audio) => record_mute_selector(&mut mute_audio, &unmute.mediastreams, false),
          Some(Name::Video) => record_mute_selector(&mut mute_video, &unmute.mediastreams, false),
          None => {
            record_mute_selector(&mut mute_audio, &unmute.mediastreams, false);
            record_mute_selector(&mut mute_video, &unmute.mediastreams, false);
          },
        }
      }
    }

    if mute_audio.is_none() && mute_video.is_none() {
      return Ok(());
    }

    let mediastreams = {
      let room = self.rooms.get_mut(room_id).context("room not tracked")?;
      let participant = room
        .participants
        .get_mut(nick)
        .context("session-info from an untracked participant")?;

      if let Some((muted, msids)) = &mute_audio {
        let targets: Vec<String> = if msids.is_empty() {
          participant.msids.keys().cloned().collect()
        }
        else {
          msids.clone()
        };
        for msid in targets {
          participant.msids.entry(msid).or_default().audio =
            Some(if *muted { MuteState::Muted } else { MuteState::Live });
        }
      }
      if let Some((muted, msids)) = &mute_video {
        let targets: Vec<String> = if msids.is_empty() {
          participant.msids.keys().cloned().collect()
        }
        else {
          msids.clone()
        };
        for msid in targets {
          participant.msids.entry(msid).or_default().video =
            Some(if *muted { MuteState::Muted } else { MuteState::Live });
        }
      }

      let mut mediastreams = Vec::new();
      restamp_mediastreams(&mut mediastreams, &participant.msids);
      mediastreams
    };

    self.host.republish_presence(room_id, nick, mediastreams).await?;
    Ok(())
  }

  /// Fans a source add/remove delta out to every *other* session member,
  /// each addressed with their own session id. No-ops if the delta is
  /// entirely empty (e.g. a source-remove naming sources that were never
  /// actually advertised — §9's open question on this is resolved as a
  /// harmless no-op rather than an error).
  async fn fan_out_source_delta(
    &mut self,
    room_id: &str,
    sender: &str,
    action: Action,
    delta: &HashMap<Medium, SourceSet>,
  ) -> Result<()> {
    let deltas: Vec<(Medium, SourceSet)> = delta.iter().map(|(m, s)| (*m, s.clone())).collect();
    if deltas.iter().all(|(_, s)| s.is_empty()) {
      return Ok(());
    }

    let room_bare = bare_room_jid(room_id)?;
    let recipients: Vec<(String, String)> = {
      let room = self.rooms.get(room_id).context("room not tracked")?;
      room
        .sessions
        .iter()
        .filter(|other| other.as_str() != sender)
        .filter_map(|other| {
          room
            .participants
            .get(other)
            .and_then(|p| p.session_id.clone())
            .map(|sid| (other.clone(), sid))
        })
        .collect()
    };

    for (other, session_id) in recipients {
      let jingle = match action {
        Action::SourceRemove => jingle_builders::build_source_remove(SessionId(session_id), &deltas),
        _ => jingle_builders::build_source_add(SessionId(session_id), &deltas),
      };
      let stanza: Element = Iq::from_set(generate_id(), jingle)
        .with_from(Jid::Full(focus_jid(&room_bare)))
        .with_to(Jid::Full(occupant_jid(&room_bare, &other)))
        .into();
      self.host.send(stanza).await?;
    }

    Ok(())
  }

  async fn send_expire(&mut self, room_id: &str, channels: &[(Medium, String)]) -> Result<()> {
    if channels.is_empty() {
      return Ok(());
    }
    let (conf_id, bridge) = {
      let room = self.rooms.get(room_id).context("room not tracked")?;
      (room.conference_state.conference_id().map(str::to_owned), room.bridge.clone())
    };
    let (Some(conf_id), Some(bridge)) = (conf_id, bridge)
    else {
      return Ok(());
    };
    let room_bare = bare_room_jid(room_id)?;
    let conference = colibri_builders::build_expire(&conf_id, channels);
    let stanza: Element = Iq::from_set(generate_id(), conference)
      .with_from(room_token_jid(&room_bare))
      .with_to(bridge_jid(&bridge))
      .into();
    self.host.send(stanza).await?;
    Ok(())
  }

  /// §4.4.2: defers to `linger_time` if configured, otherwise tears down
  /// immediately.
  async fn maybe_destroy(&mut self, room_id: &str) -> Result<()> {
    if self.config.linger_time.is_zero() {
      self.destroy(room_id).await
    }
    else {
      if let Some(room) = self.rooms.get_mut(room_id) {
        room.pending_destroy_since.get_or_insert_with(now_secs);
      }
      Ok(())
    }
  }

  /// §4.4.2 teardown. Idempotent: a room already gone is a no-op, and a
  /// room whose capable count has recovered (a rejoin during linger)
  /// cancels the pending destroy instead of tearing down.
  async fn destroy(&mut self, room_id: &str) -> Result<()> {
    let Some(room) = self.rooms.get(room_id)
    else {
      return Ok(());
    };
    if room.capable_count() >= self.config.min_participants as usize {
      if let Some(room) = self.rooms.get_mut(room_id) {
        room.pending_destroy_since = None;
      }
      return Ok(());
    }

    let room_bare = bare_room_jid(room_id)?;

    let broadcast = focus_stanza::build_broadcast(room_id, RoomMode::P2p)?;
    self.host.send(broadcast).await?;

    let session_members: Vec<(String, String)> = {
      let room = self.rooms.get(room_id).context("room missing during destroy")?;
      room
        .sessions
        .iter()
        .filter_map(|nick| {
          room
            .participants
            .get(nick)
            .and_then(|p| p.session_id.clone())
            .map(|sid| (nick.clone(), sid))
        })
        .collect()
    };
    for (nick, session_id) in &session_members {
      let reason = ReasonElement {
        reason: Reason::Success,
        texts: Default::default(),
      };
      let jingle = jingle_builders::build_session_terminate(SessionId(session_id.clone()), reason);
      let stanza: Element = Iq::from_set(generate_id(), jingle)
        .with_from(Jid::Full(focus_jid(&room_bare)))
        .with_to(Jid::Full(occupant_jid(&room_bare, nick)))
        .into();
      self.host.send(stanza).await?;
    }

    let all_channels: Vec<(Medium, String)> = {
      let room = self.rooms.get(room_id).context("room missing during destroy")?;
      room
        .participants
        .values()
        .flat_map(|p| p.channels.iter().map(|(m, id)| (*m, id.clone())))
        .chain(room.pending_expire_channels.iter().cloned())
        .collect()
    };
    self.send_expire(room_id, &all_channels).await?;

    self.correlations.clear_room(room_id);
    self.rooms.remove(room_id);

    Ok(())
  }

  /// §10.4 sweep: checks every room for a timed-out pending create and a
  /// matured linger-destroy, each handled independently. Intended to be
  /// driven by a `tokio::time::interval`, the way the teacher drives its
  /// stats-reporting loop.
  pub async fn sweep(&mut self) -> bool {
    match self.try_sweep().await {
      Ok(()) => true,
      Err(e) => {
        error!(error = ?e, "sweep failed");
        false
      },
    }
  }

  async fn try_sweep(&mut self) -> Result<()> {
    let now = now_secs();

    for room_id in self.rooms.ids() {
      let (pending_timed_out, destroy_due) = {
        let Some(room) = self.rooms.get(&room_id)
        else {
          continue;
        };
        let pending_timed_out = room.conference_state.is_pending()
          && room
            .pending_since
            .map_or(false, |since| now.saturating_sub(since) >= self.config.pending_create_timeout.as_secs());
        let destroy_due = room
          .pending_destroy_since
          .map_or(false, |since| now.saturating_sub(since) >= self.config.linger_time.as_secs());
        (pending_timed_out, destroy_due)
      };

      if pending_timed_out {
        self.handle_pending_create_timeout(&room_id).await?;
      }
      if destroy_due {
        self.destroy(&room_id).await?;
      }
    }

    Ok(())
  }

  async fn handle_pending_create_timeout(&mut self, room_id: &str) -> Result<()> {
    if let Some(bridge) = self.rooms.get(room_id).and_then(|r| r.bridge.clone()) {
      self.bridges.mark_unhealthy(&bridge);
    }
    self.correlations.clear_room(room_id);
    if let Some(room) = self.rooms.get_mut(room_id) {
      room.conference_state = ConferenceState::Absent;
      room.bridge = None;
      room.pending_since = None;
      room.pending_request_id = None;
    }
    warn!(room_id, "pending colibri request timed out; resetting and retrying against a different bridge");
    self.allocate_channels(room_id).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use jitsi_xmpp_parsers::{
    colibri::{Channel, Content as ColibriContent},
    jingle::{Content as JingleContent, Jingle},
    jingle_rtp::Description as RtpDescription,
    jingle_ssma::{Parameter, Source as SsrcSource},
  };
  use xmpp_parsers::jingle::{ContentId, Creator};

  use super::*;
  use crate::host::RecordingHost;

  fn test_config() -> FocusConfig {
    FocusConfig {
      media_bridge: "bridge.example.org".into(),
      focus_domain: "focus.example.org".into(),
      feature_datachannel: true,
      feature_bundle: true,
      feature_rtx: false,
      pubsub_service: None,
      pubsub_node: "videobridge".into(),
      min_participants: 2,
      linger_time: Duration::from_secs(0),
      bridge_liveliness: Duration::from_secs(60),
      pending_create_timeout: Duration::from_secs(15),
    }
  }

  fn addr(nick: &str) -> BareJid {
    format!("{}@example.org", nick).parse().unwrap()
  }

  fn bridged_presence() -> Presence {
    let mut presence = Presence::new(xmpp_parsers::presence::Type::None);
    presence
      .payloads
      .push(Element::builder("conf", jitsi_xmpp_parsers::ns::MMUC).attr("bridged", "1").build());
    presence
  }

  fn content_with_source(media: &str, ssrc: u32, msid: Option<&str>) -> JingleContent {
    let mut source = SsrcSource::new(ssrc);
    if let Some(msid) = msid {
      source.parameters.push(Parameter {
        name: "msid".to_owned(),
        value: Some(format!("{} track1", msid)),
      });
    }
    let mut description = RtpDescription::new(media.to_owned());
    description.ssrcs.push(source);
    JingleContent::new(Creator::Initiator, ContentId(media.to_owned())).with_description(description)
  }

  fn reply_channel(endpoint: &str, channel_id: &str) -> Channel {
    let mut channel = Channel::new_request(endpoint.to_owned());
    channel.id = Some(channel_id.to_owned());
    channel
  }

  fn colibri_reply(
    request_id: &str,
    room_id: &str,
    bridge: &str,
    conf_id: &str,
    endpoints: &[(&str, &str, &str)],
  ) -> Iq {
    let room_bare: BareJid = room_id.parse().unwrap();
    let mut audio = ColibriContent::new("audio");
    let mut video = ColibriContent::new("video");
    for (nick, audio_id, video_id) in endpoints {
      audio = audio.with_channel(reply_channel(nick, audio_id));
      video = video.with_channel(reply_channel(nick, video_id));
    }
    let conference = Conference::new().with_id(conf_id).with_content(audio).with_content(video);
    Iq::from_result(request_id.to_owned(), Some(conference))
      .with_from(bridge_jid(bridge))
      .with_to(room_token_jid(&room_bare))
  }

  async fn latest_conference_request_id(host: &RecordingHost) -> String {
    let sent = host.sent.lock().await;
    sent
      .iter()
      .rev()
      .find_map(|el| {
        if el.name() != "iq" {
          return None;
        }
        el.children()
          .find(|c| c.name() == "conference")
          .map(|_| el.attr("id").unwrap().to_owned())
      })
      .expect("no outstanding colibri request found")
  }

  fn jingle_action(el: &Element) -> Option<&str> {
    el.children().find(|c| c.name() == "jingle").and_then(|j| j.attr("action"))
  }

  #[tokio::test]
  async fn solo_join_below_threshold_sends_only_p2p_presence() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    assert!(controller.pre_join(room, "alice", &addr("alice"), &bridged_presence()).await);
    assert!(controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await);

    let sent = host.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|el| el.name() == "message"));
    assert_eq!(sent[0].attr("type"), Some("groupchat"));

    let room_state = controller.rooms().get(room).unwrap();
    assert_eq!(room_state.conference_state, ConferenceState::Absent);
  }

  #[tokio::test]
  async fn second_capable_join_crosses_threshold_and_sends_one_create() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.pre_join(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.pre_join(room, "bob", &addr("bob"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;

    let sent = host.sent.lock().await;
    let iqs: Vec<_> = sent.iter().filter(|el| el.name() == "iq").collect();
    assert_eq!(iqs.len(), 1);
    assert_eq!(iqs[0].attr("type"), Some("set"));

    assert!(controller.rooms().get(room).unwrap().conference_state.is_pending());
  }

  #[tokio::test]
  async fn join_crossing_threshold_then_colibri_reply_initiates_both_sessions() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;

    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    assert!(controller.colibri_result(&reply).await);

    let room_state = controller.rooms().get(room).unwrap();
    assert_eq!(room_state.conference_state, ConferenceState::Assigned("conf1".to_owned()));
    assert_eq!(room_state.sessions.len(), 2);
    assert_eq!(room_state.participants["alice"].channels[&Medium::Audio], "ch-a-audio");

    let sent = host.sent.lock().await;
    let initiates: Vec<_> = sent.iter().filter(|el| jingle_action(el) == Some("session-initiate")).collect();
    assert_eq!(initiates.len(), 2);
  }

  #[tokio::test]
  async fn colibri_result_without_bundling_reads_the_per_channel_transport() {
    let mut config = test_config();
    config.feature_bundle = false;
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(config, host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;

    let room_bare: BareJid = room.parse().unwrap();
    let mut alice_channel = reply_channel("alice", "ch-a-audio");
    alice_channel.transport = Some({
      let mut transport = IceUdpTransport::new();
      transport.ufrag = Some("aliceufrag".to_owned());
      transport
    });
    let mut audio = ColibriContent::new("audio");
    audio = audio.with_channel(alice_channel);
    audio = audio.with_channel(reply_channel("bob", "ch-b-audio"));
    let conference = Conference::new().with_id("conf1").with_content(audio);
    let reply = Iq::from_result(request_id, Some(conference))
      .with_from(bridge_jid("bridge.example.org"))
      .with_to(room_token_jid(&room_bare));

    assert!(controller.colibri_result(&reply).await);

    let sent = host.sent.lock().await;
    let initiate = sent
      .iter()
      .find(|el| jingle_action(el) == Some("session-initiate") && el.attr("to") == Some("room1@conference.example.org/alice"))
      .expect("no session-initiate sent to alice");
    let jingle = initiate.children().find(|c| c.name() == "jingle").unwrap();
    let transport = jingle
      .children()
      .find(|c| c.name() == "content")
      .and_then(|content| content.children().find(|c| c.name() == "transport"))
      .expect("content carries no transport");
    assert_eq!(transport.attr("ufrag"), Some("aliceufrag"));
  }

  #[tokio::test]
  async fn join_during_pending_create_is_queued_and_gets_a_followup_update() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    controller.joined(room, "carol", &addr("carol"), &bridged_presence()).await;

    assert_eq!(
      controller.rooms().get(room).unwrap().pending_join_queue,
      vec!["carol".to_string()]
    );

    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;

    let sent = host.sent.lock().await;
    let conference_iqs: Vec<_> = sent.iter().filter(|el| el.children().any(|c| c.name() == "conference")).collect();
    assert_eq!(conference_iqs.len(), 2);

    let room_state = controller.rooms().get(room).unwrap();
    assert!(room_state.pending_join_queue.is_empty());
    assert!(room_state.conference_state.is_pending());
  }

  #[tokio::test]
  async fn session_accept_fans_out_source_add_and_restamps_presence() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;
    host.sent.lock().await.clear();

    let mut accept = Jingle::new(Action::SessionAccept, SessionId("sid-a".into()));
    accept = accept.add_content(content_with_source("audio", 1, Some("m1")));
    accept = accept.add_content(content_with_source("video", 2, Some("m1")));

    assert!(controller.jingle(room, "alice", "iq1", &accept).await);

    let sent = host.sent.lock().await;
    let source_adds: Vec<_> = sent.iter().filter(|el| jingle_action(el) == Some("source-add")).collect();
    assert_eq!(source_adds.len(), 1);
    let updates: Vec<_> = sent.iter().filter(|el| el.children().any(|c| c.name() == "conference")).collect();
    assert_eq!(updates.len(), 1);

    let republished = host.republished.lock().await;
    assert_eq!(republished.len(), 1);
    assert_eq!(republished[0].0, room);
    assert_eq!(republished[0].1, "alice");
    assert!(republished[0]
      .2
      .iter()
      .any(|el| el.attr("msid") == Some("m1") && el.attr("audio") == Some("true") && el.attr("video") == Some("true")));
  }

  #[tokio::test]
  async fn session_info_mute_updates_msid_state_without_jingle_fanout() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;

    let mut accept = Jingle::new(Action::SessionAccept, SessionId("sid-a".into()));
    accept = accept.add_content(content_with_source("audio", 1, Some("m1")));
    controller.jingle(room, "alice", "iqX", &accept).await;

    host.sent.lock().await.clear();
    host.republished.lock().await.clear();

    let mute = Mute {
      name: Some(Name::Audio),
      mediastreams: vec![Mediastream::new("m1")],
    };
    let mut info = Jingle::new(Action::SessionInfo, SessionId("sid-a".into()));
    info.other.push(mute.into());

    assert!(controller.jingle(room, "alice", "iq2", &info).await);

    let room_state = controller.rooms().get(room).unwrap();
    assert_eq!(room_state.participants["alice"].msids["m1"].audio, Some(MuteState::Muted));

    let sent = host.sent.lock().await;
    assert!(sent
      .iter()
      .all(|el| !matches!(jingle_action(el), Some("source-add") | Some("source-remove"))));

    let republished = host.republished.lock().await;
    assert_eq!(republished.len(), 1);
  }

  #[tokio::test]
  async fn leaving_with_sources_fans_out_remove_and_expires_channels() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    controller.joined(room, "carol", &addr("carol"), &bridged_presence()).await;

    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;

    let followup_id = latest_conference_request_id(&host).await;
    let reply2 = colibri_reply(&followup_id, room, "bridge.example.org", "conf1", &[("carol", "ch-c-audio", "ch-c-video")]);
    controller.colibri_result(&reply2).await;

    let mut accept = Jingle::new(Action::SessionAccept, SessionId("sid-a".into()));
    accept = accept.add_content(content_with_source("audio", 1, Some("m1")));
    controller.jingle(room, "alice", "iqX", &accept).await;

    host.sent.lock().await.clear();
    host.republished.lock().await.clear();

    assert!(controller.left(room, "alice").await);

    let sent = host.sent.lock().await;
    let source_removes: Vec<_> = sent.iter().filter(|el| jingle_action(el) == Some("source-remove")).collect();
    assert_eq!(source_removes.len(), 2);
    let expires: Vec<_> = sent.iter().filter(|el| el.children().any(|c| c.name() == "conference")).collect();
    assert_eq!(expires.len(), 1);

    let room_state = controller.rooms().get(room).unwrap();
    assert_eq!(room_state.capable_count(), 2);
    assert!(!room_state.participants.contains_key("alice"));
  }

  #[tokio::test]
  async fn teardown_triggers_when_capable_count_drops_below_minimum() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;

    host.sent.lock().await.clear();

    assert!(controller.left(room, "bob").await);

    let sent = host.sent.lock().await;
    assert!(sent.iter().any(|el| el.name() == "message" && el.attr("to") == Some(room)));
    let terminates: Vec<_> = sent.iter().filter(|el| jingle_action(el) == Some("session-terminate")).collect();
    assert_eq!(terminates.len(), 1);
    let expires: Vec<_> = sent.iter().filter(|el| el.children().any(|c| c.name() == "conference")).collect();
    assert_eq!(expires.len(), 1);

    assert!(controller.rooms().get(room).is_none());
  }

  #[tokio::test]
  async fn pre_join_rejects_a_duplicate_session_from_the_same_address() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;
    let reply = colibri_reply(
      &request_id,
      room,
      "bridge.example.org",
      "conf1",
      &[("alice", "ch-a-audio", "ch-a-video"), ("bob", "ch-b-audio", "ch-b-video")],
    );
    controller.colibri_result(&reply).await;
    host.sent.lock().await.clear();

    assert!(controller.pre_join(room, "alice2", &addr("alice"), &bridged_presence()).await);

    let sent = host.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name(), "presence");
    assert_eq!(sent[0].attr("type"), Some("error"));
  }

  #[tokio::test]
  async fn sweep_resets_a_timed_out_pending_room_and_retries() {
    let mut config = test_config();
    config.pending_create_timeout = Duration::from_secs(0);
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(config, host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    assert!(controller.rooms().get(room).unwrap().conference_state.is_pending());
    host.sent.lock().await.clear();

    assert!(controller.sweep().await);

    let sent = host.sent.lock().await;
    assert_eq!(sent.iter().filter(|el| el.name() == "iq").count(), 1);
    assert!(controller.rooms().get(room).unwrap().conference_state.is_pending());
  }

  #[tokio::test]
  async fn colibri_error_marks_bridge_unhealthy_and_retries() {
    let host = Arc::new(RecordingHost::default());
    let mut controller = FocusController::new(test_config(), host.clone());
    let room = "room1@conference.example.org";

    controller.joined(room, "alice", &addr("alice"), &bridged_presence()).await;
    controller.joined(room, "bob", &addr("bob"), &bridged_presence()).await;
    let request_id = latest_conference_request_id(&host).await;
    host.sent.lock().await.clear();

    let error = StanzaError::new(ErrorType::Cancel, DefinedCondition::InternalServerError, "en", "boom");
    let error_iq = Iq::from_error(request_id, error).with_from(bridge_jid("bridge.example.org"));

    assert!(controller.colibri_error(&error_iq).await);

    let sent = host.sent.lock().await;
    assert_eq!(sent.iter().filter(|el| el.name() == "iq").count(), 1);
    assert!(controller.rooms().get(room).unwrap().conference_state.is_pending());
  }
}
