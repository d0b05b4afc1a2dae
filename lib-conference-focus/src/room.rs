//! Per-room state: participants, channel and source bookkeeping, and the
//! conference's relationship with its selected bridge.

use std::collections::{HashMap, HashSet};

use jid::BareJid;
use jitsi_xmpp_parsers::jingle_ssma::{Group as SsrcGroup, Source as SsrcSource};

/// The three media kinds a room may allocate channels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Medium {
  Audio,
  Video,
  Data,
}

impl Medium {
  pub fn as_str(self) -> &'static str {
    match self {
      Medium::Audio => "audio",
      Medium::Video => "video",
      Medium::Data => "data",
    }
  }

  pub fn from_name(name: &str) -> Option<Medium> {
    match name {
      "audio" => Some(Medium::Audio),
      "video" => Some(Medium::Video),
      "data" => Some(Medium::Data),
      _ => None,
    }
  }
}

/// Where a room stands with respect to the bridge conference that backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConferenceState {
  /// No conference has been requested from the bridge yet.
  Absent,
  /// A create or update is in flight; no further requests may be issued.
  Pending,
  /// The bridge has acknowledged creation; this is its conference id.
  Assigned(String),
}

impl ConferenceState {
  pub fn is_pending(&self) -> bool {
    matches!(self, ConferenceState::Pending)
  }

  pub fn conference_id(&self) -> Option<&str> {
    match self {
      ConferenceState::Assigned(id) => Some(id.as_str()),
      _ => None,
    }
  }
}

/// The advertised sources for one medium of one participant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSet {
  pub sources: Vec<SsrcSource>,
  pub groups: Vec<SsrcGroup>,
}

impl SourceSet {
  pub fn is_empty(&self) -> bool {
    self.sources.is_empty() && self.groups.is_empty()
  }
}

/// Mute state for one msid, per medium.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsidState {
  pub audio: Option<MuteState>,
  pub video: Option<MuteState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteState {
  Live,
  Muted,
}

impl MuteState {
  pub fn as_str(self) -> &'static str {
    match self {
      MuteState::Live => "true",
      MuteState::Muted => "muted",
    }
  }
}

/// One occupant of a room, as known to the focus.
#[derive(Debug, Clone)]
pub struct Participant {
  /// The occupant's real (non-MUC) address, used to reject duplicate sessions.
  pub real_address: BareJid,
  /// Whether the joining presence advertised bridged-media capability.
  pub bridged: bool,
  /// Bridge-assigned channel id per medium, once allocated.
  pub channels: HashMap<Medium, String>,
  /// Advertised sources per medium.
  pub sources: HashMap<Medium, SourceSet>,
  /// Mute/live state per msid.
  pub msids: HashMap<String, MsidState>,
  /// The Jingle session id this participant's session-initiate was sent
  /// with, once they have an active session. Every later source-add/
  /// source-remove/session-terminate to them reuses this id.
  pub session_id: Option<String>,
}

impl Participant {
  pub fn new(real_address: BareJid, bridged: bool) -> Participant {
    Participant {
      real_address,
      bridged,
      channels: HashMap::new(),
      sources: HashMap::new(),
      msids: HashMap::new(),
      session_id: None,
    }
  }

  pub fn has_channels(&self) -> bool {
    !self.channels.is_empty()
  }
}

/// Per-room state: the single source of truth the controller mutates.
#[derive(Debug, Clone)]
pub struct Room {
  pub conference_state: ConferenceState,
  pub bridge: Option<String>,
  pub participants: HashMap<String, Participant>,
  /// Join order, oldest first; used to keep fan-out and offer construction
  /// deterministic within a turn.
  pub join_order: Vec<String>,
  pub sessions: HashSet<String>,
  pub pending_join_queue: Vec<String>,
  /// The correlation id for the in-flight COLIBRI request, if any.
  pub pending_request_id: Option<String>,
  /// Wall-clock instant (seconds since epoch) the room entered `Pending`,
  /// used by the pending-create timeout sweep.
  pub pending_since: Option<u64>,
  /// Wall-clock instant the capable count first dropped below the
  /// minimum, set only when `linger_time > 0`; the sweep re-checks the
  /// precondition once this plus the linger has elapsed.
  pub pending_destroy_since: Option<u64>,
  /// Channels of participants who left while teardown was already under
  /// way (or deferred behind `linger_time`); folded into the single
  /// expire `destroy` eventually sends for the whole room, so a leaver
  /// isn't expired once on their own and again as part of teardown.
  pub pending_expire_channels: Vec<(Medium, String)>,
}

impl Default for Room {
  fn default() -> Self {
    Room {
      conference_state: ConferenceState::Absent,
      bridge: None,
      participants: HashMap::new(),
      join_order: Vec::new(),
      sessions: HashSet::new(),
      pending_join_queue: Vec::new(),
      pending_request_id: None,
      pending_since: None,
      pending_destroy_since: None,
      pending_expire_channels: Vec::new(),
    }
  }
}

impl Room {
  pub fn new() -> Room {
    Room::default()
  }

  pub fn capable_count(&self) -> usize {
    self.participants.values().filter(|p| p.bridged).count()
  }

  pub fn capable_nicknames(&self) -> Vec<String> {
    self
      .join_order
      .iter()
      .filter(|nick| {
        self
          .participants
          .get(*nick)
          .map_or(false, |p| p.bridged)
      })
      .cloned()
      .collect()
  }

  pub fn is_empty_of_state(&self) -> bool {
    self.participants.is_empty()
      && self.sessions.is_empty()
      && self.pending_join_queue.is_empty()
      && self.pending_expire_channels.is_empty()
      && matches!(self.conference_state, ConferenceState::Absent)
  }

  pub fn clear(&mut self) {
    *self = Room::default();
  }

  /// Sources already advertised by every *other* session member, merged per
  /// medium. Used to build the cumulative remote offer for a newly-sessioned
  /// participant (§4.4, `colibri_result`) — `nick`'s own sources are never
  /// included.
  pub fn merged_sources_excluding(&self, nick: &str) -> Vec<(Medium, SourceSet)> {
    let mut merged: HashMap<Medium, SourceSet> = HashMap::new();
    for other in &self.join_order {
      if other == nick || !self.sessions.contains(other) {
        continue;
      }
      let Some(participant) = self.participants.get(other) else {
        continue;
      };
      for (medium, set) in &participant.sources {
        let entry = merged.entry(*medium).or_default();
        entry.sources.extend(set.sources.iter().cloned());
        entry.groups.extend(set.groups.iter().cloned());
      }
    }
    [Medium::Audio, Medium::Video, Medium::Data]
      .into_iter()
      .map(|medium| (medium, merged.remove(&medium).unwrap_or_default()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn jid(s: &str) -> BareJid {
    s.parse().unwrap()
  }

  #[test]
  fn capable_count_ignores_non_bridged_participants() {
    let mut room = Room::new();
    room
      .participants
      .insert("a".into(), Participant::new(jid("a@example.org"), true));
    room
      .participants
      .insert("b".into(), Participant::new(jid("b@example.org"), false));
    room.join_order = vec!["a".into(), "b".into()];
    assert_eq!(room.capable_count(), 1);
    assert_eq!(room.capable_nicknames(), vec!["a".to_string()]);
  }

  #[test]
  fn clear_resets_to_a_fresh_room() {
    let mut room = Room::new();
    room.conference_state = ConferenceState::Assigned("conf1".into());
    room.bridge = Some("bridge.example.org".into());
    room.clear();
    assert_eq!(room.conference_state, ConferenceState::Absent);
    assert!(room.bridge.is_none());
  }

  #[test]
  fn merged_sources_excludes_self_and_non_session_members() {
    use jitsi_xmpp_parsers::jingle_ssma::Source as SsrcSource;

    let mut room = Room::new();
    let mut a = Participant::new(jid("a@example.org"), true);
    a.sources.insert(
      Medium::Audio,
      SourceSet {
        sources: vec![SsrcSource::new(1)],
        groups: vec![],
      },
    );
    let mut b = Participant::new(jid("b@example.org"), true);
    b.sources.insert(
      Medium::Audio,
      SourceSet {
        sources: vec![SsrcSource::new(2)],
        groups: vec![],
      },
    );
    let c = Participant::new(jid("c@example.org"), true);

    room.join_order = vec!["a".into(), "b".into(), "c".into()];
    room.participants.insert("a".into(), a);
    room.participants.insert("b".into(), b);
    room.participants.insert("c".into(), c);
    room.sessions.insert("a".into());
    room.sessions.insert("b".into());

    let merged = room.merged_sources_excluding("a");
    let audio = merged.iter().find(|(m, _)| *m == Medium::Audio).unwrap();
    assert_eq!(audio.1.sources.len(), 1);
    assert_eq!(audio.1.sources[0].id, 2);
  }
}
