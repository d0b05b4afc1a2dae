//! Bridge Selector: tracks freshness-scored statistics per bridge and picks
//! the least-loaded live one for a new room.

use std::{collections::HashMap, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeStats {
  pub upload_bitrate: f64,
  pub download_bitrate: f64,
  pub cpu: f64,
  pub participant_count: u64,
  /// Seconds since the epoch when this sample was taken.
  pub timestamp: u64,
}

#[derive(Debug, Clone)]
struct BridgeEntry {
  stats: BridgeStats,
  /// Set by the pending-create timeout sweep on a COLIBRI error reply, to
  /// exclude a misbehaving bridge before its liveness window naturally lapses.
  unhealthy: bool,
}

/// Holds the last known stats for every bridge this focus has heard from.
pub struct BridgeSelector {
  default_bridge: String,
  liveness_window: Duration,
  bridges: HashMap<String, BridgeEntry>,
}

impl BridgeSelector {
  pub fn new(default_bridge: impl Into<String>, liveness_window: Duration) -> BridgeSelector {
    BridgeSelector {
      default_bridge: default_bridge.into(),
      liveness_window,
      bridges: HashMap::new(),
    }
  }

  pub fn update_stats(&mut self, bridge: impl Into<String>, stats: BridgeStats) {
    let entry = self.bridges.entry(bridge.into()).or_insert_with(|| BridgeEntry {
      stats: stats.clone(),
      unhealthy: false,
    });
    entry.stats = stats;
    entry.unhealthy = false;
  }

  /// Marks a bridge as unhealthy, excluding it from selection until its
  /// stats next refresh.
  pub fn mark_unhealthy(&mut self, bridge: &str) {
    if let Some(entry) = self.bridges.get_mut(bridge) {
      entry.unhealthy = true;
    }
  }

  fn is_live(&self, entry: &BridgeEntry, now: u64) -> bool {
    !entry.unhealthy && now.saturating_sub(entry.stats.timestamp) < self.liveness_window.as_secs()
  }

  /// Picks a bridge for a new room: the live bridge minimizing
  /// `upload_bitrate + download_bitrate`, ties broken by lowest
  /// `participant_count` then lexicographic bridge id. Falls back to the
  /// configured default bridge if none are live.
  pub fn select(&self, now: u64) -> String {
    let mut candidates: Vec<(&String, &BridgeEntry)> = self
      .bridges
      .iter()
      .filter(|(_, entry)| self.is_live(entry, now))
      .collect();

    candidates.sort_by(|(id_a, a), (id_b, b)| {
      let load_a = a.stats.upload_bitrate + a.stats.download_bitrate;
      let load_b = b.stats.upload_bitrate + b.stats.download_bitrate;
      load_a
        .partial_cmp(&load_b)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.stats.participant_count.cmp(&b.stats.participant_count))
        .then_with(|| id_a.cmp(id_b))
    });

    candidates
      .first()
      .map(|(id, _)| (*id).clone())
      .unwrap_or_else(|| self.default_bridge.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stats(upload: f64, download: f64, participant_count: u64, timestamp: u64) -> BridgeStats {
    BridgeStats {
      upload_bitrate: upload,
      download_bitrate: download,
      cpu: 0.0,
      participant_count,
      timestamp,
    }
  }

  #[test]
  fn falls_back_to_default_bridge_when_nothing_is_live() {
    let selector = BridgeSelector::new("default.example.org", Duration::from_secs(60));
    assert_eq!(selector.select(1000), "default.example.org");
  }

  #[test]
  fn picks_the_least_loaded_live_bridge() {
    let mut selector = BridgeSelector::new("default.example.org", Duration::from_secs(60));
    selector.update_stats("heavy.example.org", stats(500.0, 500.0, 10, 1000));
    selector.update_stats("light.example.org", stats(10.0, 10.0, 1, 1000));
    assert_eq!(selector.select(1000), "light.example.org");
  }

  #[test]
  fn ignores_stale_bridges() {
    let mut selector = BridgeSelector::new("default.example.org", Duration::from_secs(60));
    selector.update_stats("stale.example.org", stats(1.0, 1.0, 1, 0));
    assert_eq!(selector.select(1000), "default.example.org");
  }

  #[test]
  fn excludes_bridges_marked_unhealthy() {
    let mut selector = BridgeSelector::new("default.example.org", Duration::from_secs(60));
    selector.update_stats("flaky.example.org", stats(1.0, 1.0, 1, 1000));
    selector.mark_unhealthy("flaky.example.org");
    assert_eq!(selector.select(1000), "default.example.org");
  }

  #[test]
  fn breaks_ties_by_participant_count_then_id() {
    let mut selector = BridgeSelector::new("default.example.org", Duration::from_secs(60));
    selector.update_stats("b.example.org", stats(10.0, 10.0, 5, 1000));
    selector.update_stats("a.example.org", stats(10.0, 10.0, 5, 1000));
    assert_eq!(selector.select(1000), "a.example.org");
  }
}
