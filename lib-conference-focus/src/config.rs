//! Typed configuration, loaded from an optional file layered under
//! `FOCUS_*`-prefixed environment variables, mirroring §6's flat
//! configuration table.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_min_participants() -> u32 {
  2
}

fn default_bundle() -> bool {
  true
}

fn default_datachannel() -> bool {
  true
}

fn default_rtx() -> bool {
  false
}

fn default_pubsub_node() -> String {
  "videobridge".to_owned()
}

fn default_linger_time() -> Duration {
  Duration::from_secs(0)
}

fn default_bridge_liveliness() -> Duration {
  Duration::from_secs(60)
}

fn default_pending_create_timeout() -> Duration {
  Duration::from_secs(15)
}

/// The focus agent's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FocusConfig {
  /// `focus_media_bridge`: default bridge identifier used when no live
  /// bridge is known.
  pub media_bridge: String,

  /// Supplemented (§10.7): the domain this focus component answers to,
  /// used as the domain part of the `from`/`to` addresses of the Jingle
  /// IQs it sends, and of the room token it presents to the bridge as a
  /// COLIBRI request's `from` (see `token::encode`). Not named by the
  /// distilled spec's configuration table, which only describes the
  /// bridge-facing side; any focus deployment still needs to know its own
  /// component address.
  pub focus_domain: String,

  /// `focus_feature_datachannel` (default on): include a data content with
  /// SCTP connections.
  #[serde(default = "default_datachannel")]
  pub feature_datachannel: bool,

  /// `focus_feature_bundle` (default on): attach `channel-bundle-id` per
  /// channel and emit a grouping element.
  #[serde(default = "default_bundle")]
  pub feature_bundle: bool,

  /// `focus_feature_rtx` (default off): add an `rtx` payload type bound to
  /// VP8.
  #[serde(default = "default_rtx")]
  pub feature_rtx: bool,

  /// `focus_pubsub_service`: the stats feed's pub/sub service address.
  pub pubsub_service: Option<String>,

  /// `focus_pubsub_node` (default `videobridge`): the stats feed's node.
  #[serde(default = "default_pubsub_node")]
  pub pubsub_node: String,

  /// `focus_min_participants` (default 2): threshold to start relaying.
  #[serde(default = "default_min_participants")]
  pub min_participants: u32,

  /// `focus_linger_time` (default 0s): grace period before teardown.
  #[serde(default = "default_linger_time", with = "humantime_serde")]
  pub linger_time: Duration,

  /// `focus_bridge_liveliness` (default 60s): staleness window for bridge
  /// stats.
  #[serde(default = "default_bridge_liveliness", with = "humantime_serde")]
  pub bridge_liveliness: Duration,

  /// How long a room may sit in `pending` before the sweep in §10.4 resets
  /// it and re-triggers allocation against a different bridge.
  #[serde(default = "default_pending_create_timeout", with = "humantime_serde")]
  pub pending_create_timeout: Duration,
}

impl FocusConfig {
  /// Loads configuration from an optional file path, then `FOCUS_*`
  /// environment variables, the way `instrumentisto-medea` layers its own
  /// settings.
  pub fn load(file: Option<&str>) -> Result<FocusConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
      builder = builder.add_source(config::File::with_name(path).required(true));
    }
    builder
      .add_source(config::Environment::with_prefix("FOCUS").separator("_"))
      .build()
      .with_context(|| match file {
        Some(path) => format!("failed to read config file {}", path),
        None => "failed to read FOCUS_* environment variables".to_owned(),
      })?
      .try_deserialize()
      .context("configuration is missing required fields or has an invalid value")
  }
}
