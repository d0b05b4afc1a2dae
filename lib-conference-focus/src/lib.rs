//! A conference focus agent: the process that sits between a Jitsi-style
//! MUC and one or more COLIBRI bridges, translating room membership and
//! Jingle signalling into bridge channel allocations and back.
//!
//! This crate is transport-agnostic: it never opens an XMPP connection
//! itself. A [`host::Host`] implementation supplies the wire, and
//! [`controller::FocusController`] is the state machine driven by room and
//! stanza events.

pub mod bridge;
pub mod codecs;
pub mod config;
pub mod controller;
pub mod correlation;
pub mod host;
pub(crate) mod parse;
pub mod presence;
pub mod registry;
pub mod room;
pub mod stanza;
pub mod stats;
pub(crate) mod token;
pub(crate) mod util;

pub use crate::{
  bridge::{BridgeSelector, BridgeStats},
  config::FocusConfig,
  controller::FocusController,
  host::Host,
  room::{ConferenceState, Medium, Participant, Room},
};

#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing(level: tracing::Level) {
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
    .with_target(false)
    .init();
}
