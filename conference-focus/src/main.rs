//! Process entry point: load configuration, start the sweep loop (§10.4),
//! and run until interrupted. Wiring a [`Host`] up to a real XMPP
//! connection is left to whoever embeds this crate — the hosting XMPP
//! server is out of scope for the focus agent itself (spec §1) — so this
//! binary drives the controller with a logging stand-in, the way
//! `gst-meet`'s own binary is a thin CLI shell around `lib-gst-meet`.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use lib_conference_focus::{init_tracing, FocusConfig, FocusController, Host};
use structopt::StructOpt;
use tokio::signal::ctrl_c;
use tracing::info;
use xmpp_parsers::Element;

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "conference-focus", about = "Run a conference focus agent.")]
struct Opt {
  #[structopt(long, help = "Path to a config file layered under FOCUS_* environment variables")]
  config: Option<String>,

  #[structopt(short, long, parse(from_occurrences))]
  verbose: u8,
}

/// Logs every outbound stanza instead of sending it anywhere. A real
/// deployment replaces this with a `Host` backed by the hosting XMPP
/// connection.
struct LoggingHost;

#[async_trait]
impl Host for LoggingHost {
  async fn send(&self, stanza: Element) -> Result<()> {
    info!(stanza = %String::from(&stanza), "would send stanza");
    Ok(())
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let opt = Opt::from_args();

  init_tracing(match opt.verbose {
    0 => tracing::Level::INFO,
    1 => tracing::Level::DEBUG,
    _ => tracing::Level::TRACE,
  });

  let config = FocusConfig::load(opt.config.as_deref()).context("failed to load configuration")?;
  info!(?config, "loaded configuration");

  let mut controller = FocusController::new(config.clone(), Arc::new(LoggingHost));
  let sweep_interval = Duration::from_secs(5);

  let mut interval = tokio::time::interval(sweep_interval);
  loop {
    tokio::select! {
      _ = interval.tick() => {
        controller.sweep().await;
      },
      _ = ctrl_c() => {
        info!("exiting");
        break;
      },
    }
  }

  Ok(())
}
