//! Stats Ingester: turns pub/sub headline notifications from a bridge's
//! stats feed into updates against the Bridge Selector.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};
use xmpp_parsers::{message::Message, Element};

use crate::bridge::{BridgeSelector, BridgeStats};

/// Parses one `<stats xmlns="http://jitsi.org/protocol/colibri">` payload
/// (as carried inside a pub/sub `item`) into a bridge stats sample,
/// discarding any non-numeric field other than the wall-clock timestamp
/// this function stamps itself.
pub fn parse_stats(stats_element: &Element) -> BridgeStats {
  let mut upload_bitrate = 0.0;
  let mut download_bitrate = 0.0;
  let mut cpu = 0.0;
  let mut participant_count = 0;

  for stat in stats_element.children().filter(|el| el.name() == "stat") {
    let (Some(name), Some(value)) = (stat.attr("name"), stat.attr("value")) else {
      continue;
    };
    match name {
      "bit_rate_upload" => {
        if let Ok(value) = value.parse() {
          upload_bitrate = value;
        }
      }
      "bit_rate_download" => {
        if let Ok(value) = value.parse() {
          download_bitrate = value;
        }
      }
      "cpu_usage" => {
        if let Ok(value) = value.parse() {
          cpu = value;
        }
      }
      "participants" => {
        if let Ok(value) = value.parse() {
          participant_count = value;
        }
      }
      _ => debug!(field = name, "ignoring unrecognised bridge stat"),
    }
  }

  let timestamp = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);

  BridgeStats {
    upload_bitrate,
    download_bitrate,
    cpu,
    participant_count,
    timestamp,
  }
}

/// Handles one incoming pub/sub event message, updating `selector` if it
/// carries a recognised stats payload published by `bridge`.
pub fn handle_event_message(selector: &mut BridgeSelector, bridge: &str, message: &Message) {
  for payload in &message.payloads {
    if !payload.is("event", "http://jabber.org/protocol/pubsub#event") {
      continue;
    }
    for items in payload.children().filter(|el| el.name() == "items") {
      for item in items.children().filter(|el| el.name() == "item") {
        for stats in item.children().filter(|el| el.name() == "stats") {
          let stats = parse_stats(stats);
          debug!(bridge, ?stats, "updated bridge stats");
          selector.update_stats(bridge.to_owned(), stats);
        }
      }
    }
  }
}

/// Reports a bridge as unreachable; called when a COLIBRI request to it
/// fails rather than waiting for the liveliness window to expire.
pub fn handle_bridge_error(selector: &mut BridgeSelector, bridge: &str) {
  warn!(bridge, "bridge reported an error, marking unhealthy");
  selector.mark_unhealthy(bridge);
}

#[cfg(test)]
mod tests {
  use xmpp_parsers::Element;

  use super::*;

  #[test]
  fn parse_stats_reads_known_numeric_fields_and_ignores_the_rest() {
    let stats: Element = "
      <stats xmlns='http://jitsi.org/protocol/colibri'>
        <stat name='bit_rate_upload' value='128.5'/>
        <stat name='bit_rate_download' value='256.0'/>
        <stat name='cpu_usage' value='0.42'/>
        <stat name='participants' value='7'/>
        <stat name='region' value='eu-west'/>
      </stats>
    "
    .parse()
    .unwrap();

    let parsed = parse_stats(&stats);
    assert_eq!(parsed.upload_bitrate, 128.5);
    assert_eq!(parsed.download_bitrate, 256.0);
    assert_eq!(parsed.cpu, 0.42);
    assert_eq!(parsed.participant_count, 7);
    assert!(parsed.timestamp > 0);
  }

  #[test]
  fn handle_event_message_updates_the_selector() {
    let mut selector = BridgeSelector::new("default.example.org".to_owned(), std::time::Duration::from_secs(60));
    let message: Element = "
      <message xmlns='jabber:client'>
        <event xmlns='http://jabber.org/protocol/pubsub#event'>
          <items node='videobridge'>
            <item id='current'>
              <stats xmlns='http://jitsi.org/protocol/colibri'>
                <stat name='bit_rate_upload' value='10'/>
                <stat name='bit_rate_download' value='10'/>
              </stats>
            </item>
          </items>
        </event>
      </message>
    "
    .parse()
    .unwrap();
    let message = Message::try_from(message).unwrap();

    handle_event_message(&mut selector, "bridge1.example.org", &message);
    assert_eq!(selector.select(1000), "bridge1.example.org");
  }
}
