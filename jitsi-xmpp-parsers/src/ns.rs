/// XEP-0215: External Service Discovery
pub const EXTDISCO: &str = "urn:xmpp:extdisco:2";

pub const JITSI_FOCUS: &str = "http://jitsi.org/protocol/focus";

pub const JITSI_JITMEET: &str = "http://jitsi.org/jitmeet";

pub const JITSI_MEET: &str = "http://jitsi.org/jitmeet";

/// The COLIBRI focus-to-bridge control protocol.
pub const JITSI_COLIBRI: &str = "http://jitsi.org/protocol/colibri";

/// Jitsi's "multimedia MUC" extension, advertised in disco#info and used to
/// signal bridged-media capability during MUC join.
pub const MMUC: &str = "http://andyet.net/xmlns/mmuc";

/// Session-level mute/unmute notifications, carried as direct children of a
/// `session-info` Jingle action.
pub const JINGLE_RTP_INFO: &str = "urn:xmpp:jingle:apps:rtp:info:1";

/// Per-msid media-stream mute annotations, used both inside a `mute`/`unmute`
/// session-info payload and as a standalone MUC presence extension.
pub const MEDIASTREAM: &str = "http://jitsi.org/jitmeet/mediastreams";
