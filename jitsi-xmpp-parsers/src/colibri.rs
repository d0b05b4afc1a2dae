//! COLIBRI: the focus-to-bridge channel allocation protocol.
//!
//! Unlike Jingle, which is a standard XEP, COLIBRI is a Jitsi-specific IQ
//! payload. The shapes here follow the same `generate_element!` style as the
//! rest of this crate.

use xmpp_parsers::{
  iq::{IqGetPayload, IqResultPayload, IqSetPayload},
  jingle_rtp::PayloadType,
  jingle_rtp_hdrext::RtpHdrext,
  ns::JINGLE_RTP,
};

use crate::{
  jingle_ice_udp::Transport as IceUdpTransport,
  jingle_ssma::{Group as SsrcGroup, Source as SsrcSource},
  ns::JITSI_COLIBRI,
};

generate_attribute!(
  /// Whether a channel should multiplex RTP and RTCP on a single port.
  RtcpMux, "rtcp-mux", bool
);

generate_element!(
  /// The root `<conference/>` element of a COLIBRI request or response.
  ///
  /// Sent focus-to-bridge to create or update a conference, and bridge-to-focus
  /// as the result of a successful create/update.
  Conference, "conference", JITSI_COLIBRI,
  attributes: [
    /// The bridge-assigned conference id. Absent on the first create request.
    id: Option<String> = "id",
  ],
  children: [
    /// One content block per media type (audio, video, data).
    contents: Vec<Content> = ("content", JITSI_COLIBRI) => Content,

    /// Transport/fingerprint bundles shared by channels that reference them.
    channel_bundles: Vec<ChannelBundle> = ("channel-bundle", JITSI_COLIBRI) => ChannelBundle,
  ]
);

impl IqSetPayload for Conference {}
impl IqGetPayload for Conference {}
impl IqResultPayload for Conference {}

impl Conference {
  pub fn new() -> Conference {
    Conference {
      id: None,
      contents: vec![],
      channel_bundles: vec![],
    }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Conference {
    self.id = Some(id.into());
    self
  }

  pub fn with_content(mut self, content: Content) -> Conference {
    self.contents.push(content);
    self
  }

  pub fn with_channel_bundle(mut self, bundle: ChannelBundle) -> Conference {
    self.channel_bundles.push(bundle);
    self
  }
}

impl Default for Conference {
  fn default() -> Self {
    Self::new()
  }
}

generate_element!(
  /// A single medium's worth of channels (`"audio"`, `"video"`, or `"data"`).
  Content, "content", JITSI_COLIBRI,
  attributes: [
    /// The medium name.
    name: Required<String> = "name",
  ],
  children: [
    /// RTP channels for this medium.
    channels: Vec<Channel> = ("channel", JITSI_COLIBRI) => Channel,

    /// SCTP connections for this medium (used only for the `"data"` content).
    sctp_connections: Vec<SctpConnection> = ("sctpconnection", JITSI_COLIBRI) => SctpConnection,
  ]
);

impl Content {
  pub fn new(name: impl Into<String>) -> Content {
    Content {
      name: name.into(),
      channels: vec![],
      sctp_connections: vec![],
    }
  }

  pub fn with_channel(mut self, channel: Channel) -> Content {
    self.channels.push(channel);
    self
  }

  pub fn with_sctp_connection(mut self, sctp: SctpConnection) -> Content {
    self.sctp_connections.push(sctp);
    self
  }
}

generate_element!(
  /// A bridge-side RTP channel allocated for one endpoint and one medium.
  Channel, "channel", JITSI_COLIBRI,
  attributes: [
    /// Bridge-assigned, opaque channel id. Absent when requesting a new channel.
    id: Option<String> = "id",

    /// The endpoint (room nickname) this channel belongs to.
    endpoint: Option<String> = "endpoint",

    /// The channel-bundle this channel's transport is carried on.
    channel_bundle_id: Option<String> = "channel-bundle-id",

    /// Non-zero keeps the channel alive; `0` requests immediate expiry.
    expire: Option<u32> = "expire",

    /// Whether rtcp-mux is used on this channel.
    rtcp_mux: Default<RtcpMux> = "rtcp-mux",
  ],
  children: [
    /// Supported payload types, reusing the Jingle RTP payload-type shape.
    payload_types: Vec<PayloadType> = ("payload-type", JINGLE_RTP) => PayloadType,

    /// RTP header extensions in use on this channel.
    rtp_hdrextensions: Vec<RtpHdrext> = ("rtp-hdrext", JINGLE_RTP) => RtpHdrext,

    /// Sources (SSRCs) currently associated with this channel.
    sources: Vec<SsrcSource> = ("source", JINGLE_RTP) => SsrcSource,

    /// FID/SIM groupings over this channel's sources.
    ssrc_groups: Vec<SsrcGroup> = ("ssrc-group", JINGLE_RTP) => SsrcGroup,

    /// Per-channel transport; only present when bundling is disabled.
    transport: Option<IceUdpTransport> = ("transport", *) => IceUdpTransport,
  ]
);

impl Channel {
  /// A channel request for a new endpoint: no id yet, bridge assigns one.
  pub fn new_request(endpoint: impl Into<String>) -> Channel {
    Channel {
      id: None,
      endpoint: Some(endpoint.into()),
      channel_bundle_id: None,
      expire: None,
      rtcp_mux: RtcpMux::False,
      payload_types: vec![],
      rtp_hdrextensions: vec![],
      sources: vec![],
      ssrc_groups: vec![],
      transport: None,
    }
  }

  /// A minimal reference to an existing channel, for expire requests.
  pub fn expire_request(id: impl Into<String>) -> Channel {
    Channel {
      id: Some(id.into()),
      endpoint: None,
      channel_bundle_id: None,
      expire: Some(0),
      rtcp_mux: RtcpMux::False,
      payload_types: vec![],
      rtp_hdrextensions: vec![],
      sources: vec![],
      ssrc_groups: vec![],
      transport: None,
    }
  }

  pub fn with_channel_bundle_id(mut self, id: impl Into<String>) -> Channel {
    self.channel_bundle_id = Some(id.into());
    self
  }

  pub fn with_payload_types(mut self, payload_types: Vec<PayloadType>) -> Channel {
    self.payload_types = payload_types;
    self
  }

  pub fn with_rtp_hdrextensions(mut self, hdrexts: Vec<RtpHdrext>) -> Channel {
    self.rtp_hdrextensions = hdrexts;
    self
  }

  pub fn with_sources(mut self, sources: Vec<SsrcSource>) -> Channel {
    self.sources = sources;
    self
  }

  pub fn with_ssrc_groups(mut self, groups: Vec<SsrcGroup>) -> Channel {
    self.ssrc_groups = groups;
    self
  }

  pub fn with_rtcp_mux(mut self, rtcp_mux: bool) -> Channel {
    self.rtcp_mux = if rtcp_mux { RtcpMux::True } else { RtcpMux::False };
    self
  }
}

generate_element!(
  /// An SCTP connection allocated for one endpoint's data channel.
  SctpConnection, "sctpconnection", JITSI_COLIBRI,
  attributes: [
    /// Bridge-assigned, opaque connection id. Absent when requesting a new one.
    id: Option<String> = "id",

    /// The endpoint (room nickname) this connection belongs to.
    endpoint: Option<String> = "endpoint",

    /// The channel-bundle this connection's transport is carried on.
    channel_bundle_id: Option<String> = "channel-bundle-id",

    /// The SCTP port, conventionally 5000.
    port: Option<u16> = "port",

    /// Non-zero keeps the connection alive; `0` requests immediate expiry.
    expire: Option<u32> = "expire",
  ]
);

impl SctpConnection {
  pub fn new_request(endpoint: impl Into<String>) -> SctpConnection {
    SctpConnection {
      id: None,
      endpoint: Some(endpoint.into()),
      channel_bundle_id: None,
      port: Some(5000),
      expire: None,
    }
  }

  pub fn expire_request(id: impl Into<String>) -> SctpConnection {
    SctpConnection {
      id: Some(id.into()),
      endpoint: None,
      channel_bundle_id: None,
      port: None,
      expire: Some(0),
    }
  }

  pub fn with_channel_bundle_id(mut self, id: impl Into<String>) -> SctpConnection {
    self.channel_bundle_id = Some(id.into());
    self
  }
}

generate_element!(
  /// A shared ICE/DTLS transport for all channels naming the same bundle id.
  ChannelBundle, "channel-bundle", JITSI_COLIBRI,
  attributes: [
    /// The bundle id; by convention, the endpoint id.
    id: Required<String> = "id",
  ],
  children: [
    /// The ICE-UDP transport (candidates, ufrag/pwd, DTLS fingerprint, and,
    /// in a bridge reply, the Colibri WebSocket URL) for this bundle.
    transport: Option<IceUdpTransport> = ("transport", *) => IceUdpTransport,
  ]
);

impl ChannelBundle {
  pub fn new(id: impl Into<String>) -> ChannelBundle {
    ChannelBundle {
      id: id.into(),
      transport: None,
    }
  }

  pub fn with_transport(mut self, transport: IceUdpTransport) -> ChannelBundle {
    self.transport = Some(transport);
    self
  }
}
