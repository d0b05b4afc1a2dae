//! The fixed codec and RTP header-extension tables offered in every
//! session-initiate and conference-create. Re-ordering these lists is not
//! observable to clients that honour them; they are data, not negotiation
//! logic, which is why they live in one place instead of being assembled ad
//! hoc by the stanza builders.

use once_cell::sync::Lazy;
use xmpp_parsers::{
  jingle_rtcp_fb::RtcpFb,
  jingle_rtp::{Parameter, PayloadType},
  jingle_rtp_hdrext::RtpHdrext,
};

/// The fixed audio payload-type table: opus, ISAC (16k and 32k), G.722, and
/// the two narrowband PSTN codecs.
pub static AUDIO_PAYLOAD_TYPES: Lazy<Vec<PayloadType>> = Lazy::new(|| {
  vec![
    PayloadType::new(111, "opus".to_owned(), 48000, 2).with_parameters(vec![
      Parameter {
        name: "minptime".to_owned(),
        value: "10".to_owned(),
      },
      Parameter {
        name: "useinbandfec".to_owned(),
        value: "1".to_owned(),
      },
    ]),
    PayloadType::without_clockrate(103, "ISAC".to_owned()).with_clockrate(16000),
    PayloadType::without_clockrate(104, "ISAC".to_owned()).with_clockrate(32000),
    PayloadType::new(9, "G722".to_owned(), 8000, 1),
    PayloadType::new(0, "PCMU".to_owned(), 8000, 1),
    PayloadType::new(8, "PCMA".to_owned(), 8000, 1),
  ]
});

/// The fixed video payload-type table: VP8 with its standard feedback types,
/// paired with an `rtx` payload type when `focus_feature_rtx` is enabled.
pub fn video_payload_types(use_rtx: bool) -> Vec<PayloadType> {
  let vp8_id = 100;
  let vp8 = PayloadType::without_clockrate(vp8_id, "VP8".to_owned())
    .with_clockrate(90000)
    .with_rtcp_fbs(vec![
      RtcpFb {
        type_: "ccm".to_owned(),
        subtype: Some("fir".to_owned()),
      },
      RtcpFb {
        type_: "nack".to_owned(),
        subtype: None,
      },
      RtcpFb {
        type_: "nack".to_owned(),
        subtype: Some("pli".to_owned()),
      },
      RtcpFb {
        type_: "goog-remb".to_owned(),
        subtype: None,
      },
      RtcpFb {
        type_: "transport-cc".to_owned(),
        subtype: None,
      },
    ]);

  if !use_rtx {
    return vec![vp8];
  }

  let rtx = PayloadType::without_clockrate(96, "rtx".to_owned())
    .with_clockrate(90000)
    .with_parameters(vec![Parameter {
      name: "apt".to_owned(),
      value: vp8_id.to_string(),
    }]);

  vec![vp8, rtx]
}

/// The fixed RTP header-extension table.
pub static RTP_HDREXTS: Lazy<Vec<RtpHdrext>> = Lazy::new(|| {
  vec![
    RtpHdrext::new(
      "1".to_owned(),
      "urn:ietf:params:rtp-hdrext:ssrc-audio-level".to_owned(),
    ),
    RtpHdrext::new(
      "3".to_owned(),
      "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time".to_owned(),
    ),
    RtpHdrext::new(
      "5".to_owned(),
      "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01".to_owned(),
    ),
  ]
});

/// Small builder extensions over the upstream [`PayloadType`], which only
/// exposes its fields as constructor arguments.
trait PayloadTypeExt {
  fn with_clockrate(self, clockrate: u32) -> Self;
  fn with_parameters(self, parameters: Vec<Parameter>) -> Self;
  fn with_rtcp_fbs(self, rtcp_fbs: Vec<RtcpFb>) -> Self;
}

impl PayloadTypeExt for PayloadType {
  fn with_clockrate(mut self, clockrate: u32) -> Self {
    self.clockrate = Some(clockrate);
    self
  }

  fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
    self.parameters = parameters;
    self
  }

  fn with_rtcp_fbs(mut self, rtcp_fbs: Vec<RtcpFb>) -> Self {
    self.rtcp_fbs = rtcp_fbs;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn video_payload_types_without_rtx_is_just_vp8() {
    let types = video_payload_types(false);
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name.as_deref(), Some("VP8"));
  }

  #[test]
  fn video_payload_types_with_rtx_binds_apt_to_vp8() {
    let types = video_payload_types(true);
    assert_eq!(types.len(), 2);
    assert_eq!(types[1].name.as_deref(), Some("rtx"));
    assert_eq!(types[1].parameters[0].name, "apt");
    assert_eq!(types[1].parameters[0].value, "100");
  }
}
