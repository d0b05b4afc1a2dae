#[macro_use]
mod macros;

pub mod colibri;
pub mod helpers;
pub mod jingle;
pub mod jingle_dtls_srtp;
pub mod jingle_ice_udp;
pub mod jingle_rtp;
pub mod jingle_rtp_info;
pub mod jingle_ssma;
pub mod ns;
