//! Stanza Builders: pure, deterministic functions turning room/participant
//! state into the COLIBRI and Jingle requests the controller sends out.

pub mod colibri;
pub mod focus;
pub mod jingle;
