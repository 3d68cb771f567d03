//! Decoder for Factorio's `blueprint-storage.dat`.
//!
//! The game keeps the player's personal blueprint library in a
//! proprietary little-endian binary file. This crate parses it into the
//! same JSON document the in-game export produces, so libraries can be
//! diffed, version-controlled and repacked into import strings.

pub mod codec;
pub mod error;
pub mod exchange;

pub use codec::{
    decode_library, BinaryReader, BinaryWriter, DecodeOptions, Decoder, Kind, Library,
    PrototypeIndex, Version,
};
pub use error::{ParseError, Result};
