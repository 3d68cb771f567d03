pub mod decoder;
pub mod entity;
pub mod fields;
pub mod index;
pub mod library;
pub mod objects;
pub mod reader;
pub mod resolve;
pub mod version;
pub mod writer;

pub use decoder::Decoder;
pub use index::{classify, Kind, Prototype, PrototypeIndex};
pub use library::{decode_library, DecodeOptions, Library};
pub use reader::BinaryReader;
pub use version::Version;
pub use writer::BinaryWriter;
