//! The game's import/export exchange string: a version byte followed by
//! base64-wrapped zlib-compressed minified JSON.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

/// Exchange string format version understood by current game builds.
const EXCHANGE_VERSION: char = '0';

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("empty exchange string")]
    Empty,

    #[error("unsupported exchange string version {0:?}")]
    UnsupportedVersion(char),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid deflate payload: {0}")]
    Inflate(std::io::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unpack an exchange string into its JSON document.
pub fn unpack(exchange: &str) -> Result<Value, ExchangeError> {
    let exchange = exchange.trim();
    let mut chars = exchange.chars();
    let version = chars.next().ok_or(ExchangeError::Empty)?;
    if version != EXCHANGE_VERSION {
        return Err(ExchangeError::UnsupportedVersion(version));
    }
    let compressed = base64::engine::general_purpose::STANDARD.decode(chars.as_str())?;
    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(ExchangeError::Inflate)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Pack a JSON document into an exchange string the game will accept.
pub fn pack(document: &Value) -> Result<String, ExchangeError> {
    let json = serde_json::to_vec(document)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json).map_err(ExchangeError::Inflate)?;
    let compressed = encoder.finish().map_err(ExchangeError::Inflate)?;
    let mut out = String::with_capacity(1 + compressed.len() * 4 / 3);
    out.push(EXCHANGE_VERSION);
    base64::engine::general_purpose::STANDARD.encode_string(&compressed, &mut out);
    Ok(out)
}
