/// Error raised by every failed assertion while walking the stream.
///
/// The offset is the stream position at which the expectation failed,
/// reported in both decimal and hex so it can be cross-checked against a
/// hex dump of the file.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at offset {offset} ({offset:#x}): {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
