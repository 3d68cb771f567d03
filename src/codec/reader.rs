use crate::error::{ParseError, Result};

/// Binary reader for the blueprint library wire format.
///
/// All multi-byte values are little-endian. Every failed expectation
/// reports the stream offset it failed at.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.pos, message)
    }

    fn eof(&self, need: usize) -> ParseError {
        ParseError::new(
            self.pos,
            format!("unexpected end of data: need {need} bytes, have {}", self.remaining()),
        )
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(self.eof(n));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(self.eof(1));
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Strict boolean: only 0x00 and 0x01 are valid encodings.
    pub fn read_bool(&mut self) -> Result<bool> {
        let at = self.pos;
        match self.read_u8()? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            v => Err(ParseError::new(at, format!("invalid boolean byte {v:#04x}"))),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub fn read_count8(&mut self) -> Result<usize> {
        Ok(self.read_u8()? as usize)
    }

    pub fn read_count16(&mut self) -> Result<usize> {
        Ok(self.read_u16()? as usize)
    }

    pub fn read_count32(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Variable-length count: one byte, or 0xFF followed by a full u32.
    pub fn read_opt_u32(&mut self) -> Result<u32> {
        let first = self.read_u8()?;
        if first == 0xFF {
            self.read_u32()
        } else {
            Ok(u32::from(first))
        }
    }

    /// Length-prefixed UTF-8 string. The length uses the opt-u32 rule:
    /// a 0xFF prefix escapes to a 4-byte length.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_opt_u32()? as usize;
        let at = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ParseError::new(at, format!("invalid UTF-8 in {len}-byte string")))
    }

    /// Map the next byte through a table of constants; bytes >= the table
    /// length are a parse error.
    pub fn read_mapped_u8<T: Copy>(&mut self, what: &str, table: &[T]) -> Result<T> {
        let at = self.pos;
        let v = self.read_u8()? as usize;
        table.get(v).copied().ok_or_else(|| {
            ParseError::new(at, format!("invalid {what}: {v} (expected 0..{})", table.len()))
        })
    }

    /// Consume literal bytes, failing on the first mismatch.
    pub fn expect(&mut self, literal: &[u8], what: &str) -> Result<()> {
        for &expected in literal {
            let at = self.pos;
            let got = self.read_u8()?;
            if got != expected {
                return Err(ParseError::new(
                    at,
                    format!("expected {expected:#04x} for {what}, got {got:#04x}"),
                ));
            }
        }
        Ok(())
    }

    /// Consume one byte that must be one of the given values.
    pub fn expect_oneof(&mut self, allowed: &[u8], what: &str) -> Result<u8> {
        let at = self.pos;
        let got = self.read_u8()?;
        if allowed.contains(&got) {
            Ok(got)
        } else {
            Err(ParseError::new(
                at,
                format!("expected one of {allowed:02x?} for {what}, got {got:#04x}"),
            ))
        }
    }

    /// Consume `n` bytes whose content is not interpreted. The label names
    /// the skipped region in trace output.
    pub fn ignore(&mut self, n: usize, label: &str) -> Result<()> {
        let at = self.pos;
        let bytes = self.read_bytes(n)?;
        tracing::trace!(offset = at, ?bytes, "ignoring {n} bytes: {label}");
        Ok(())
    }
}
