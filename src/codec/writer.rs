/// Binary writer mirroring [`super::BinaryReader`]'s encodings.
///
/// The decoder never re-encodes a library, but fixtures in the test
/// modules are all assembled through this type so they stay in lockstep
/// with the reader's framing rules.
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(if v { 1 } else { 0 });
    }

    pub fn write_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// Variable-length count: values below 0xFF fit in one byte, larger
    /// values are written as 0xFF plus a full u32.
    pub fn write_opt_u32(&mut self, v: u32) {
        if v < 0xFF {
            self.write_u8(v as u8);
        } else {
            self.write_u8(0xFF);
            self.write_u32(v);
        }
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_opt_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryReader;

    #[test]
    fn round_trips_through_reader() {
        let mut w = BinaryWriter::new();
        w.write_u8(7);
        w.write_u16(0x1234);
        w.write_i32(-5);
        w.write_bool(true);
        w.write_string("iron-chest");
        w.write_opt_u32(1000);

        let data = w.into_vec();
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_i32().unwrap(), -5);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_string().unwrap(), "iron-chest");
        assert_eq!(r.read_opt_u32().unwrap(), 1000);
        assert!(r.is_empty());
    }

    #[test]
    fn long_string_uses_four_byte_length() {
        let s = "x".repeat(300);
        let mut w = BinaryWriter::new();
        w.write_string(&s);
        assert_eq!(w.as_slice()[0], 0xFF);

        let data = w.into_vec();
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.read_string().unwrap(), s);
    }
}
