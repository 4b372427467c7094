//! Byte-level primitives of the serialized-tree format.
//!
//! Everything is little-endian. Reads go through a bounds-checked
//! cursor: a truncated buffer produces a decode failure, never a read
//! past the end.

use crate::error::BridgeError;

/// Leading magic of a serialized tree buffer.
pub const MAGIC: &[u8; 4] = b"BRYT";

/// Current format version.
pub const VERSION: u8 = 1;

/// Node record tags. The set is closed; decoders fail on anything else.
pub mod tag {
    pub const PROGRAM: u8 = 0;
    pub const LOCAL_ASSIGN: u8 = 1;
    pub const LOCAL_READ: u8 = 2;
    pub const INTEGER: u8 = 3;
    pub const STR: u8 = 4;
    pub const CALL: u8 = 5;
    pub const BLOCK: u8 = 6;
    pub const NIL: u8 = 7;
}

/// A bounds-checked read cursor over a serialized buffer.
pub struct Reader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> Reader<'b> {
    pub fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'b [u8], BridgeError> {
        if self.remaining() < n {
            return Err(BridgeError::Decode(format!(
                "truncated buffer: needed {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, BridgeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, BridgeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, BridgeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, BridgeError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'b [u8], BridgeError> {
        self.take(n)
    }

    /// Read bytes up to (and consuming) a NUL terminator.
    pub fn read_cstr(&mut self) -> Result<&'b [u8], BridgeError> {
        let rest = &self.bytes[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                let s = &rest[..end];
                self.pos += end + 1;
                Ok(s)
            }
            None => Err(BridgeError::Decode(format!(
                "unterminated name string at offset {}",
                self.pos
            ))),
        }
    }

    /// Check and consume the buffer header magic.
    pub fn expect_magic(&mut self) -> Result<(), BridgeError> {
        let bytes = self.take(MAGIC.len())?;
        if bytes != MAGIC {
            return Err(BridgeError::Decode("bad magic in serialized buffer".into()));
        }
        Ok(())
    }
}

/// Mirror of [`Reader`], used by serializer implementations and tests.
#[derive(Debug, Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Start a buffer with the standard header magic and version.
    pub fn with_header() -> Self {
        let mut writer = Self::new();
        writer.write_bytes(MAGIC);
        writer.write_u8(VERSION);
        writer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Write a NUL-terminated name. Names may not contain NUL.
    pub fn write_cstr(&mut self, bytes: &[u8]) {
        debug_assert!(!bytes.contains(&0), "name contains NUL");
        self.bytes.extend_from_slice(bytes);
        self.bytes.push(0);
    }

    /// Write a u16-length-prefixed byte string (symbol payloads).
    pub fn write_sym(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= u16::MAX as usize);
        self.write_u16(bytes.len() as u16);
        self.write_bytes(bytes);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_round_trip() {
        let mut writer = Writer::new();
        writer.write_u8(7);
        writer.write_u16(513);
        writer.write_u32(70_000);
        writer.write_i64(-42);
        writer.write_cstr(b"name");
        let bytes = writer.into_bytes();

        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u16().unwrap(), 513);
        assert_eq!(reader.read_u32().unwrap(), 70_000);
        assert_eq!(reader.read_i64().unwrap(), -42);
        assert_eq!(reader.read_cstr().unwrap(), b"name");
        assert!(reader.at_end());
    }

    #[test]
    fn test_reader_truncation_is_an_error() {
        let mut reader = Reader::new(&[1, 2]);
        assert!(reader.read_u32().is_err());
        // Position does not advance past the end on failure
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn test_unterminated_cstr() {
        let mut reader = Reader::new(b"abc");
        assert!(matches!(reader.read_cstr(), Err(BridgeError::Decode(_))));
    }

    #[test]
    fn test_magic_mismatch() {
        let mut reader = Reader::new(b"NOPE\x01");
        assert!(reader.expect_magic().is_err());
    }
}
