//! In-memory byte source

use super::errors::{check_range, SourceResult};
use super::ByteSource;

/// A growable in-memory buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing bytes, e.g. a previously exported store image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ByteSource for MemorySource {
    fn length(&self) -> SourceResult<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn resize(&mut self, new_length: u64) -> SourceResult<()> {
        self.bytes.resize(new_length as usize, 0);
        Ok(())
    }

    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> SourceResult<()> {
        check_range(offset, buf.len(), self.bytes.len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }

    fn write_range(&mut self, offset: u64, data: &[u8]) -> SourceResult<()> {
        check_range(offset, data.len(), self.bytes.len() as u64)?;
        let start = offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use crate::word::WordWidth;

    #[test]
    fn test_resize_zero_fills() {
        let mut source = MemorySource::from_bytes(vec![1, 2, 3]);
        source.resize(5).unwrap();
        assert_eq!(source.as_bytes(), &[1, 2, 3, 0, 0]);
        source.resize(1).unwrap();
        assert_eq!(source.as_bytes(), &[1]);
    }

    #[test]
    fn test_write_past_end_is_rejected() {
        let mut source = MemorySource::from_bytes(vec![0; 4]);
        let err = source.write_range(3, &[1, 2]).unwrap_err();
        assert!(matches!(err, SourceError::OutOfBounds { offset: 3, len: 2, length: 4 }));
        assert_eq!(source.as_bytes(), &[0; 4]);
    }

    #[test]
    fn test_words() {
        let mut source = MemorySource::from_bytes(vec![0; 8]);
        source.write_word(2, 0xBEEF, WordWidth::Short).unwrap();
        assert_eq!(source.as_bytes(), &[0, 0, 0xBE, 0xEF, 0, 0, 0, 0]);
        assert_eq!(source.read_word(2, WordWidth::Short).unwrap(), 0xBEEF);
        assert!(matches!(
            source.write_word(0, 300, WordWidth::Byte),
            Err(SourceError::Word(_))
        ));
    }

    #[test]
    fn test_byte_access() {
        let mut source = MemorySource::from_bytes(vec![0; 2]);
        source.write_byte(1, 0x7F).unwrap();
        assert_eq!(source.read_byte(1).unwrap(), 0x7F);
        assert!(source.read_byte(2).is_err());
    }
}
