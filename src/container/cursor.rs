//! Bounds-checked little-endian reads over an immutable byte view.

use crate::error::ContainerError;

/// Result alias for container parsing.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Forward-only reader that never indexes past the end of its slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `offset` (fails if the offset lies past the end).
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        if offset > data.len() {
            return Err(ContainerError::UnexpectedEof { offset });
        }
        Ok(Self { data, pos: offset })
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ContainerError::UnexpectedEof { offset: self.pos })?;
        if end > self.data.len() {
            return Err(ContainerError::UnexpectedEof { offset: self.pos });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Expect the exact byte sequence `magic`.
    pub fn expect(&mut self, magic: &[u8], name: &'static str) -> Result<()> {
        if self.take(magic.len())? != magic {
            return Err(ContainerError::InvalidMagic { expected: name });
        }
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read UTF-16LE code units up to (and consuming) a 0x0000 terminator.
    ///
    /// Returns the units read and whether a terminator was found. Running out
    /// of data is not an error here: the units collected so far are returned
    /// with `terminated == false`.
    pub fn read_utf16z(&mut self) -> (Vec<u16>, bool) {
        let mut units = Vec::new();
        while self.remaining() >= 2 {
            let unit = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
            self.pos += 2;
            if unit == 0 {
                return (units, true);
            }
            units.push(unit);
        }
        self.pos = self.data.len();
        (units, false)
    }
}
