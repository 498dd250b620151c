use crate::error::{Error, Result};

/// Forward-only writer over a buffer that was sized up front from `Serializable::binary_size`.
///
/// Writing past the end is a length mismatch, never a reallocation.
pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        WriteCursor { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(Error::SerializationLengthMismatch {
                expected: self.buf.len(),
                actual: end,
            });
        }

        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_bytes(&[v])
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Sequence lengths and pool counts are always 8 bytes wide.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_u64(len as u64)
    }

    /// Fails unless exactly every reserved byte was written.
    pub fn finish(self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(Error::SerializationLengthMismatch {
                expected: self.buf.len(),
                actual: self.pos,
            });
        }
        Ok(())
    }
}

pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ReadCursor { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }

        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a length prefix, refusing anything that could not possibly fit in what is left of the buffer.
    pub fn read_len(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_u64()?;

        if len > self.remaining() as u64 {
            return Err(Error::UnexpectedEof {
                offset,
                needed: len as usize,
                available: self.remaining(),
            });
        }
        Ok(len as usize)
    }
}
