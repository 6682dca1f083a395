use crate::CodecError;

/// Append-only little-endian writer. Encoding never fails for an in-memory
/// value, so none of these return a Result.
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub(crate) fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    pub(crate) fn put_string(&mut self, s: &str) {
        self.put_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Embed an already-encoded sub-object behind its own length prefix.
    pub(crate) fn put_block(&mut self, block: &[u8]) {
        self.put_u32(block.len() as u32);
        self.buf.extend_from_slice(block);
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an encoded buffer. Every read checks the remaining length and
/// fails with `Truncated` instead of panicking on short input.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                context,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn get_u8(&mut self, context: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, context)?[0])
    }

    pub(crate) fn get_u32(&mut self, context: &'static str) -> Result<u32, CodecError> {
        let bytes = self.take(4, context)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub(crate) fn get_i32(&mut self, context: &'static str) -> Result<i32, CodecError> {
        let bytes = self.take(4, context)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub(crate) fn get_i64(&mut self, context: &'static str) -> Result<i64, CodecError> {
        let bytes = self.take(8, context)?;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub(crate) fn get_f64(&mut self, context: &'static str) -> Result<f64, CodecError> {
        let bytes = self.take(8, context)?;
        Ok(f64::from_bits(u64::from_le_bytes(bytes.try_into().unwrap())))
    }

    pub(crate) fn get_string(&mut self, context: &'static str) -> Result<String, CodecError> {
        let len = self.get_u32(context)? as usize;
        let bytes = self.take(len, context)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { context })
    }

    /// Read a length-prefixed sub-object without parsing its contents.
    pub(crate) fn get_block(&mut self, context: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.get_u32(context)? as usize;
        self.take(len, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        let mut w = ByteWriter::new();
        w.put_string("привет");
        w.put_string("");
        let buf = w.into_vec();

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.get_string("a").unwrap(), "привет");
        assert_eq!(r.get_string("b").unwrap(), "");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_short_read_reports_truncated() {
        let mut w = ByteWriter::new();
        w.put_string("hello");
        let buf = w.into_vec();

        let mut r = ByteReader::new(&buf[..6]);
        let err = r.get_string("field").unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn test_length_prefix_larger_than_buffer() {
        // Claims a 1000-byte string but carries 2 bytes.
        let mut buf = 1000u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"ab");

        let mut r = ByteReader::new(&buf);
        assert!(matches!(
            r.get_string("field"),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = 2u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[0xff, 0xfe]);

        let mut r = ByteReader::new(&buf);
        assert_eq!(
            r.get_string("field"),
            Err(CodecError::InvalidUtf8 { context: "field" })
        );
    }

    #[test]
    fn test_f64_bit_exact() {
        let values = [0.1, -0.0, f64::MAX, f64::MIN_POSITIVE, 1817.0];
        let mut w = ByteWriter::new();
        for v in values {
            w.put_f64(v);
        }
        let buf = w.into_vec();

        let mut r = ByteReader::new(&buf);
        for v in values {
            assert_eq!(r.get_f64("f").unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_block_boundaries() {
        let mut w = ByteWriter::new();
        w.put_block(&[1, 2, 3]);
        w.put_block(&[]);
        let buf = w.into_vec();

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.get_block("first").unwrap(), &[1, 2, 3]);
        assert_eq!(r.get_block("second").unwrap(), &[] as &[u8]);
    }
}
