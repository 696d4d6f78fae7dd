use std::sync::Arc;

use nom::{
    IResult, Parser,
    bytes::complete::take,
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_u16, be_u32, be_u64, i8, u8},
};

use crate::{
    class::java_str,
    error::{ClassFileError, Result},
};

/// Forward-only big-endian cursor over an in-memory buffer.
///
/// Offsets reported by the reader (and by the errors it produces) are absolute
/// positions in the original buffer, also for readers split off with
/// [`Reader::sub_reader`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Reader { input, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn read<T>(
        &mut self,
        width: usize,
        parser: impl FnOnce(&'a [u8]) -> IResult<&'a [u8], T>,
    ) -> Result<T> {
        match parser(self.input) {
            Ok((rest, value)) => {
                self.offset += self.input.len() - rest.len();
                self.input = rest;
                Ok(value)
            }
            Err(_) => Err(ClassFileError::UnexpectedEndOfData {
                offset: self.offset,
                needed: width.saturating_sub(self.input.len()),
            }),
        }
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.read(1, u8)
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.read(1, i8)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.read(2, be_u16)
    }

    pub fn i16(&mut self) -> Result<i16> {
        self.read(2, be_i16)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.read(4, be_u32)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.read(4, be_i32)
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.read(8, be_u64)
    }

    pub fn i64(&mut self) -> Result<i64> {
        self.read(8, be_i64)
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.read(4, be_f32)
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.read(8, be_f64)
    }

    /// Reads a raw span of `len` bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.read(len, |input| take(len).parse(input))
    }

    /// Reads a u2 length followed by that many bytes of modified UTF-8.
    pub fn utf8(&mut self) -> Result<Arc<str>> {
        let length = self.u16()?;
        let start = self.offset;
        let bytes = self.bytes(length as usize)?;
        java_str::decode(bytes)
            .ok_or_else(|| ClassFileError::malformed(start, "invalid modified UTF-8 string"))
    }

    /// Splits off a reader over the next `len` bytes, e.g. an attribute payload.
    pub fn sub_reader(&mut self, len: usize, what: &str) -> Result<Reader<'a>> {
        if len > self.input.len() {
            return Err(ClassFileError::malformed(
                self.offset,
                format!(
                    "{what} declares {len} bytes, only {} remaining",
                    self.input.len()
                ),
            ));
        }
        let offset = self.offset;
        let payload = self.bytes(len)?;
        Ok(Reader {
            input: payload,
            offset,
        })
    }

    /// Reads a u2 count and then that many entries with `f`.
    ///
    /// `min_entry_size` is the smallest encoding of one entry; a count that
    /// can't possibly fit into the remaining data is rejected before any entry
    /// is read.
    pub fn table<T>(
        &mut self,
        what: &str,
        min_entry_size: usize,
        mut f: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count_offset = self.offset;
        let count = self.u16()? as usize;
        if count * min_entry_size > self.input.len() {
            return Err(ClassFileError::malformed(
                count_offset,
                format!(
                    "{count} {what} entries can't fit into the remaining {} bytes",
                    self.input.len()
                ),
            ));
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(f(self)?);
        }
        Ok(entries)
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self, what: &str) -> Result<()> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(ClassFileError::malformed(
                self.offset,
                format!("{} unexpected trailing bytes in {what}", self.input.len()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let data = [
            0xca, 0xfe, 0xba, 0xbe, 0x00, 0x34, 0xff, 0xff, 0x3f, 0x80, 0x00, 0x00,
        ];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u32().unwrap(), 0xcafe_babe);
        assert_eq!(reader.u16().unwrap(), 52);
        assert_eq!(reader.i16().unwrap(), -1);
        assert_eq!(reader.f32().unwrap(), 1.0);
        assert_eq!(reader.offset(), 12);
        assert!(reader.is_empty());
    }

    #[test]
    fn reads_64_bit_values() {
        let data = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0x40, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.i64().unwrap(), -2);
        assert_eq!(reader.f64().unwrap(), 2.0);
    }

    #[test]
    fn short_read_reports_offset_and_missing_bytes() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u16().unwrap(), 1);
        assert_eq!(
            reader.u32(),
            Err(ClassFileError::UnexpectedEndOfData {
                offset: 2,
                needed: 3
            })
        );
        // a failed read consumes nothing
        assert_eq!(reader.u8().unwrap(), 2);
    }

    #[test]
    fn utf8_decodes_modified_encoding() {
        let data = [0x00, 0x04, b'a', 0xc0, 0x80, b'b'];
        let mut reader = Reader::new(&data);
        assert_eq!(&*reader.utf8().unwrap(), "a\0b");
    }

    #[test]
    fn sub_reader_keeps_absolute_offsets() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut reader = Reader::new(&data);
        reader.u8().unwrap();
        let mut sub = reader.sub_reader(3, "payload").unwrap();
        assert_eq!(sub.offset(), 1);
        assert_eq!(sub.u16().unwrap(), 0x0203);
        assert!(sub.finish("payload").is_err());
        assert_eq!(sub.offset(), 3);
        assert_eq!(reader.offset(), 4);
        assert!(matches!(
            reader.sub_reader(10, "payload"),
            Err(ClassFileError::MalformedClassFile { offset: 4, .. })
        ));
    }

    #[test]
    fn table_rejects_counts_that_overrun() {
        let data = [0x00, 0x10, 0x00, 0x01];
        let mut reader = Reader::new(&data);
        let err = reader.table("interface", 2, Reader::u16).unwrap_err();
        assert!(matches!(
            err,
            ClassFileError::MalformedClassFile { offset: 0, .. }
        ));

        let data = [0x00, 0x02, 0x00, 0x01, 0x00, 0x02];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.table("interface", 2, Reader::u16).unwrap(), vec![1, 2]);
    }
}
