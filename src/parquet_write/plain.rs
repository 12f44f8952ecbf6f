/*******************************************************************************
 *     ___                  _   ____  ____
 *    / _ \ _   _  ___  ___| |_|  _ \| __ )
 *   | | | | | | |/ _ \/ __| __| | | |  _ \
 *   | |_| | |_| |  __/\__ \ |_| |_| | |_) |
 *    \__\_\\__,_|\___||___/\__|____/|____/
 *
 *  Copyright (c) 2014-2019 Appsicle
 *  Copyright (c) 2019-2026 QuestDB
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *  http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 *
 ******************************************************************************/

use crate::parquet::error::{fmt_err, ParquetResult};
use num_traits::ToBytes;
use std::io::Write;
use std::ops::Range;

// A run of bytes not yet handed to the writer.
struct PendingSpan<'a> {
    source: &'a [u8],
    range: Range<usize>,
}

/// `PLAIN` encoder.
///
/// Spans taken from the same source are buffered and extended while they stay
/// contiguous, so a page of already-encoded values reaches the writer as one
/// write. The source must stay untouched until the span is flushed, which
/// the borrow on `'a` guarantees.
pub struct PlainEncoder<'a, W: Write> {
    writer: W,
    pending: Option<PendingSpan<'a>>,
    bits: u8,
    bit_count: u8,
    flushed: usize,
}

impl<'a, W: Write> PlainEncoder<'a, W> {
    pub fn new(writer: W) -> Self {
        Self { writer, pending: None, bits: 0, bit_count: 0, flushed: 0 }
    }

    /// Bytes encoded so far, including anything still buffered.
    pub fn encoded_len(&self) -> usize {
        self.flushed
            + self.pending.as_ref().map_or(0, |p| p.range.len())
            + usize::from(self.bit_count > 0)
    }

    /// Appends `source[range]`, already in plain layout.
    pub fn encode_span(&mut self, source: &'a [u8], range: Range<usize>) -> ParquetResult<()> {
        if range.start > range.end || range.end > source.len() {
            return Err(fmt_err!(
                Layout,
                "span {:?} is outside its source of {} bytes",
                range,
                source.len()
            ));
        }
        self.flush_bits()?;
        if let Some(pending) = &mut self.pending {
            if std::ptr::eq(pending.source, source) && pending.range.end == range.start {
                pending.range.end = range.end;
                return Ok(());
            }
        }
        self.flush_pending()?;
        self.pending = Some(PendingSpan { source, range });
        Ok(())
    }

    /// A fixed-width scalar, little-endian.
    pub fn encode_scalar<T: ToBytes>(&mut self, value: T) -> ParquetResult<()> {
        self.write_direct(value.to_le_bytes().as_ref())
    }

    /// A variable-length byte array with its 4-byte length prefix.
    pub fn encode_byte_array(&mut self, value: &[u8]) -> ParquetResult<()> {
        let len = u32::try_from(value.len())
            .map_err(|_| fmt_err!(Invalid, "byte array of {} bytes is too long", value.len()))?;
        self.write_direct(&len.to_le_bytes())?;
        self.write_direct(value)
    }

    /// A fixed-length byte array; the length lives in the schema.
    pub fn encode_fixed(&mut self, value: &[u8]) -> ParquetResult<()> {
        self.write_direct(value)
    }

    /// Booleans are packed 8 per byte, LSB first.
    pub fn encode_bool(&mut self, value: bool) -> ParquetResult<()> {
        self.flush_pending()?;
        self.bits |= u8::from(value) << self.bit_count;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.flush_bits()?;
        }
        Ok(())
    }

    /// Flushes buffered spans and any partial boolean byte.
    pub fn finish(mut self) -> ParquetResult<W> {
        self.flush_pending()?;
        self.flush_bits()?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_direct(&mut self, bytes: &[u8]) -> ParquetResult<()> {
        self.flush_pending()?;
        self.flush_bits()?;
        self.writer.write_all(bytes)?;
        self.flushed += bytes.len();
        Ok(())
    }

    fn flush_pending(&mut self) -> ParquetResult<()> {
        if let Some(pending) = self.pending.take() {
            self.writer.write_all(&pending.source[pending.range.clone()])?;
            self.flushed += pending.range.len();
        }
        Ok(())
    }

    fn flush_bits(&mut self) -> ParquetResult<()> {
        if self.bit_count > 0 {
            self.writer.write_all(&[self.bits])?;
            self.flushed += 1;
            self.bits = 0;
            self.bit_count = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Records every write call separately.
    #[derive(Default)]
    struct CountingWriter {
        writes: Vec<Vec<u8>>,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bool_packing() {
        let mut encoder = PlainEncoder::new(Vec::new());
        for v in [true, false, true, true, false, false, false, true] {
            encoder.encode_bool(v).unwrap();
        }
        assert_eq!(encoder.finish().unwrap(), vec![0x8D]);
    }

    #[test]
    fn test_partial_bool_byte_flushed_on_finish() {
        let mut encoder = PlainEncoder::new(Vec::new());
        for v in [true, true, false, true, false, false, false, false, true, true] {
            encoder.encode_bool(v).unwrap();
        }
        assert_eq!(encoder.encoded_len(), 2);
        assert_eq!(encoder.finish().unwrap(), vec![0x0B, 0x03]);
    }

    #[test]
    fn test_contiguous_spans_coalesce() {
        let source: Vec<u8> = (0..12).collect();
        let mut encoder = PlainEncoder::new(CountingWriter::default());
        encoder.encode_span(&source, 0..4).unwrap();
        encoder.encode_span(&source, 4..8).unwrap();
        encoder.encode_span(&source, 8..12).unwrap();
        assert_eq!(encoder.encoded_len(), 12);
        let writer = encoder.finish().unwrap();
        assert_eq!(writer.writes, vec![source.clone()]);
    }

    #[test]
    fn test_discontinuity_flushes() {
        let source: Vec<u8> = (0..12).collect();
        let other = [0xFFu8; 2];
        let mut encoder = PlainEncoder::new(CountingWriter::default());
        encoder.encode_span(&source, 0..4).unwrap();
        encoder.encode_span(&source, 8..12).unwrap();
        encoder.encode_span(&other, 0..2).unwrap();
        encoder.encode_scalar(7i32).unwrap();
        let writer = encoder.finish().unwrap();
        assert_eq!(
            writer.writes,
            vec![
                vec![0, 1, 2, 3],
                vec![8, 9, 10, 11],
                vec![0xFF, 0xFF],
                vec![7, 0, 0, 0],
            ]
        );
        assert!(PlainEncoder::new(Vec::new()).encode_span(&source, 10..13).is_err());
    }

    #[test]
    fn test_scalars_and_byte_arrays() {
        let mut encoder = PlainEncoder::new(Vec::new());
        encoder.encode_scalar(-2i64).unwrap();
        encoder.encode_scalar(1.5f32).unwrap();
        encoder.encode_byte_array(b"ab").unwrap();
        encoder.encode_fixed(b"xyz").unwrap();
        let mut expected = (-2i64).to_le_bytes().to_vec();
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        expected.extend_from_slice(&[2, 0, 0, 0, b'a', b'b', b'x', b'y', b'z']);
        assert_eq!(encoder.finish().unwrap(), expected);
    }
}
