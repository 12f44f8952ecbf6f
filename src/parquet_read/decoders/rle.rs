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

//! RLE / bit-packing hybrid decoding, used for definition levels and
//! dictionary indices.

use crate::parquet::error::{fmt_err, ParquetResult};
use crate::thrift::varint::decode_varint_slice;

/// Widest value the hybrid encoding carries in this crate.
pub const MAX_BIT_WIDTH: u8 = 32;

// Active run state. Kept explicit so that batch extraction can work on whole
// runs instead of going through `next` one value at a time.
#[derive(Debug)]
enum HybridRun<'a> {
    None,
    Rle {
        value: u32,
        remaining: usize,
    },
    Bitpacked {
        data: &'a [u8],
        index: usize,
        remaining: usize,
    },
}

/// Decoder over one hybrid-encoded stream.
///
/// The stream's length is implicit: the caller slices `data` either to an
/// explicit byte length or to whatever remains of the page.
#[derive(Debug)]
pub struct HybridRleDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    bit_width: u8,
    run: HybridRun<'a>,
}

impl<'a> HybridRleDecoder<'a> {
    pub fn try_new(data: &'a [u8], bit_width: u8) -> ParquetResult<Self> {
        if bit_width > MAX_BIT_WIDTH {
            return Err(fmt_err!(
                Invalid,
                "bit width {} exceeds {}",
                bit_width,
                MAX_BIT_WIDTH
            ));
        }
        Ok(Self { data, pos: 0, bit_width, run: HybridRun::None })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Bytes of the stream consumed so far. A run counts as consumed as soon
    /// as its header is read.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Decodes the next value.
    pub fn next(&mut self) -> ParquetResult<u32> {
        if self.run_remaining() == 0 {
            self.load_next_run()?;
        }
        match &mut self.run {
            HybridRun::Rle { value, remaining } => {
                *remaining -= 1;
                Ok(*value)
            }
            HybridRun::Bitpacked { data, index, remaining } => {
                let value = unpack(data, *index, self.bit_width);
                *index += 1;
                *remaining -= 1;
                Ok(value)
            }
            HybridRun::None => unreachable!("a run was just loaded"),
        }
    }

    /// Decodes `count` (at most 16) definition levels of bit width 1.
    ///
    /// Returns the null mask, bit `i` set when slot `i` has level 0, and the
    /// number of non-null slots.
    pub fn read_null_mask(&mut self, count: usize) -> ParquetResult<(u16, usize)> {
        assert!(count <= 16, "null masks cover at most 16 slots, {} requested", count);
        debug_assert_eq!(self.bit_width, 1);
        let mut nulls = 0u16;
        let mut filled = 0;
        while filled < count {
            if self.run_remaining() == 0 {
                self.load_next_run()?;
            }
            let take;
            match &mut self.run {
                HybridRun::Rle { value, remaining } => {
                    take = (*remaining).min(count - filled);
                    if *value == 0 {
                        nulls |= low_bits(take) << filled;
                    }
                    *remaining -= take;
                }
                HybridRun::Bitpacked { data, index, remaining } => {
                    take = (*remaining).min(count - filled);
                    let defined = extract_bits(data, *index, take);
                    nulls |= (!defined & low_bits(take)) << filled;
                    *index += take;
                    *remaining -= take;
                }
                HybridRun::None => unreachable!("a run was just loaded"),
            }
            filled += take;
        }
        Ok((nulls, count - nulls.count_ones() as usize))
    }

    fn run_remaining(&self) -> usize {
        match self.run {
            HybridRun::None => 0,
            HybridRun::Rle { remaining, .. } => remaining,
            HybridRun::Bitpacked { remaining, .. } => remaining,
        }
    }

    fn load_next_run(&mut self) -> ParquetResult<()> {
        loop {
            if self.pos >= self.data.len() {
                return Err(fmt_err!(
                    Layout,
                    "hybrid stream of {} bytes ran out of runs",
                    self.data.len()
                ));
            }
            let (header, header_len) = decode_varint_slice(&self.data[self.pos..])?;
            self.pos += header_len;
            let count = (header >> 1) as usize;
            if header & 1 == 1 {
                let (Some(byte_len), Some(values)) =
                    (count.checked_mul(self.bit_width as usize), count.checked_mul(8))
                else {
                    return Err(fmt_err!(Invalid, "bit-packed run of {} groups", count));
                };
                let data = self.view(byte_len)?;
                self.run = HybridRun::Bitpacked { data, index: 0, remaining: values };
            } else {
                let value_bytes = self.bit_width.div_ceil(8) as usize;
                let bytes = self.view(value_bytes)?;
                let value = bytes
                    .iter()
                    .rev()
                    .fold(0u32, |acc, &b| (acc << 8) | b as u32);
                self.run = HybridRun::Rle { value, remaining: count };
            }
            // Empty runs are legal; keep going until one carries values.
            if self.run_remaining() > 0 {
                return Ok(());
            }
        }
    }

    fn view(&mut self, len: usize) -> ParquetResult<&'a [u8]> {
        let data = self.data;
        let end = self.pos.saturating_add(len);
        if end > data.len() {
            return Err(fmt_err!(
                Layout,
                "hybrid run needs {} bytes at offset {}, stream has {}",
                len,
                self.pos,
                data.len()
            ));
        }
        let res = &data[self.pos..end];
        self.pos = end;
        Ok(res)
    }
}

#[inline]
fn low_bits(count: usize) -> u16 {
    if count >= 16 {
        u16::MAX
    } else {
        (1u16 << count) - 1
    }
}

/// Reads up to 64 bits starting at `bit_offset`, LSB-first. Bytes past the end
/// of `data` read as zero.
#[inline]
fn load_word(data: &[u8], bit_offset: usize) -> u64 {
    let start = bit_offset / 8;
    let mut word = 0u64;
    for (i, &b) in data.iter().skip(start).take(8).enumerate() {
        word |= (b as u64) << (8 * i);
    }
    word >> (bit_offset % 8)
}

/// Unpacks value `index` of a bit-packed run.
#[inline]
fn unpack(data: &[u8], index: usize, bit_width: u8) -> u32 {
    if bit_width == 0 {
        return 0;
    }
    let word = load_word(data, index * bit_width as usize);
    (word & ((1u64 << bit_width) - 1)) as u32
}

/// `count` (at most 16) consecutive single-bit values starting at `index`.
#[inline]
fn extract_bits(data: &[u8], index: usize, count: usize) -> u16 {
    (load_word(data, index) as u16) & low_bits(count)
}
