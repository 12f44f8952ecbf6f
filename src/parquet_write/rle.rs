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
use crate::parquet_read::decoders::MAX_BIT_WIDTH;
use crate::thrift::varint::{encode_varint, MAX_VARINT_LEN};

// Shortest repetition worth an RLE run.
const MIN_RLE_RUN: usize = 8;
const GROUP_SIZE: usize = 8;

/// Encoder for the RLE / bit-packed hybrid.
///
/// Repetitions of at least 8 become RLE runs; everything else is bit-packed
/// in groups of 8, the last group zero-padded.
pub struct HybridRleEncoder {
    bit_width: u8,
    buffer: Vec<u8>,
    literals: Vec<u32>,
}

impl HybridRleEncoder {
    pub fn try_new(bit_width: u8) -> ParquetResult<Self> {
        if bit_width > MAX_BIT_WIDTH {
            return Err(fmt_err!(
                Invalid,
                "bit width {} exceeds the maximum of {}",
                bit_width,
                MAX_BIT_WIDTH
            ));
        }
        Ok(Self { bit_width, buffer: Vec::new(), literals: Vec::new() })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Encodes `values` as one stream.
    pub fn encode(&mut self, values: &[u32]) -> ParquetResult<()> {
        if let Some(&value) = values.iter().find(|&&v| bit_width_for(v) > self.bit_width) {
            return Err(fmt_err!(
                Invalid,
                "value {} does not fit in {} bits",
                value,
                self.bit_width
            ));
        }
        let mut i = 0;
        while i < values.len() {
            let value = values[i];
            let mut run = values[i..].iter().take_while(|&&v| v == value).count();
            if run >= MIN_RLE_RUN {
                // Top pending literals up to a whole group from the run itself.
                let fill = (GROUP_SIZE - self.literals.len() % GROUP_SIZE) % GROUP_SIZE;
                self.literals.extend(std::iter::repeat(value).take(fill));
                self.flush_literals();
                run -= fill;
                i += fill;
                if run >= MIN_RLE_RUN {
                    self.write_rle_run(value, run);
                } else {
                    self.literals.extend(std::iter::repeat(value).take(run));
                }
            } else {
                self.literals.extend(std::iter::repeat(value).take(run));
            }
            i += run;
        }
        self.flush_literals();
        Ok(())
    }

    pub fn into_inner(mut self) -> Vec<u8> {
        self.flush_literals();
        self.buffer
    }

    fn write_rle_run(&mut self, value: u32, count: usize) {
        self.write_varint((count as u64) << 1);
        let width = (self.bit_width as usize).div_ceil(8);
        self.buffer.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    fn flush_literals(&mut self) {
        if self.literals.is_empty() {
            return;
        }
        let groups = self.literals.len().div_ceil(GROUP_SIZE);
        self.literals.resize(groups * GROUP_SIZE, 0);
        self.write_varint(((groups as u64) << 1) | 1);

        let bit_width = self.bit_width as u32;
        let mut acc = 0u64;
        let mut acc_bits = 0u32;
        for &value in &self.literals {
            acc |= (value as u64) << acc_bits;
            acc_bits += bit_width;
            while acc_bits >= 8 {
                self.buffer.push(acc as u8);
                acc >>= 8;
                acc_bits -= 8;
            }
        }
        // 8 values always fill whole bytes.
        debug_assert_eq!(acc_bits, 0);
        self.literals.clear();
    }

    fn write_varint(&mut self, value: u64) {
        let mut container = [0u8; MAX_VARINT_LEN];
        let len = encode_varint(value, &mut container);
        self.buffer.extend_from_slice(&container[..len]);
    }
}

/// Bits needed to store `max`.
pub fn bit_width_for(max: u32) -> u8 {
    (u32::BITS - max.leading_zeros()) as u8
}

/// Appends V1 definition levels of a flat optional column: the u32 byte length,
/// then the bit-width-1 hybrid stream.
pub fn encode_def_levels_v1(
    buffer: &mut Vec<u8>,
    defined: impl Iterator<Item = bool>,
) -> ParquetResult<()> {
    let levels: Vec<u32> = defined.map(u32::from).collect();
    let mut encoder = HybridRleEncoder::try_new(1)?;
    encoder.encode(&levels)?;
    let encoded = encoder.into_inner();
    buffer.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parquet_read::decoders::HybridRleDecoder;

    fn encode(bit_width: u8, values: &[u32]) -> Vec<u8> {
        let mut encoder = HybridRleEncoder::try_new(bit_width).unwrap();
        encoder.encode(values).unwrap();
        encoder.into_inner()
    }

    fn decode(bit_width: u8, data: &[u8], count: usize) -> Vec<u32> {
        let mut decoder = HybridRleDecoder::try_new(data, bit_width).unwrap();
        (0..count).map(|_| decoder.next().unwrap()).collect()
    }

    #[test]
    fn test_rle_run() {
        assert_eq!(encode(3, &[5; 10]), vec![20, 5]);
    }

    #[test]
    fn test_bitpacked_group() {
        let values: Vec<u32> = (0..8).collect();
        assert_eq!(encode(3, &values), vec![3, 0x88, 0xC6, 0xFA]);
    }

    #[test]
    fn test_short_tail_is_padded() {
        let encoded = encode(1, &[1, 0, 1]);
        assert_eq!(encoded, vec![3, 0b101]);
        assert_eq!(decode(1, &encoded, 3), vec![1, 0, 1]);
    }

    #[test]
    fn test_mixed_runs() {
        let mut values = vec![1, 2, 3];
        values.extend(std::iter::repeat(7).take(20));
        values.extend([0, 1, 2, 300, 4]);
        let encoded = encode(bit_width_for(300), &values);
        assert_eq!(decode(9, &encoded, values.len()), values);
    }

    #[test]
    fn test_value_too_wide() {
        let mut encoder = HybridRleEncoder::try_new(2).unwrap();
        assert!(encoder.encode(&[4]).is_err());
        assert!(HybridRleEncoder::try_new(33).is_err());
    }

    #[test]
    fn test_bit_width_for() {
        assert_eq!(bit_width_for(0), 0);
        assert_eq!(bit_width_for(1), 1);
        assert_eq!(bit_width_for(2), 2);
        assert_eq!(bit_width_for(255), 8);
        assert_eq!(bit_width_for(u32::MAX), 32);
    }

    #[test]
    fn test_def_levels() {
        let mut buffer = Vec::new();
        encode_def_levels_v1(&mut buffer, [true; 16].into_iter()).unwrap();
        assert_eq!(buffer, vec![2, 0, 0, 0, 32, 1]);
    }
}
