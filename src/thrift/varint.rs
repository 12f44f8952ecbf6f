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

//! ULEB128 varints and zigzag mapping used by the compact protocol.

use crate::parquet::error::{fmt_err, ParquetResult};
use crate::parquet::io::SliceCursor;

/// A `u64` never needs more than 10 varint bytes; a longer stream is corrupt.
pub const MAX_VARINT_LEN: usize = 10;

#[inline]
pub fn zigzag_i16(v: i16) -> u16 {
    ((v << 1) ^ (v >> 15)) as u16
}

#[inline]
pub fn zigzag_i32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

#[inline]
pub fn zigzag_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
pub fn from_zigzag_i16(v: u16) -> i16 {
    ((v >> 1) as i16) ^ -((v & 1) as i16)
}

#[inline]
pub fn from_zigzag_i32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

#[inline]
pub fn from_zigzag_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Writes `value` into `container`, returning the number of bytes used.
pub fn encode_varint(mut value: u64, container: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut used = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            container[used] = byte;
            return used + 1;
        }
        container[used] = byte | 0x80;
        used += 1;
    }
}

/// Reads one varint, failing on truncation or on more than [`MAX_VARINT_LEN`] bytes.
pub fn decode_varint(cursor: &mut SliceCursor<'_>) -> ParquetResult<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    for _ in 0..MAX_VARINT_LEN {
        let byte = cursor.read_u8()?;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(fmt_err!(
        Invalid,
        "varint at offset {} is longer than {} bytes",
        cursor.location() - MAX_VARINT_LEN,
        MAX_VARINT_LEN
    ))
}

/// Decodes a varint from the front of `data`, returning `(value, bytes_used)`.
pub fn decode_varint_slice(data: &[u8]) -> ParquetResult<(u64, usize)> {
    let mut cursor = SliceCursor::new(data);
    let value = decode_varint(&mut cursor)?;
    Ok((value, cursor.location()))
}
