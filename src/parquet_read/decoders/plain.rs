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

use crate::metadata::PhysicalType;
use crate::parquet::error::{fmt_err, ParquetResult};
use crate::parquet::io::SliceCursor;
use crate::parquet_read::{Value, Vector};

/// Zero-copy decoder for `PLAIN` values.
///
/// Every value is a view into the page; only booleans, packed 8 per byte
/// LSB-first, are materialized.
#[derive(Debug, Clone)]
pub struct PlainDecoder<'a> {
    cursor: SliceCursor<'a>,
    physical_type: PhysicalType,
    type_length: usize,
    bits: u8,
    bit_offset: u8,
}

impl<'a> PlainDecoder<'a> {
    /// `type_length` is only read for fixed-length byte arrays.
    pub fn try_new(
        data: &'a [u8],
        physical_type: PhysicalType,
        type_length: Option<usize>,
    ) -> ParquetResult<Self> {
        let type_length = match physical_type {
            PhysicalType::FixedLenByteArray => type_length.ok_or_else(|| {
                fmt_err!(Invalid, "fixed-length byte array column without a type length")
            })?,
            PhysicalType::Int96 => {
                return Err(fmt_err!(Unsupported, "INT96 values are not supported"));
            }
            other => other.fixed_width().unwrap_or(0),
        };
        Ok(Self { cursor: SliceCursor::new(data), physical_type, type_length, bits: 0, bit_offset: 0 })
    }

    /// Bytes consumed so far. A partially read boolean byte counts as consumed.
    pub fn consumed(&self) -> usize {
        self.cursor.location()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn read_value(&mut self) -> ParquetResult<Value<'a>> {
        match self.physical_type {
            PhysicalType::Boolean => self.read_bool().map(Value::Boolean),
            PhysicalType::ByteArray => self.read_byte_array(),
            other => {
                let bytes = self.cursor.view(self.type_length)?;
                Ok(fixed_value(other)(bytes))
            }
        }
    }

    /// Appends `count` values to `out` in one pass.
    pub fn read_vec(&mut self, count: usize, out: &mut Vector<'a>) -> ParquetResult<()> {
        match self.physical_type {
            PhysicalType::Boolean => {
                for _ in 0..count {
                    out.push(Value::Boolean(self.read_bool()?));
                }
            }
            PhysicalType::ByteArray => {
                for _ in 0..count {
                    out.push(self.read_byte_array()?);
                }
            }
            other => {
                let width = self.type_length;
                let bytes = self.cursor.view(width * count)?;
                let ctor = fixed_value(other);
                if width == 0 {
                    // Zero-width fixed-length arrays still occupy their slots.
                    (0..count).for_each(|_| out.push(ctor(bytes)));
                } else {
                    bytes.chunks_exact(width).for_each(|chunk| out.push(ctor(chunk)));
                }
            }
        }
        Ok(())
    }

    /// A length-prefixed byte array; the returned view keeps the prefix.
    pub fn read_byte_array(&mut self) -> ParquetResult<Value<'a>> {
        let start = self.cursor.location();
        let mut prefix = [0u8; 4];
        self.cursor.read_all(&mut prefix)?;
        let len = u32::from_le_bytes(prefix) as usize;
        self.cursor.skip(len).map_err(|mut err| {
            err.add_context(format!("byte array of {} bytes at offset {}", len, start));
            err
        })?;
        Ok(Value::ByteArray(&self.cursor.data()[start..self.cursor.location()]))
    }

    pub fn read_bool(&mut self) -> ParquetResult<bool> {
        if self.bit_offset == 0 {
            self.bits = self.cursor.read_u8()?;
        }
        let value = (self.bits >> self.bit_offset) & 1 == 1;
        self.bit_offset = (self.bit_offset + 1) % 8;
        Ok(value)
    }
}

fn fixed_value<'a>(physical_type: PhysicalType) -> fn(&'a [u8]) -> Value<'a> {
    match physical_type {
        PhysicalType::Int32 => Value::Int32,
        PhysicalType::Int64 => Value::Int64,
        PhysicalType::Float => Value::Float,
        PhysicalType::Double => Value::Double,
        _ => Value::FixedLenByteArray,
    }
}
