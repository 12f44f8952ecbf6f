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

//! Read path: values, batches and the column/file state machines.

mod column;
pub mod decoders;
mod delta;
mod file;
mod page;

pub use column::{ColumnReader, ReaderState};
pub use delta::DeltaColumnReader;
pub use file::FileReader;

use crate::metadata::PhysicalType;
use num_traits::FromBytes;

/// Number of slots in a [`Vector`].
pub const VECTOR_CAPACITY: usize = 16;

/// Decodes a little-endian scalar from exactly `size_of::<T>()` bytes.
#[inline]
pub(crate) fn decode_le<T>(bytes: &[u8]) -> T
where
    T: FromBytes,
    T::Bytes: Default,
{
    let mut le = T::Bytes::default();
    le.as_mut().copy_from_slice(bytes);
    T::from_le_bytes(&le)
}

/// A single decoded value.
///
/// Everything but booleans is a view into the resident buffer, so a value
/// never outlives the bytes it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Boolean(bool),
    Int32(&'a [u8]),
    Int64(&'a [u8]),
    Float(&'a [u8]),
    Double(&'a [u8]),
    /// Includes the 4-byte little-endian length prefix.
    ByteArray(&'a [u8]),
    /// Width comes from the schema; there is no prefix.
    FixedLenByteArray(&'a [u8]),
}

impl Default for Value<'_> {
    fn default() -> Self {
        Value::Boolean(false)
    }
}

impl<'a> Value<'a> {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            Value::Boolean(_) => PhysicalType::Boolean,
            Value::Int32(_) => PhysicalType::Int32,
            Value::Int64(_) => PhysicalType::Int64,
            Value::Float(_) => PhysicalType::Float,
            Value::Double(_) => PhysicalType::Double,
            Value::ByteArray(_) => PhysicalType::ByteArray,
            Value::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    /// Encoded size in the page, 0 for booleans which are stored as bits.
    pub fn byte_len(&self) -> usize {
        match self {
            Value::Boolean(_) => 0,
            Value::Int32(b)
            | Value::Int64(b)
            | Value::Float(b)
            | Value::Double(b)
            | Value::ByteArray(b)
            | Value::FixedLenByteArray(b) => b.len(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(v) => *v,
            other => panic!("expected a boolean value, got {:?}", other.physical_type()),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Value::Int32(b) => decode_le(b),
            other => panic!("expected an int32 value, got {:?}", other.physical_type()),
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Int64(b) => decode_le(b),
            other => panic!("expected an int64 value, got {:?}", other.physical_type()),
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            Value::Float(b) => decode_le(b),
            other => panic!("expected a float value, got {:?}", other.physical_type()),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Double(b) => decode_le(b),
            other => panic!("expected a double value, got {:?}", other.physical_type()),
        }
    }

    /// Payload of a byte array, without the length prefix.
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Value::ByteArray(b) => &b[4..],
            Value::FixedLenByteArray(b) => b,
            other => panic!("expected a byte array value, got {:?}", other.physical_type()),
        }
    }

    /// Deep copy that no longer borrows the buffer.
    pub fn to_owned_value(&self) -> OwnedValue {
        match self {
            Value::Boolean(v) => OwnedValue::Boolean(*v),
            Value::Int32(_) => OwnedValue::Int32(self.as_i32()),
            Value::Int64(_) => OwnedValue::Int64(self.as_i64()),
            Value::Float(_) => OwnedValue::Float(self.as_f32()),
            Value::Double(_) => OwnedValue::Double(self.as_f64()),
            Value::ByteArray(_) => OwnedValue::ByteArray(self.as_bytes().to_vec()),
            Value::FixedLenByteArray(b) => OwnedValue::FixedLenByteArray(b.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnedValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    FixedLenByteArray(Vec<u8>),
}

/// A batch of up to [`VECTOR_CAPACITY`] slots.
///
/// Non-null values are stored densely in slot order; the null mask has bit `i`
/// set when slot `i` is null.
#[derive(Debug, Clone, Default)]
pub struct Vector<'a> {
    values: [Value<'a>; VECTOR_CAPACITY],
    nulls: u16,
    total_count: usize,
    value_count: usize,
}

impl<'a> Vector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nulls = 0;
        self.total_count = 0;
        self.value_count = 0;
    }

    /// Slots produced by the last read, nulls included.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Non-null values produced by the last read.
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    pub fn values(&self) -> &[Value<'a>] {
        &self.values[..self.value_count]
    }

    pub fn nulls(&self) -> u16 {
        self.nulls
    }

    pub fn is_null(&self, slot: usize) -> bool {
        assert!(slot < self.total_count, "slot {} out of {}", slot, self.total_count);
        self.nulls & (1 << slot) != 0
    }

    /// One entry per slot, `None` for nulls.
    pub fn iter(&self) -> impl Iterator<Item = Option<Value<'a>>> + '_ {
        let mut values = self.values().iter();
        (0..self.total_count).map(move |slot| {
            if self.nulls & (1 << slot) != 0 {
                None
            } else {
                values.next().copied()
            }
        })
    }

    #[inline]
    pub(crate) fn push(&mut self, value: Value<'a>) {
        assert!(self.value_count < VECTOR_CAPACITY, "vector is full");
        self.values[self.value_count] = value;
        self.value_count += 1;
    }

    pub(crate) fn set_slots(&mut self, total_count: usize, nulls: u16) {
        debug_assert!(total_count <= VECTOR_CAPACITY);
        self.total_count = total_count;
        self.nulls = nulls;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        let int = 7i32.to_le_bytes();
        let long = (-3i64).to_le_bytes();
        let double = 2.5f64.to_le_bytes();
        assert_eq!(Value::Int32(&int).as_i32(), 7);
        assert_eq!(Value::Int64(&long).as_i64(), -3);
        assert_eq!(Value::Double(&double).as_f64(), 2.5);
        assert_eq!(Value::Double(&double).byte_len(), 8);
        assert!(Value::Boolean(true).as_bool());
    }

    #[test]
    fn test_byte_array_keeps_prefix() {
        let data = [3u8, 0, 0, 0, b'a', b'b', b'c'];
        let value = Value::ByteArray(&data);
        assert_eq!(value.byte_len(), 7);
        assert_eq!(value.as_bytes(), b"abc");
        assert_eq!(value.to_owned_value(), OwnedValue::ByteArray(b"abc".to_vec()));
    }

    #[test]
    #[should_panic(expected = "expected an int64 value")]
    fn test_kind_mismatch_panics() {
        let int = 7i32.to_le_bytes();
        Value::Int32(&int).as_i64();
    }

    #[test]
    fn test_vector_iter_interleaves_nulls() {
        let a = 1i32.to_le_bytes();
        let b = 2i32.to_le_bytes();
        let mut vector = Vector::new();
        vector.push(Value::Int32(&a));
        vector.push(Value::Int32(&b));
        vector.set_slots(3, 0b010);

        assert_eq!(vector.total_count(), 3);
        assert_eq!(vector.value_count(), 2);
        assert!(vector.is_null(1));
        let slots: Vec<Option<i32>> = vector.iter().map(|v| v.map(|v| v.as_i32())).collect();
        assert_eq!(slots, vec![Some(1), None, Some(2)]);

        vector.clear();
        assert_eq!(vector.iter().count(), 0);
    }
}
