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

//! Write side: assembles flat, uncompressed files that the reader accepts.

mod file;
pub mod plain;
pub mod rle;

pub use file::{ParquetWriter, DEFAULT_PAGE_ROW_COUNT};
pub use plain::PlainEncoder;
pub use rle::{bit_width_for, encode_def_levels_v1, HybridRleEncoder};

use crate::metadata::PhysicalType;

/// Name and physical type of one optional leaf column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub physical_type: PhysicalType,
    /// Set for fixed-length byte arrays only.
    pub type_length: Option<i32>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self { name: name.into(), physical_type, type_length: None }
    }

    pub fn fixed_len_byte_array(name: impl Into<String>, type_length: i32) -> Self {
        Self {
            name: name.into(),
            physical_type: PhysicalType::FixedLenByteArray,
            type_length: Some(type_length),
        }
    }
}

/// The values of one column within a row group, `None` for nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Boolean(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float(Vec<Option<f32>>),
    Double(Vec<Option<f64>>),
    ByteArray(Vec<Option<Vec<u8>>>),
    FixedLenByteArray(Vec<Option<Vec<u8>>>),
}

impl ColumnValues {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            ColumnValues::Boolean(_) => PhysicalType::Boolean,
            ColumnValues::Int32(_) => PhysicalType::Int32,
            ColumnValues::Int64(_) => PhysicalType::Int64,
            ColumnValues::Float(_) => PhysicalType::Float,
            ColumnValues::Double(_) => PhysicalType::Double,
            ColumnValues::ByteArray(_) => PhysicalType::ByteArray,
            ColumnValues::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    /// Number of slots, nulls included.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Double(v) => v.len(),
            ColumnValues::ByteArray(v) => v.len(),
            ColumnValues::FixedLenByteArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
