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

//! Thrift compact protocol, the framing used by Parquet metadata and page headers.
//!
//! Only the compact protocol is implemented. The reader borrows binary values
//! straight out of the resident buffer; the writer targets any [`std::io::Write`].

mod compact;
mod compact_write;
pub mod varint;

pub use compact::TCompactInputProtocol;
pub use compact_write::TCompactOutputProtocol;

use crate::parquet::error::{fmt_err, ParquetResult};

/// Nesting depth of structs the protocol tracks field ids for.
pub const MAX_STRUCT_DEPTH: usize = 8;

/// Logical value types of the thrift type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TType {
    Stop,
    Bool,
    I08,
    I16,
    I32,
    I64,
    Double,
    Binary,
    List,
    Set,
    Map,
    Struct,
}

impl TType {
    /// The compact protocol type nibble. Booleans in field headers use
    /// [`COMPACT_BOOLEAN_TRUE`] / [`COMPACT_BOOLEAN_FALSE`] instead.
    pub fn compact_code(self) -> u8 {
        match self {
            TType::Stop => 0x00,
            TType::Bool => COMPACT_BOOLEAN_TRUE,
            TType::I08 => 0x03,
            TType::I16 => 0x04,
            TType::I32 => 0x05,
            TType::I64 => 0x06,
            TType::Double => 0x07,
            TType::Binary => 0x08,
            TType::List => 0x09,
            TType::Set => 0x0A,
            TType::Map => 0x0B,
            TType::Struct => 0x0C,
        }
    }

    pub fn from_compact_code(code: u8) -> ParquetResult<Self> {
        match code {
            0x00 => Ok(TType::Stop),
            COMPACT_BOOLEAN_TRUE | COMPACT_BOOLEAN_FALSE => Ok(TType::Bool),
            0x03 => Ok(TType::I08),
            0x04 => Ok(TType::I16),
            0x05 => Ok(TType::I32),
            0x06 => Ok(TType::I64),
            0x07 => Ok(TType::Double),
            0x08 => Ok(TType::Binary),
            0x09 => Ok(TType::List),
            0x0A => Ok(TType::Set),
            0x0B => Ok(TType::Map),
            0x0C => Ok(TType::Struct),
            unknown => Err(fmt_err!(Invalid, "unknown compact type code {:#04x}", unknown)),
        }
    }
}

pub const COMPACT_BOOLEAN_TRUE: u8 = 0x01;
pub const COMPACT_BOOLEAN_FALSE: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TFieldIdentifier {
    pub field_type: TType,
    /// `None` only for the stop marker.
    pub id: Option<i16>,
}

impl TFieldIdentifier {
    pub fn new(field_type: TType, id: i16) -> Self {
        Self { field_type, id: Some(id) }
    }

    pub fn stop() -> Self {
        Self { field_type: TType::Stop, id: None }
    }
}

/// Header of a list or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TListIdentifier {
    pub element_type: TType,
    pub size: usize,
}

impl TListIdentifier {
    pub fn new(element_type: TType, size: usize) -> Self {
        Self { element_type, size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TMapIdentifier {
    /// `None` for empty maps, which carry no type byte.
    pub key_type: Option<TType>,
    pub value_type: Option<TType>,
    pub size: usize,
}
