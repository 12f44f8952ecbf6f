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

//! Parquet metadata records and their compact-protocol codecs.
//!
//! Each record kind implements [`ThriftRecord`] once; callers stay generic over
//! the trait instead of switching on the kind.

mod records;
mod types;

pub use records::{
    ColumnChunk, ColumnMetaData, DataPageHeader, DataPageHeaderV2, DictionaryPageHeader,
    FileMetaData, KeyValue, PageHeader, RowGroup, SchemaElement, Statistics,
};
pub use types::{Compression, Encoding, PageType, PhysicalType, Repetition};

use crate::parquet::config::DecodeOptions;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::thrift::{TCompactInputProtocol, TCompactOutputProtocol, TListIdentifier, TType};
use std::fmt::{Display, Formatter};
use std::io::Write;

/// Tag identifying a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    FileMetaData,
    SchemaElement,
    RowGroup,
    ColumnChunk,
    ColumnMetaData,
    KeyValue,
    Statistics,
    PageHeader,
    DataPageHeader,
    DataPageHeaderV2,
    DictionaryPageHeader,
}

impl RecordKind {
    pub fn name(self) -> &'static str {
        match self {
            RecordKind::FileMetaData => "FileMetaData",
            RecordKind::SchemaElement => "SchemaElement",
            RecordKind::RowGroup => "RowGroup",
            RecordKind::ColumnChunk => "ColumnChunk",
            RecordKind::ColumnMetaData => "ColumnMetaData",
            RecordKind::KeyValue => "KeyValue",
            RecordKind::Statistics => "Statistics",
            RecordKind::PageHeader => "PageHeader",
            RecordKind::DataPageHeader => "DataPageHeader",
            RecordKind::DataPageHeaderV2 => "DataPageHeaderV2",
            RecordKind::DictionaryPageHeader => "DictionaryPageHeader",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A struct that can be read from and written to the compact protocol.
pub trait ThriftRecord: Sized {
    const KIND: RecordKind;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self>;

    /// Returns the number of bytes written.
    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize>;
}

/// Decodes one record from the front of `data`, returning it and the bytes consumed.
pub fn read_record<T: ThriftRecord>(
    data: &[u8],
    options: &DecodeOptions,
) -> ParquetResult<(T, usize)> {
    let mut prot = TCompactInputProtocol::new(data, options);
    let record = T::read_from_in_protocol(&mut prot)
        .with_context(|_| format!("could not decode {}", T::KIND))?;
    Ok((record, prot.location()))
}

/// Encodes one record, appending it to `out`. Returns the bytes written.
pub fn write_record<T: ThriftRecord>(record: &T, out: &mut Vec<u8>) -> ParquetResult<usize> {
    let mut prot = TCompactOutputProtocol::new(out);
    record.write_to_out_protocol(&mut prot)
}

fn required<T>(value: Option<T>, field: &str, kind: RecordKind) -> ParquetResult<T> {
    value.ok_or_else(|| fmt_err!(Invalid, "required field {}.{} is missing", kind, field))
}

fn read_list<T: ThriftRecord>(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Vec<T>> {
    let list = prot.read_list_begin()?;
    if list.element_type != TType::Struct {
        return Err(fmt_err!(
            Invalid,
            "expected a list of {} structs, found {:?} elements",
            T::KIND,
            list.element_type
        ));
    }
    let mut items = Vec::with_capacity(list.size);
    for _ in 0..list.size {
        items.push(T::read_from_in_protocol(prot)?);
    }
    prot.read_list_end()?;
    Ok(items)
}

fn read_i32_list(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Vec<i32>> {
    let list = prot.read_list_begin()?;
    let mut items = Vec::with_capacity(list.size);
    for _ in 0..list.size {
        items.push(prot.read_i32()?);
    }
    prot.read_list_end()?;
    Ok(items)
}

fn read_string_list(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Vec<String>> {
    let list = prot.read_list_begin()?;
    let mut items = Vec::with_capacity(list.size);
    for _ in 0..list.size {
        items.push(prot.read_string()?);
    }
    prot.read_list_end()?;
    Ok(items)
}

fn write_i32_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: i32,
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::I32, id)? + prot.write_i32(value)? + prot.write_field_end()?)
}

fn write_i64_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: i64,
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::I64, id)? + prot.write_i64(value)? + prot.write_field_end()?)
}

fn write_i16_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: i16,
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::I16, id)? + prot.write_i16(value)? + prot.write_field_end()?)
}

fn write_bool_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: bool,
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::Bool, id)? + prot.write_bool(value)? + prot.write_field_end()?)
}

fn write_binary_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: &[u8],
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::Binary, id)?
        + prot.write_binary(value)?
        + prot.write_field_end()?)
}

fn write_struct_field<W: Write, T: ThriftRecord>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    value: &T,
) -> ParquetResult<usize> {
    Ok(prot.write_field_begin(TType::Struct, id)?
        + value.write_to_out_protocol(prot)?
        + prot.write_field_end()?)
}

fn write_list_field<W: Write, T: ThriftRecord>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    values: &[T],
) -> ParquetResult<usize> {
    let mut written = prot.write_field_begin(TType::List, id)?;
    written += prot.write_list_begin(&TListIdentifier::new(TType::Struct, values.len()))?;
    for value in values {
        written += value.write_to_out_protocol(prot)?;
    }
    written += prot.write_list_end()?;
    Ok(written + prot.write_field_end()?)
}

fn write_i32_list_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    values: impl ExactSizeIterator<Item = i32>,
) -> ParquetResult<usize> {
    let mut written = prot.write_field_begin(TType::List, id)?;
    written += prot.write_list_begin(&TListIdentifier::new(TType::I32, values.len()))?;
    for value in values {
        written += prot.write_i32(value)?;
    }
    written += prot.write_list_end()?;
    Ok(written + prot.write_field_end()?)
}

fn write_string_list_field<W: Write>(
    prot: &mut TCompactOutputProtocol<W>,
    id: i16,
    values: &[String],
) -> ParquetResult<usize> {
    let mut written = prot.write_field_begin(TType::List, id)?;
    written += prot.write_list_begin(&TListIdentifier::new(TType::Binary, values.len()))?;
    for value in values {
        written += prot.write_string(value)?;
    }
    written += prot.write_list_end()?;
    Ok(written + prot.write_field_end()?)
}
