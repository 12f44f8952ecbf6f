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

use super::types::{Compression, Encoding, PageType, PhysicalType, Repetition};
use super::{
    read_i32_list, read_list, read_string_list, required, write_binary_field, write_bool_field,
    write_i16_field, write_i32_field, write_i32_list_field, write_i64_field, write_list_field,
    write_string_list_field, write_struct_field, RecordKind, ThriftRecord,
};
use crate::parquet::error::ParquetResult;
use crate::thrift::{TCompactInputProtocol, TCompactOutputProtocol, TType};
use std::io::Write;

/// Drives the field loop of one struct, handing every field to `on_field`.
/// Fields `on_field` doesn't consume (returns `false` for) are skipped.
fn read_struct<'a, F>(prot: &mut TCompactInputProtocol<'a>, mut on_field: F) -> ParquetResult<()>
where
    F: FnMut(&mut TCompactInputProtocol<'a>, i16, TType) -> ParquetResult<bool>,
{
    prot.read_struct_begin()?;
    loop {
        let field = prot.read_field_begin()?;
        let Some(id) = field.id else {
            break;
        };
        if !on_field(prot, id, field.field_type)? {
            prot.skip(field.field_type)?;
        }
        prot.read_field_end()?;
    }
    prot.read_struct_end()
}

fn finish_struct<W: Write>(prot: &mut TCompactOutputProtocol<W>) -> ParquetResult<usize> {
    Ok(prot.write_field_stop()? + prot.write_struct_end()?)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl ThriftRecord for KeyValue {
    const KIND: RecordKind = RecordKind::KeyValue;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut key = None;
        let mut value = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::Binary) => key = Some(prot.read_string()?),
                (2, TType::Binary) => value = Some(prot.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self { key: required(key, "key", Self::KIND)?, value })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_binary_field(prot, 1, self.key.as_bytes())?;
        if let Some(value) = &self.value {
            written += write_binary_field(prot, 2, value.as_bytes())?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

/// Column or page statistics. Kept opaque; only carried through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

impl ThriftRecord for Statistics {
    const KIND: RecordKind = RecordKind::Statistics;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut stats = Statistics::default();
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::Binary) => stats.max = Some(prot.read_binary()?.to_vec()),
                (2, TType::Binary) => stats.min = Some(prot.read_binary()?.to_vec()),
                (3, TType::I64) => stats.null_count = Some(prot.read_i64()?),
                (4, TType::I64) => stats.distinct_count = Some(prot.read_i64()?),
                (5, TType::Binary) => stats.max_value = Some(prot.read_binary()?.to_vec()),
                (6, TType::Binary) => stats.min_value = Some(prot.read_binary()?.to_vec()),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(stats)
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        if let Some(max) = &self.max {
            written += write_binary_field(prot, 1, max)?;
        }
        if let Some(min) = &self.min {
            written += write_binary_field(prot, 2, min)?;
        }
        if let Some(null_count) = self.null_count {
            written += write_i64_field(prot, 3, null_count)?;
        }
        if let Some(distinct_count) = self.distinct_count {
            written += write_i64_field(prot, 4, distinct_count)?;
        }
        if let Some(max_value) = &self.max_value {
            written += write_binary_field(prot, 5, max_value)?;
        }
        if let Some(min_value) = &self.min_value {
            written += write_binary_field(prot, 6, min_value)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

/// One node of the flattened schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaElement {
    /// `None` for group nodes, including the root.
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<i32>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
}

impl SchemaElement {
    /// An optional leaf column.
    pub fn optional(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self {
            physical_type: Some(physical_type),
            repetition: Some(Repetition::Optional),
            name: name.into(),
            ..Default::default()
        }
    }

    /// The synthetic root at schema index 0.
    pub fn root(name: impl Into<String>, num_children: i32) -> Self {
        Self { name: name.into(), num_children: Some(num_children), ..Default::default() }
    }
}

impl ThriftRecord for SchemaElement {
    const KIND: RecordKind = RecordKind::SchemaElement;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut element = SchemaElement::default();
        let mut name = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => {
                    element.physical_type = Some(PhysicalType::try_from(prot.read_i32()?)?)
                }
                (2, TType::I32) => element.type_length = Some(prot.read_i32()?),
                (3, TType::I32) => {
                    element.repetition = Some(Repetition::try_from(prot.read_i32()?)?)
                }
                (4, TType::Binary) => name = Some(prot.read_string()?),
                (5, TType::I32) => element.num_children = Some(prot.read_i32()?),
                (6, TType::I32) => element.converted_type = Some(prot.read_i32()?),
                (7, TType::I32) => element.scale = Some(prot.read_i32()?),
                (8, TType::I32) => element.precision = Some(prot.read_i32()?),
                (9, TType::I32) => element.field_id = Some(prot.read_i32()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        element.name = required(name, "name", Self::KIND)?;
        Ok(element)
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        if let Some(physical_type) = self.physical_type {
            written += write_i32_field(prot, 1, physical_type.code())?;
        }
        if let Some(type_length) = self.type_length {
            written += write_i32_field(prot, 2, type_length)?;
        }
        if let Some(repetition) = self.repetition {
            written += write_i32_field(prot, 3, repetition.code())?;
        }
        written += write_binary_field(prot, 4, self.name.as_bytes())?;
        for (id, value) in [
            (5, self.num_children),
            (6, self.converted_type),
            (7, self.scale),
            (8, self.precision),
            (9, self.field_id),
        ] {
            if let Some(value) = value {
                written += write_i32_field(prot, id, value)?;
            }
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Compression,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for ColumnMetaData {
    const KIND: RecordKind = RecordKind::ColumnMetaData;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut physical_type = None;
        let mut encodings = None;
        let mut path_in_schema = None;
        let mut codec = None;
        let mut num_values = None;
        let mut total_uncompressed_size = None;
        let mut total_compressed_size = None;
        let mut key_value_metadata = None;
        let mut data_page_offset = None;
        let mut index_page_offset = None;
        let mut dictionary_page_offset = None;
        let mut statistics = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => physical_type = Some(PhysicalType::try_from(prot.read_i32()?)?),
                (2, TType::List) => {
                    encodings = Some(
                        read_i32_list(prot)?
                            .into_iter()
                            .map(Encoding::try_from)
                            .collect::<ParquetResult<Vec<_>>>()?,
                    )
                }
                (3, TType::List) => path_in_schema = Some(read_string_list(prot)?),
                (4, TType::I32) => codec = Some(Compression::try_from(prot.read_i32()?)?),
                (5, TType::I64) => num_values = Some(prot.read_i64()?),
                (6, TType::I64) => total_uncompressed_size = Some(prot.read_i64()?),
                (7, TType::I64) => total_compressed_size = Some(prot.read_i64()?),
                (8, TType::List) => key_value_metadata = Some(read_list(prot)?),
                (9, TType::I64) => data_page_offset = Some(prot.read_i64()?),
                (10, TType::I64) => index_page_offset = Some(prot.read_i64()?),
                (11, TType::I64) => dictionary_page_offset = Some(prot.read_i64()?),
                (12, TType::Struct) => statistics = Some(Statistics::read_from_in_protocol(prot)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            physical_type: required(physical_type, "type", Self::KIND)?,
            encodings: required(encodings, "encodings", Self::KIND)?,
            path_in_schema: required(path_in_schema, "path_in_schema", Self::KIND)?,
            codec: required(codec, "codec", Self::KIND)?,
            num_values: required(num_values, "num_values", Self::KIND)?,
            total_uncompressed_size: required(
                total_uncompressed_size,
                "total_uncompressed_size",
                Self::KIND,
            )?,
            total_compressed_size: required(
                total_compressed_size,
                "total_compressed_size",
                Self::KIND,
            )?,
            key_value_metadata,
            data_page_offset: required(data_page_offset, "data_page_offset", Self::KIND)?,
            index_page_offset,
            dictionary_page_offset,
            statistics,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.physical_type.code())?;
        written += write_i32_list_field(prot, 2, self.encodings.iter().map(|e| e.code()))?;
        written += write_string_list_field(prot, 3, &self.path_in_schema)?;
        written += write_i32_field(prot, 4, self.codec.code())?;
        written += write_i64_field(prot, 5, self.num_values)?;
        written += write_i64_field(prot, 6, self.total_uncompressed_size)?;
        written += write_i64_field(prot, 7, self.total_compressed_size)?;
        if let Some(kv) = &self.key_value_metadata {
            written += write_list_field(prot, 8, kv)?;
        }
        written += write_i64_field(prot, 9, self.data_page_offset)?;
        if let Some(offset) = self.index_page_offset {
            written += write_i64_field(prot, 10, offset)?;
        }
        if let Some(offset) = self.dictionary_page_offset {
            written += write_i64_field(prot, 11, offset)?;
        }
        if let Some(statistics) = &self.statistics {
            written += write_struct_field(prot, 12, statistics)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunk {
    /// Set when the chunk lives in another file; never accepted by the readers.
    pub file_path: Option<String>,
    /// Deprecated absolute offset of the chunk metadata; must be zero.
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
}

impl ThriftRecord for ColumnChunk {
    const KIND: RecordKind = RecordKind::ColumnChunk;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut file_path = None;
        let mut file_offset = None;
        let mut meta_data = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::Binary) => file_path = Some(prot.read_string()?),
                (2, TType::I64) => file_offset = Some(prot.read_i64()?),
                (3, TType::Struct) => {
                    meta_data = Some(ColumnMetaData::read_from_in_protocol(prot)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            file_path,
            file_offset: required(file_offset, "file_offset", Self::KIND)?,
            meta_data,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        if let Some(path) = &self.file_path {
            written += write_binary_field(prot, 1, path.as_bytes())?;
        }
        written += write_i64_field(prot, 2, self.file_offset)?;
        if let Some(meta_data) = &self.meta_data {
            written += write_struct_field(prot, 3, meta_data)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub ordinal: Option<i16>,
}

impl ThriftRecord for RowGroup {
    const KIND: RecordKind = RecordKind::RowGroup;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut columns = None;
        let mut total_byte_size = None;
        let mut num_rows = None;
        let mut file_offset = None;
        let mut total_compressed_size = None;
        let mut ordinal = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::List) => columns = Some(read_list(prot)?),
                (2, TType::I64) => total_byte_size = Some(prot.read_i64()?),
                (3, TType::I64) => num_rows = Some(prot.read_i64()?),
                (5, TType::I64) => file_offset = Some(prot.read_i64()?),
                (6, TType::I64) => total_compressed_size = Some(prot.read_i64()?),
                (7, TType::I16) => ordinal = Some(prot.read_i16()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            columns: required(columns, "columns", Self::KIND)?,
            total_byte_size: required(total_byte_size, "total_byte_size", Self::KIND)?,
            num_rows: required(num_rows, "num_rows", Self::KIND)?,
            file_offset,
            total_compressed_size,
            ordinal,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_list_field(prot, 1, &self.columns)?;
        written += write_i64_field(prot, 2, self.total_byte_size)?;
        written += write_i64_field(prot, 3, self.num_rows)?;
        if let Some(offset) = self.file_offset {
            written += write_i64_field(prot, 5, offset)?;
        }
        if let Some(size) = self.total_compressed_size {
            written += write_i64_field(prot, 6, size)?;
        }
        if let Some(ordinal) = self.ordinal {
            written += write_i16_field(prot, 7, ordinal)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetaData {
    pub version: i32,
    /// Depth-first schema; index 0 is the root.
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
}

impl ThriftRecord for FileMetaData {
    const KIND: RecordKind = RecordKind::FileMetaData;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        let mut key_value_metadata = None;
        let mut created_by = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => version = Some(prot.read_i32()?),
                (2, TType::List) => schema = Some(read_list(prot)?),
                (3, TType::I64) => num_rows = Some(prot.read_i64()?),
                (4, TType::List) => row_groups = Some(read_list(prot)?),
                (5, TType::List) => key_value_metadata = Some(read_list(prot)?),
                (6, TType::Binary) => created_by = Some(prot.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            version: required(version, "version", Self::KIND)?,
            schema: required(schema, "schema", Self::KIND)?,
            num_rows: required(num_rows, "num_rows", Self::KIND)?,
            row_groups: required(row_groups, "row_groups", Self::KIND)?,
            key_value_metadata,
            created_by,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.version)?;
        written += write_list_field(prot, 2, &self.schema)?;
        written += write_i64_field(prot, 3, self.num_rows)?;
        written += write_list_field(prot, 4, &self.row_groups)?;
        if let Some(kv) = &self.key_value_metadata {
            written += write_list_field(prot, 5, kv)?;
        }
        if let Some(created_by) = &self.created_by {
            written += write_binary_field(prot, 6, created_by.as_bytes())?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeader {
    /// Number of values including nulls.
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for DataPageHeader {
    const KIND: RecordKind = RecordKind::DataPageHeader;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut definition_level_encoding = None;
        let mut repetition_level_encoding = None;
        let mut statistics = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => num_values = Some(prot.read_i32()?),
                (2, TType::I32) => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                (3, TType::I32) => {
                    definition_level_encoding = Some(Encoding::try_from(prot.read_i32()?)?)
                }
                (4, TType::I32) => {
                    repetition_level_encoding = Some(Encoding::try_from(prot.read_i32()?)?)
                }
                (5, TType::Struct) => statistics = Some(Statistics::read_from_in_protocol(prot)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            num_values: required(num_values, "num_values", Self::KIND)?,
            encoding: required(encoding, "encoding", Self::KIND)?,
            definition_level_encoding: required(
                definition_level_encoding,
                "definition_level_encoding",
                Self::KIND,
            )?,
            repetition_level_encoding: required(
                repetition_level_encoding,
                "repetition_level_encoding",
                Self::KIND,
            )?,
            statistics,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.num_values)?;
        written += write_i32_field(prot, 2, self.encoding.code())?;
        written += write_i32_field(prot, 3, self.definition_level_encoding.code())?;
        written += write_i32_field(prot, 4, self.repetition_level_encoding.code())?;
        if let Some(statistics) = &self.statistics {
            written += write_struct_field(prot, 5, statistics)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

impl ThriftRecord for DictionaryPageHeader {
    const KIND: RecordKind = RecordKind::DictionaryPageHeader;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut is_sorted = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => num_values = Some(prot.read_i32()?),
                (2, TType::I32) => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                (3, TType::Bool) => is_sorted = Some(prot.read_bool()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            num_values: required(num_values, "num_values", Self::KIND)?,
            encoding: required(encoding, "encoding", Self::KIND)?,
            is_sorted,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.num_values)?;
        written += write_i32_field(prot, 2, self.encoding.code())?;
        if let Some(is_sorted) = self.is_sorted {
            written += write_bool_field(prot, 3, is_sorted)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

/// Parsed only so that V2 pages can be rejected with a precise error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for DataPageHeaderV2 {
    const KIND: RecordKind = RecordKind::DataPageHeaderV2;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut ints = [None; 6];
        let mut encoding = None;
        let mut is_compressed = None;
        let mut statistics = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1..=3, TType::I32) | (5..=6, TType::I32) => {
                    ints[id as usize - 1] = Some(prot.read_i32()?)
                }
                (4, TType::I32) => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                (7, TType::Bool) => is_compressed = Some(prot.read_bool()?),
                (8, TType::Struct) => statistics = Some(Statistics::read_from_in_protocol(prot)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            num_values: required(ints[0], "num_values", Self::KIND)?,
            num_nulls: required(ints[1], "num_nulls", Self::KIND)?,
            num_rows: required(ints[2], "num_rows", Self::KIND)?,
            encoding: required(encoding, "encoding", Self::KIND)?,
            definition_levels_byte_length: required(
                ints[4],
                "definition_levels_byte_length",
                Self::KIND,
            )?,
            repetition_levels_byte_length: required(
                ints[5],
                "repetition_levels_byte_length",
                Self::KIND,
            )?,
            is_compressed,
            statistics,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.num_values)?;
        written += write_i32_field(prot, 2, self.num_nulls)?;
        written += write_i32_field(prot, 3, self.num_rows)?;
        written += write_i32_field(prot, 4, self.encoding.code())?;
        written += write_i32_field(prot, 5, self.definition_levels_byte_length)?;
        written += write_i32_field(prot, 6, self.repetition_levels_byte_length)?;
        if let Some(is_compressed) = self.is_compressed {
            written += write_bool_field(prot, 7, is_compressed)?;
        }
        if let Some(statistics) = &self.statistics {
            written += write_struct_field(prot, 8, statistics)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl ThriftRecord for PageHeader {
    const KIND: RecordKind = RecordKind::PageHeader;

    fn read_from_in_protocol(prot: &mut TCompactInputProtocol<'_>) -> ParquetResult<Self> {
        let mut page_type = None;
        let mut uncompressed_page_size = None;
        let mut compressed_page_size = None;
        let mut crc = None;
        let mut data_page_header = None;
        let mut dictionary_page_header = None;
        let mut data_page_header_v2 = None;
        read_struct(prot, |prot, id, field_type| {
            match (id, field_type) {
                (1, TType::I32) => page_type = Some(PageType::try_from(prot.read_i32()?)?),
                (2, TType::I32) => uncompressed_page_size = Some(prot.read_i32()?),
                (3, TType::I32) => compressed_page_size = Some(prot.read_i32()?),
                (4, TType::I32) => crc = Some(prot.read_i32()?),
                (5, TType::Struct) => {
                    data_page_header = Some(DataPageHeader::read_from_in_protocol(prot)?)
                }
                (7, TType::Struct) => {
                    dictionary_page_header =
                        Some(DictionaryPageHeader::read_from_in_protocol(prot)?)
                }
                (8, TType::Struct) => {
                    data_page_header_v2 = Some(DataPageHeaderV2::read_from_in_protocol(prot)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            page_type: required(page_type, "type", Self::KIND)?,
            uncompressed_page_size: required(
                uncompressed_page_size,
                "uncompressed_page_size",
                Self::KIND,
            )?,
            compressed_page_size: required(
                compressed_page_size,
                "compressed_page_size",
                Self::KIND,
            )?,
            crc,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        })
    }

    fn write_to_out_protocol<W: Write>(
        &self,
        prot: &mut TCompactOutputProtocol<W>,
    ) -> ParquetResult<usize> {
        let mut written = prot.write_struct_begin()?;
        written += write_i32_field(prot, 1, self.page_type.code())?;
        written += write_i32_field(prot, 2, self.uncompressed_page_size)?;
        written += write_i32_field(prot, 3, self.compressed_page_size)?;
        if let Some(crc) = self.crc {
            written += write_i32_field(prot, 4, crc)?;
        }
        if let Some(header) = &self.data_page_header {
            written += write_struct_field(prot, 5, header)?;
        }
        if let Some(header) = &self.dictionary_page_header {
            written += write_struct_field(prot, 7, header)?;
        }
        if let Some(header) = &self.data_page_header_v2 {
            written += write_struct_field(prot, 8, header)?;
        }
        Ok(written + finish_struct(prot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{read_record, write_record};
    use crate::parquet::config::DecodeOptions;
    use crate::parquet::error::ParquetErrorCause;

    fn column_meta() -> ColumnMetaData {
        ColumnMetaData {
            physical_type: PhysicalType::Int64,
            encodings: vec![Encoding::Plain, Encoding::Rle],
            path_in_schema: vec!["ts".to_string()],
            codec: Compression::Uncompressed,
            num_values: 20,
            total_uncompressed_size: 190,
            total_compressed_size: 190,
            key_value_metadata: None,
            data_page_offset: 4,
            index_page_offset: None,
            dictionary_page_offset: None,
            statistics: Some(Statistics { null_count: Some(0), ..Default::default() }),
        }
    }

    #[test]
    fn test_file_metadata_roundtrip() {
        let meta = FileMetaData {
            version: 1,
            schema: vec![
                SchemaElement::root("schema", 1),
                SchemaElement::optional("ts", PhysicalType::Int64),
            ],
            num_rows: 20,
            row_groups: vec![RowGroup {
                columns: vec![ColumnChunk {
                    file_path: None,
                    file_offset: 0,
                    meta_data: Some(column_meta()),
                }],
                total_byte_size: 190,
                num_rows: 20,
                file_offset: None,
                total_compressed_size: Some(190),
                ordinal: Some(0),
            }],
            key_value_metadata: Some(vec![KeyValue {
                key: "writer".to_string(),
                value: Some("test".to_string()),
            }]),
            created_by: Some("parquet-flat".to_string()),
        };
        let mut buf = Vec::new();
        let written = write_record(&meta, &mut buf).unwrap();
        assert_eq!(written, buf.len());

        let (decoded, consumed) = read_record::<FileMetaData>(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_page_header_with_bool_field() {
        let header = PageHeader {
            page_type: PageType::DictionaryPage,
            uncompressed_page_size: 12,
            compressed_page_size: 12,
            crc: None,
            data_page_header: None,
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: 3,
                encoding: Encoding::Plain,
                is_sorted: Some(false),
            }),
            data_page_header_v2: None,
        };
        let mut buf = Vec::new();
        write_record(&header, &mut buf).unwrap();
        let (decoded, _) = read_record::<PageHeader>(&buf, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // KeyValue { 1: "k", 2: "v", 9: list<i32> [1, 2] }
        let data = [
            0x18u8, 0x01, b'k', 0x18, 0x01, b'v', 0x79, 0x25, 0x02, 0x04, 0x00,
        ];
        let (kv, consumed) = read_record::<KeyValue>(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(kv.key, "k");
        assert_eq!(kv.value.as_deref(), Some("v"));
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_missing_required_field() {
        // KeyValue with only the value.
        let data = [0x28u8, 0x01, b'v', 0x00];
        let err = read_record::<KeyValue>(&data, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.cause(), ParquetErrorCause::Invalid));
        assert_eq!(
            err.to_string(),
            "could not decode KeyValue: required field KeyValue.key is missing"
        );
    }
}
