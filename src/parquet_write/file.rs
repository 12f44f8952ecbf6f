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

use std::collections::HashMap;
use std::ops::Range;

use crate::metadata::{
    write_record, ColumnChunk, ColumnMetaData, Compression, DataPageHeader, DictionaryPageHeader,
    Encoding, FileMetaData, PageHeader, PageType, PhysicalType, RowGroup, SchemaElement,
    Statistics,
};
use crate::parquet::config::PARQUET_MAGIC;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet_write::plain::PlainEncoder;
use crate::parquet_write::rle::{bit_width_for, encode_def_levels_v1, HybridRleEncoder};
use crate::parquet_write::{ColumnSpec, ColumnValues};
use log::debug;

pub const DEFAULT_PAGE_ROW_COUNT: usize = 1024;

/// Assembles a complete file in memory: magic, column chunks, footer.
pub struct ParquetWriter {
    columns: Vec<ColumnSpec>,
    /// Trailing byte-array column stored as runs in one dictionary-framed page.
    delta_column: Option<String>,
    row_groups: Vec<Vec<ColumnValues>>,
    /// Rows per data page.
    page_row_count: usize,
    /// Dictionary-encode every non-boolean column.
    dictionary: bool,
    /// Write null counts into page and column chunk statistics.
    statistics: bool,
    created_by: Option<String>,
}

impl ParquetWriter {
    /// Create a new writer for the given optional leaf columns
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        ParquetWriter {
            columns,
            delta_column: None,
            row_groups: Vec::new(),
            page_row_count: DEFAULT_PAGE_ROW_COUNT,
            dictionary: false,
            statistics: true,
            created_by: Some(format!("parquet-flat version {}", env!("CARGO_PKG_VERSION"))),
        }
    }

    /// Set the number of rows per data page. Defaults to `DEFAULT_PAGE_ROW_COUNT`.
    pub fn with_page_row_count(mut self, rows: usize) -> Self {
        self.page_row_count = rows;
        self
    }

    /// Dictionary-encode columns. Boolean columns are always written plain.
    pub fn with_dictionary(mut self, dictionary: bool) -> Self {
        self.dictionary = dictionary;
        self
    }

    /// Write null count statistics
    pub fn with_statistics(mut self, statistics: bool) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_created_by(mut self, created_by: Option<String>) -> Self {
        self.created_by = created_by;
        self
    }

    /// Append a trailing delta column. Each row group then carries one extra
    /// `ColumnValues::ByteArray` whose `None` entries end a run.
    pub fn with_delta_column(mut self, name: impl Into<String>) -> Self {
        self.delta_column = Some(name.into());
        self
    }

    /// Add a row group: one entry per column, the delta column last.
    pub fn with_row_group(mut self, columns: Vec<ColumnValues>) -> Self {
        self.row_groups.push(columns);
        self
    }

    pub fn finish(self) -> ParquetResult<Vec<u8>> {
        if self.page_row_count == 0 {
            return Err(fmt_err!(Invalid, "page row count must be positive"));
        }
        let mut specs = self.columns.clone();
        if let Some(name) = &self.delta_column {
            specs.push(ColumnSpec::new(name.clone(), PhysicalType::ByteArray));
        }

        let mut out = PARQUET_MAGIC.to_vec();
        let mut row_groups = Vec::with_capacity(self.row_groups.len());
        let mut num_rows = 0i64;
        for (ordinal, columns) in self.row_groups.iter().enumerate() {
            let row_group = self
                .write_row_group(&mut out, &specs, columns, ordinal)
                .with_context(|_| format!("could not write row group {}", ordinal))?;
            num_rows += row_group.num_rows;
            row_groups.push(row_group);
        }

        let mut schema = Vec::with_capacity(specs.len() + 1);
        schema.push(SchemaElement::root("schema", specs.len() as i32));
        for spec in &specs {
            let mut leaf = SchemaElement::optional(spec.name.clone(), spec.physical_type);
            leaf.type_length = spec.type_length;
            schema.push(leaf);
        }
        let metadata = FileMetaData {
            version: 1,
            schema,
            num_rows,
            row_groups,
            key_value_metadata: None,
            created_by: self.created_by,
        };
        let footer_len = write_record(&metadata, &mut out)?;
        out.extend_from_slice(&(footer_len as u32).to_le_bytes());
        out.extend_from_slice(&PARQUET_MAGIC);
        debug!(
            "wrote file of {} bytes: {} rows, {} row groups, footer of {} bytes",
            out.len(),
            num_rows,
            metadata.row_groups.len(),
            footer_len
        );
        Ok(out)
    }

    fn write_row_group(
        &self,
        out: &mut Vec<u8>,
        specs: &[ColumnSpec],
        columns: &[ColumnValues],
        ordinal: usize,
    ) -> ParquetResult<RowGroup> {
        if columns.len() != specs.len() {
            return Err(fmt_err!(
                Invalid,
                "{} columns given, schema has {}",
                columns.len(),
                specs.len()
            ));
        }
        let regular = specs.len() - usize::from(self.delta_column.is_some());
        let num_rows = columns[..regular].first().map_or(0, ColumnValues::len);
        let start = out.len();
        let mut chunks = Vec::with_capacity(columns.len());
        for (index, (spec, values)) in specs.iter().zip(columns).enumerate() {
            if values.physical_type() != spec.physical_type {
                return Err(fmt_err!(
                    Invalid,
                    "column {} is {:?} but {:?} values were given",
                    spec.name,
                    spec.physical_type,
                    values.physical_type()
                ));
            }
            let chunk = if index < regular {
                if values.len() != num_rows {
                    return Err(fmt_err!(
                        Invalid,
                        "column {} has {} rows, expected {}",
                        spec.name,
                        values.len(),
                        num_rows
                    ));
                }
                self.write_column_chunk(out, spec, values)?
            } else {
                let ColumnValues::ByteArray(values) = values else {
                    unreachable!("delta column type checked above");
                };
                write_delta_chunk(out, spec, values)?
            };
            chunks.push(chunk);
        }
        let size = (out.len() - start) as i64;
        Ok(RowGroup {
            columns: chunks,
            total_byte_size: size,
            num_rows: num_rows as i64,
            file_offset: Some(start as i64),
            total_compressed_size: Some(size),
            ordinal: Some(ordinal as i16),
        })
    }

    fn write_column_chunk(
        &self,
        out: &mut Vec<u8>,
        spec: &ColumnSpec,
        values: &ColumnValues,
    ) -> ParquetResult<ColumnChunk> {
        let staged = stage_column(spec, values)?;
        let chunk_start = out.len();
        let dictionary = (self.dictionary && spec.physical_type != PhysicalType::Boolean)
            .then(|| Dictionary::build(&staged));

        let mut dictionary_page_offset = None;
        let mut encodings = vec![Encoding::Rle];
        if let Some(dictionary) = &dictionary {
            dictionary_page_offset = Some(out.len() as i64);
            let mut encoder = PlainEncoder::new(Vec::new());
            for range in &dictionary.entries {
                encoder.encode_span(&staged.bytes, range.clone())?;
            }
            let body = encoder.finish()?;
            let header = PageHeader {
                dictionary_page_header: Some(DictionaryPageHeader {
                    num_values: dictionary.entries.len() as i32,
                    encoding: Encoding::PlainDictionary,
                    is_sorted: None,
                }),
                ..page_header(PageType::DictionaryPage, body.len())?
            };
            write_page(out, &header, &body)?;
            encodings.extend([Encoding::PlainDictionary, Encoding::RleDictionary]);
        } else {
            encodings.push(Encoding::Plain);
        }

        let data_page_offset = out.len() as i64;
        let mut first_row = 0;
        for rows in staged.slots.chunks(self.page_row_count) {
            let (body, encoding) = match &dictionary {
                Some(dictionary) => (
                    encode_dictionary_page(
                        rows,
                        &dictionary.indices[first_row..first_row + rows.len()],
                        dictionary.bit_width(),
                    )?,
                    Encoding::RleDictionary,
                ),
                None => (encode_plain_page(rows, &staged.bytes, spec.physical_type)?, Encoding::Plain),
            };
            let null_count = rows.iter().filter(|slot| slot.is_none()).count();
            let header = PageHeader {
                data_page_header: Some(DataPageHeader {
                    num_values: rows.len() as i32,
                    encoding,
                    definition_level_encoding: Encoding::Rle,
                    repetition_level_encoding: Encoding::Rle,
                    statistics: self.null_statistics(null_count),
                }),
                ..page_header(PageType::DataPage, body.len())?
            };
            write_page(out, &header, &body)?;
            first_row += rows.len();
        }

        let null_count = staged.slots.iter().filter(|slot| slot.is_none()).count();
        let size = (out.len() - chunk_start) as i64;
        Ok(ColumnChunk {
            file_path: None,
            file_offset: 0,
            meta_data: Some(ColumnMetaData {
                physical_type: spec.physical_type,
                encodings,
                path_in_schema: vec![spec.name.clone()],
                codec: Compression::Uncompressed,
                num_values: staged.slots.len() as i64,
                total_uncompressed_size: size,
                total_compressed_size: size,
                key_value_metadata: None,
                data_page_offset,
                index_page_offset: None,
                dictionary_page_offset,
                statistics: self.null_statistics(null_count),
            }),
        })
    }

    fn null_statistics(&self, null_count: usize) -> Option<Statistics> {
        self.statistics
            .then(|| Statistics { null_count: Some(null_count as i64), ..Default::default() })
    }
}

// Non-null values in plain layout, with each slot's byte range.
struct Staged {
    bytes: Vec<u8>,
    slots: Vec<Option<Range<usize>>>,
}

fn stage_column(spec: &ColumnSpec, values: &ColumnValues) -> ParquetResult<Staged> {
    let mut encoder = PlainEncoder::new(Vec::new());
    let mut slots = Vec::with_capacity(values.len());
    match values {
        // One byte per value; pages re-pack them into bits.
        ColumnValues::Boolean(v) => {
            stage(&mut encoder, &mut slots, v, |e, x| e.encode_scalar(u8::from(*x)))?
        }
        ColumnValues::Int32(v) => stage(&mut encoder, &mut slots, v, |e, x| e.encode_scalar(*x))?,
        ColumnValues::Int64(v) => stage(&mut encoder, &mut slots, v, |e, x| e.encode_scalar(*x))?,
        ColumnValues::Float(v) => stage(&mut encoder, &mut slots, v, |e, x| e.encode_scalar(*x))?,
        ColumnValues::Double(v) => stage(&mut encoder, &mut slots, v, |e, x| e.encode_scalar(*x))?,
        ColumnValues::ByteArray(v) => {
            stage(&mut encoder, &mut slots, v, |e, x| e.encode_byte_array(x))?
        }
        ColumnValues::FixedLenByteArray(v) => {
            let type_length = spec.type_length.ok_or_else(|| {
                fmt_err!(Invalid, "fixed-length byte array column {} has no length", spec.name)
            })?;
            stage(&mut encoder, &mut slots, v, |e, x| {
                if x.len() as i64 != type_length as i64 {
                    return Err(fmt_err!(
                        Invalid,
                        "value of {} bytes in column {} of length {}",
                        x.len(),
                        spec.name,
                        type_length
                    ));
                }
                e.encode_fixed(x)
            })?
        }
    }
    Ok(Staged { bytes: encoder.finish()?, slots })
}

fn stage<T>(
    encoder: &mut PlainEncoder<'_, Vec<u8>>,
    slots: &mut Vec<Option<Range<usize>>>,
    values: &[Option<T>],
    mut encode: impl FnMut(&mut PlainEncoder<'_, Vec<u8>>, &T) -> ParquetResult<()>,
) -> ParquetResult<()> {
    for value in values {
        let slot = match value {
            Some(value) => {
                let start = encoder.encoded_len();
                encode(encoder, value)?;
                Some(start..encoder.encoded_len())
            }
            None => None,
        };
        slots.push(slot);
    }
    Ok(())
}

struct Dictionary {
    /// Distinct staged values in first-seen order.
    entries: Vec<Range<usize>>,
    /// Dictionary index of each slot.
    indices: Vec<Option<u32>>,
}

impl Dictionary {
    fn build(staged: &Staged) -> Self {
        let mut lookup: HashMap<&[u8], u32> = HashMap::new();
        let mut entries = Vec::new();
        let indices = staged
            .slots
            .iter()
            .map(|slot| {
                slot.as_ref().map(|range| {
                    *lookup.entry(&staged.bytes[range.clone()]).or_insert_with(|| {
                        entries.push(range.clone());
                        (entries.len() - 1) as u32
                    })
                })
            })
            .collect();
        Self { entries, indices }
    }

    fn bit_width(&self) -> u8 {
        bit_width_for(self.entries.len().saturating_sub(1) as u32)
    }
}

fn encode_plain_page(
    rows: &[Option<Range<usize>>],
    staged: &[u8],
    physical_type: PhysicalType,
) -> ParquetResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_def_levels_v1(&mut buffer, rows.iter().map(Option::is_some))?;
    let mut encoder = PlainEncoder::new(&mut buffer);
    for range in rows.iter().flatten() {
        if physical_type == PhysicalType::Boolean {
            encoder.encode_bool(staged[range.start] != 0)?;
        } else {
            encoder.encode_span(staged, range.clone())?;
        }
    }
    encoder.finish()?;
    Ok(buffer)
}

fn encode_dictionary_page(
    rows: &[Option<Range<usize>>],
    indices: &[Option<u32>],
    bit_width: u8,
) -> ParquetResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_def_levels_v1(&mut buffer, rows.iter().map(Option::is_some))?;
    buffer.push(bit_width);
    let indices: Vec<u32> = indices.iter().flatten().copied().collect();
    let mut encoder = HybridRleEncoder::try_new(bit_width)?;
    encoder.encode(&indices)?;
    buffer.extend_from_slice(&encoder.into_inner());
    Ok(buffer)
}

/// The delta column: plain byte arrays in one dictionary-framed page, each run
/// closed by a zero-length value. `None` closes the current run, and the last
/// run is closed automatically.
fn write_delta_chunk(
    out: &mut Vec<u8>,
    spec: &ColumnSpec,
    values: &[Option<Vec<u8>>],
) -> ParquetResult<ColumnChunk> {
    let mut encoder = PlainEncoder::new(Vec::new());
    let mut num_values = 0usize;
    for value in values {
        match value {
            Some(value) if value.is_empty() => {
                return Err(fmt_err!(
                    Invalid,
                    "delta column {} cannot hold empty values",
                    spec.name
                ));
            }
            Some(value) => {
                encoder.encode_byte_array(value)?;
                num_values += 1;
            }
            None => encoder.encode_byte_array(&[])?,
        }
    }
    if values.last().is_some_and(Option::is_some) {
        encoder.encode_byte_array(&[])?;
    }
    let body = encoder.finish()?;

    let chunk_start = out.len();
    let header = PageHeader {
        dictionary_page_header: Some(DictionaryPageHeader {
            num_values: num_values as i32,
            encoding: Encoding::Plain,
            is_sorted: None,
        }),
        ..page_header(PageType::DictionaryPage, body.len())?
    };
    write_page(out, &header, &body)?;
    let size = (out.len() - chunk_start) as i64;
    Ok(ColumnChunk {
        file_path: None,
        file_offset: 0,
        meta_data: Some(ColumnMetaData {
            physical_type: PhysicalType::ByteArray,
            encodings: vec![Encoding::Plain],
            path_in_schema: vec![spec.name.clone()],
            codec: Compression::Uncompressed,
            num_values: num_values as i64,
            total_uncompressed_size: size,
            total_compressed_size: size,
            key_value_metadata: None,
            data_page_offset: chunk_start as i64,
            index_page_offset: None,
            dictionary_page_offset: Some(chunk_start as i64),
            statistics: None,
        }),
    })
}

fn page_header(page_type: PageType, size: usize) -> ParquetResult<PageHeader> {
    let size = i32::try_from(size)
        .map_err(|_| fmt_err!(Invalid, "page of {} bytes is too large", size))?;
    Ok(PageHeader {
        page_type,
        uncompressed_page_size: size,
        compressed_page_size: size,
        crc: None,
        data_page_header: None,
        dictionary_page_header: None,
        data_page_header_v2: None,
    })
}

fn write_page(out: &mut Vec<u8>, header: &PageHeader, body: &[u8]) -> ParquetResult<()> {
    write_record(header, out)?;
    out.extend_from_slice(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_record;
    use crate::parquet::config::DecodeOptions;

    fn footer(bytes: &[u8]) -> FileMetaData {
        let len = bytes.len();
        let mut footer_len = [0u8; 4];
        footer_len.copy_from_slice(&bytes[len - 8..len - 4]);
        let footer_len = u32::from_le_bytes(footer_len) as usize;
        let (metadata, _) =
            read_record::<FileMetaData>(&bytes[len - 8 - footer_len..len - 8], &DecodeOptions::default())
                .unwrap();
        metadata
    }

    #[test]
    fn test_file_layout() {
        let bytes = ParquetWriter::new(vec![ColumnSpec::new("a", PhysicalType::Int32)])
            .with_row_group(vec![ColumnValues::Int32(vec![Some(1), None, Some(3)])])
            .finish()
            .unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
        assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");

        let metadata = footer(&bytes);
        assert_eq!(metadata.num_rows, 3);
        assert_eq!(metadata.schema.len(), 2);
        assert_eq!(metadata.schema[0].num_children, Some(1));
        let meta = metadata.row_groups[0].columns[0].meta_data.as_ref().unwrap();
        assert_eq!(meta.num_values, 3);
        assert_eq!(meta.data_page_offset, 4);
        assert_eq!(meta.dictionary_page_offset, None);
        assert_eq!(meta.statistics.as_ref().unwrap().null_count, Some(1));
    }

    #[test]
    fn test_dictionary_is_first_seen_order() {
        let staged = stage_column(
            &ColumnSpec::new("s", PhysicalType::ByteArray),
            &ColumnValues::ByteArray(vec![
                Some(b"b".to_vec()),
                None,
                Some(b"a".to_vec()),
                Some(b"b".to_vec()),
            ]),
        )
        .unwrap();
        let dictionary = Dictionary::build(&staged);
        assert_eq!(dictionary.entries, vec![0..5, 5..10]);
        assert_eq!(dictionary.indices, vec![Some(0), None, Some(1), Some(0)]);
        assert_eq!(dictionary.bit_width(), 1);
    }

    #[test]
    fn test_plain_page_body() {
        let rows = vec![Some(0..1), None, Some(1..2), Some(2..3)];
        let body = encode_plain_page(&rows, &[1, 0, 1], PhysicalType::Boolean).unwrap();
        // 4-byte level length, one bit-packed group, then the packed booleans.
        assert_eq!(body, vec![2, 0, 0, 0, 3, 0b1101, 0b101]);
    }

    #[test]
    fn test_invalid_input() {
        let mismatched = ParquetWriter::new(vec![ColumnSpec::new("a", PhysicalType::Int32)])
            .with_row_group(vec![ColumnValues::Int64(vec![Some(1)])])
            .finish();
        assert!(mismatched.is_err());

        let wrong_length =
            ParquetWriter::new(vec![ColumnSpec::fixed_len_byte_array("f", 2)])
                .with_row_group(vec![ColumnValues::FixedLenByteArray(vec![Some(vec![1, 2, 3])])])
                .finish();
        assert!(wrong_length.is_err());

        let empty_delta = ParquetWriter::new(vec![])
            .with_delta_column("d")
            .with_row_group(vec![ColumnValues::ByteArray(vec![Some(vec![])])])
            .finish();
        assert!(empty_delta.is_err());
    }
}
