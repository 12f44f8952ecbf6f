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

#![allow(dead_code)]

use parquet_flat::metadata::{
    read_record, write_record, ColumnChunk, ColumnMetaData, Compression, Encoding, FileMetaData,
    PhysicalType, RowGroup, SchemaElement,
};
use parquet_flat::{
    ColumnReader, DecodeOptions, FileReader, OwnedValue, RecordAllocator, Vector,
};

pub const MAGIC: &[u8; 4] = b"PAR1";

#[derive(Debug, Clone, Copy)]
pub enum Null {
    None,
    Sparse,
    Dense,
}

pub const ALL_NULLS: [Null; 3] = [Null::None, Null::Dense, Null::Sparse];

pub fn generate_nulls(count: usize, null: Null) -> Vec<bool> {
    match null {
        Null::Dense => (0..count).map(|i| i % 2 == 0).collect(),
        Null::None => vec![false; count],
        Null::Sparse => (0..count).map(|i| i % 10 == 0).collect(),
    }
}

/// `values[i]` unless `nulls[i]` is set.
pub fn with_nulls<T: Clone>(values: &[T], nulls: &[bool]) -> Vec<Option<T>> {
    values
        .iter()
        .zip(nulls)
        .map(|(v, &is_null)| if is_null { None } else { Some(v.clone()) })
        .collect()
}

/// Reads a prepared column to the end. Returns every slot and the size of
/// each batch, including the final empty one.
pub fn read_all(reader: &mut ColumnReader<'_>) -> (Vec<Option<OwnedValue>>, Vec<usize>) {
    let mut vector = Vector::new();
    let mut values = Vec::new();
    let mut batches = Vec::new();
    loop {
        reader.read(&mut vector).unwrap();
        batches.push(vector.total_count());
        if vector.total_count() == 0 {
            assert!(reader.is_exhausted());
            break;
        }
        values.extend(vector.iter().map(|v| v.map(|v| v.to_owned_value())));
    }
    (values, batches)
}

/// Every slot of `column`, across all row groups.
pub fn read_column(bytes: &[u8], column: usize) -> Vec<Option<OwnedValue>> {
    read_column_with(bytes, column, DecodeOptions::default())
}

pub fn read_column_with(
    bytes: &[u8],
    column: usize,
    options: DecodeOptions,
) -> Vec<Option<OwnedValue>> {
    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(bytes, options, &allocator).unwrap();
    let mut values = Vec::new();
    while file.next_row_group() {
        let reader = file.prepare_column_reader(column).unwrap();
        values.extend(read_all(reader).0);
    }
    values
}

pub fn footer(bytes: &[u8]) -> FileMetaData {
    let (start, end) = footer_range(bytes);
    read_record::<FileMetaData>(&bytes[start..end], &DecodeOptions::default())
        .unwrap()
        .0
}

/// Re-encodes the footer after `edit`, keeping the column chunks in place.
pub fn rewrite_footer(bytes: &[u8], edit: impl FnOnce(&mut FileMetaData)) -> Vec<u8> {
    let mut metadata = footer(bytes);
    edit(&mut metadata);
    let (start, _) = footer_range(bytes);
    finish_file(bytes[..start].to_vec(), &metadata)
}

/// Appends the footer, its length and the trailing magic.
pub fn finish_file(mut bytes: Vec<u8>, metadata: &FileMetaData) -> Vec<u8> {
    let len = write_record(metadata, &mut bytes).unwrap();
    bytes.extend_from_slice(&(len as u32).to_le_bytes());
    bytes.extend_from_slice(MAGIC);
    bytes
}

fn footer_range(bytes: &[u8]) -> (usize, usize) {
    let end = bytes.len() - 8;
    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[end..end + 4]);
    (end - u32::from_le_bytes(len) as usize, end)
}

/// Metadata of a single-column, single-row-group file whose chunk spans
/// `start..end`.
pub fn single_chunk_metadata(
    physical_type: PhysicalType,
    num_values: i64,
    start: usize,
    end: usize,
    dictionary_page_offset: Option<usize>,
    data_page_offset: usize,
) -> FileMetaData {
    let size = (end - start) as i64;
    FileMetaData {
        version: 1,
        schema: vec![
            SchemaElement::root("schema", 1),
            SchemaElement::optional("col", physical_type),
        ],
        num_rows: num_values,
        row_groups: vec![RowGroup {
            columns: vec![ColumnChunk {
                file_path: None,
                file_offset: 0,
                meta_data: Some(ColumnMetaData {
                    physical_type,
                    encodings: vec![Encoding::Plain, Encoding::Rle],
                    path_in_schema: vec!["col".to_string()],
                    codec: Compression::Uncompressed,
                    num_values,
                    total_uncompressed_size: size,
                    total_compressed_size: size,
                    key_value_metadata: None,
                    data_page_offset: data_page_offset as i64,
                    index_page_offset: None,
                    dictionary_page_offset: dictionary_page_offset.map(|o| o as i64),
                    statistics: None,
                }),
            }],
            total_byte_size: size,
            num_rows: num_values,
            file_offset: Some(start as i64),
            total_compressed_size: Some(size),
            ordinal: Some(0),
        }],
        key_value_metadata: None,
        created_by: None,
    }
}
