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

mod common;

use common::{finish_file, read_all, read_column, single_chunk_metadata, MAGIC};
use parquet_flat::metadata::{
    write_record, DataPageHeader, DictionaryPageHeader, Encoding, PageHeader, PageType,
    PhysicalType,
};
use parquet_flat::parquet_write::{encode_def_levels_v1, HybridRleEncoder};
use parquet_flat::{
    ColumnSpec, ColumnValues, DecodeOptions, DictionarySupport, FileReader, OwnedValue,
    ParquetErrorCause, ParquetWriter, RecordAllocator,
};

fn strings(values: &[Option<&str>]) -> Vec<Option<Vec<u8>>> {
    values.iter().map(|v| v.map(|s| s.as_bytes().to_vec())).collect()
}

fn owned_strings(values: &[Option<&str>]) -> Vec<Option<OwnedValue>> {
    values.iter().map(|v| v.map(|s| OwnedValue::ByteArray(s.as_bytes().to_vec()))).collect()
}

fn page_header(page_type: PageType, size: usize) -> PageHeader {
    PageHeader {
        page_type,
        uncompressed_page_size: size as i32,
        compressed_page_size: size as i32,
        crc: None,
        data_page_header: None,
        dictionary_page_header: None,
        data_page_header_v2: None,
    }
}

/// A dictionary page of int32 `entries` followed by a data page of `indices`,
/// all slots defined.
fn int_dictionary_file(entries: &[i32], indices: &[u32], bit_width: u8) -> Vec<u8> {
    let mut bytes = MAGIC.to_vec();
    let dictionary_offset = bytes.len();
    let body: Vec<u8> = entries.iter().flat_map(|v| v.to_le_bytes()).collect();
    let header = PageHeader {
        dictionary_page_header: Some(DictionaryPageHeader {
            num_values: entries.len() as i32,
            encoding: Encoding::PlainDictionary,
            is_sorted: None,
        }),
        ..page_header(PageType::DictionaryPage, body.len())
    };
    write_record(&header, &mut bytes).unwrap();
    bytes.extend_from_slice(&body);

    let data_offset = bytes.len();
    let mut body = Vec::new();
    encode_def_levels_v1(&mut body, indices.iter().map(|_| true)).unwrap();
    body.push(bit_width);
    let mut encoder = HybridRleEncoder::try_new(bit_width).unwrap();
    encoder.encode(indices).unwrap();
    body.extend_from_slice(&encoder.into_inner());
    let header = PageHeader {
        data_page_header: Some(DataPageHeader {
            num_values: indices.len() as i32,
            encoding: Encoding::RleDictionary,
            definition_level_encoding: Encoding::Rle,
            repetition_level_encoding: Encoding::Rle,
            statistics: None,
        }),
        ..page_header(PageType::DataPage, body.len())
    };
    write_record(&header, &mut bytes).unwrap();
    bytes.extend_from_slice(&body);

    let end = bytes.len();
    let metadata = single_chunk_metadata(
        PhysicalType::Int32,
        indices.len() as i64,
        dictionary_offset,
        end,
        Some(dictionary_offset),
        data_offset,
    );
    finish_file(bytes, &metadata)
}

#[test]
fn test_indices_resolve_to_entries() {
    let bytes = int_dictionary_file(&[10, 20, 30], &[2, 0, 1], 2);
    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(&bytes, DecodeOptions::default(), &allocator).unwrap();
    file.next_row_group();
    let reader = file.prepare_column_reader(0).unwrap();
    let dictionary: Vec<i32> = reader.dictionary().iter().map(|v| v.as_i32()).collect();
    assert_eq!(dictionary, vec![10, 20, 30]);

    let (values, batches) = read_all(reader);
    assert_eq!(batches, vec![3, 0]);
    assert_eq!(
        values,
        vec![
            Some(OwnedValue::Int32(30)),
            Some(OwnedValue::Int32(10)),
            Some(OwnedValue::Int32(20)),
        ]
    );
}

#[test]
fn test_written_dictionary_columns() {
    let expected = [Some("C"), Some("A"), None, Some("B"), Some("C"), None, Some("A")];
    let bytes = ParquetWriter::new(vec![ColumnSpec::new("s", PhysicalType::ByteArray)])
        .with_dictionary(true)
        .with_page_row_count(4)
        .with_row_group(vec![ColumnValues::ByteArray(strings(&expected))])
        .finish()
        .unwrap();
    let meta = common::footer(&bytes).row_groups[0].columns[0].meta_data.clone().unwrap();
    assert!(meta.dictionary_page_offset.is_some());
    assert!(meta.encodings.contains(&Encoding::RleDictionary));

    assert_eq!(read_column(&bytes, 0), owned_strings(&expected));
}

#[test]
fn test_dictionary_values_alias_the_dictionary_page() {
    let values: Vec<Option<i64>> = (0..50).map(|i| Some(i % 3)).collect();
    let bytes = ParquetWriter::new(vec![ColumnSpec::new("v", PhysicalType::Int64)])
        .with_dictionary(true)
        .with_row_group(vec![ColumnValues::Int64(values.clone())])
        .finish()
        .unwrap();

    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(&bytes, DecodeOptions::default(), &allocator).unwrap();
    file.next_row_group();
    let reader = file.prepare_column_reader(0).unwrap();
    assert_eq!(reader.dictionary().len(), 3);
    let (actual, batches) = read_all(reader);
    assert_eq!(batches, vec![16, 16, 16, 2, 0]);
    assert_eq!(actual, values.iter().map(|v| v.map(OwnedValue::Int64)).collect::<Vec<_>>());
}

#[test]
fn test_single_entry_dictionary() {
    // One entry needs zero bits per index.
    let bytes = int_dictionary_file(&[7], &[0; 20], 0);
    let values = read_column(&bytes, 0);
    assert_eq!(values, vec![Some(OwnedValue::Int32(7)); 20]);
}

#[test]
fn test_index_out_of_range() {
    let bytes = int_dictionary_file(&[10, 20], &[0, 1, 3], 2);
    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(&bytes, DecodeOptions::default(), &allocator).unwrap();
    file.next_row_group();
    let reader = file.prepare_column_reader(0).unwrap();
    let mut vector = parquet_flat::Vector::new();
    let err = reader.read(&mut vector).unwrap_err();
    assert!(matches!(err.cause(), ParquetErrorCause::Invalid));
    assert!(err.to_string().contains("dictionary index 3 out of range"), "{err}");
}

#[test]
fn test_disabled_dictionary_support() {
    let bytes = int_dictionary_file(&[10, 20, 30], &[2, 0, 1], 2);
    let options = DecodeOptions::new().with_dictionary_support(DictionarySupport::Disabled);
    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(&bytes, options, &allocator).unwrap();
    file.next_row_group();
    let err = file.prepare_column_reader(0).err().unwrap();
    assert!(matches!(err.cause(), ParquetErrorCause::Unsupported));

    // Plain chunks are unaffected.
    let plain = ParquetWriter::new(vec![ColumnSpec::new("v", PhysicalType::Int32)])
        .with_row_group(vec![ColumnValues::Int32(vec![Some(1), None])])
        .finish()
        .unwrap();
    assert_eq!(
        common::read_column_with(&plain, 0, options),
        vec![Some(OwnedValue::Int32(1)), None]
    );
}

#[test]
fn test_dictionary_page_size_mismatch() {
    let mut bytes = int_dictionary_file(&[10, 20, 30], &[2, 0, 1], 2);
    // Claim 2 entries for a 12-byte page body.
    let metadata = common::footer(&bytes);
    let start = metadata.row_groups[0].columns[0]
        .meta_data
        .as_ref()
        .unwrap()
        .dictionary_page_offset
        .unwrap() as usize;
    let mut header = Vec::new();
    write_record(
        &PageHeader {
            dictionary_page_header: Some(DictionaryPageHeader {
                num_values: 2,
                encoding: Encoding::PlainDictionary,
                is_sorted: None,
            }),
            ..page_header(PageType::DictionaryPage, 12)
        },
        &mut header,
    )
    .unwrap();
    // Same encoded length, only the value count differs.
    bytes[start..start + header.len()].copy_from_slice(&header);

    let allocator = RecordAllocator::default();
    let mut file = FileReader::prepare(&bytes, DecodeOptions::default(), &allocator).unwrap();
    file.next_row_group();
    let err = file.prepare_column_reader(0).err().unwrap();
    assert!(matches!(err.cause(), ParquetErrorCause::Invalid));
}
