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

use crate::metadata::{read_record, DataPageHeader, Encoding, PageHeader, PageType};
use crate::parquet::config::DecodeOptions;
use crate::parquet::error::{fmt_err, ParquetResult};
use crate::parquet::io::SliceCursor;

/// An uncompressed, encoded V1 data page.
#[derive(Debug)]
pub struct DataPage<'a> {
    pub header: DataPageHeader,
    pub buffer: &'a [u8],
}

impl DataPage<'_> {
    pub fn num_values(&self) -> usize {
        self.header.num_values as usize
    }

    pub fn encoding(&self) -> Encoding {
        self.header.encoding
    }
}

/// An uncompressed, encoded dictionary page.
#[derive(Debug)]
pub struct DictPage<'a> {
    pub buffer: &'a [u8],
    pub num_values: usize,
    pub encoding: Encoding,
}

/// Decodes the page header at the cursor and moves the cursor past it.
pub fn read_page_header(
    cursor: &mut SliceCursor<'_>,
    options: &DecodeOptions,
) -> ParquetResult<PageHeader> {
    let start = cursor.location();
    let (header, consumed) = read_record::<PageHeader>(&cursor.data()[start..], options)?;
    cursor.skip(consumed)?;
    Ok(header)
}

/// Size of the page body, checking that it is stored uncompressed.
fn page_size(header: &PageHeader) -> ParquetResult<usize> {
    if header.compressed_page_size < 0 || header.uncompressed_page_size < 0 {
        return Err(fmt_err!(
            Invalid,
            "negative page size (compressed {}, uncompressed {})",
            header.compressed_page_size,
            header.uncompressed_page_size
        ));
    }
    if header.compressed_page_size != header.uncompressed_page_size {
        return Err(fmt_err!(
            Unsupported,
            "compressed pages are not supported, page is {} bytes compressed and {} uncompressed",
            header.compressed_page_size,
            header.uncompressed_page_size
        ));
    }
    Ok(header.compressed_page_size as usize)
}

/// Reads a data page header and borrows its body.
///
/// The page must be a V1 data page with RLE definition levels and a `PLAIN`
/// or dictionary-index value encoding.
pub fn read_data_page<'a>(
    cursor: &mut SliceCursor<'a>,
    options: &DecodeOptions,
) -> ParquetResult<DataPage<'a>> {
    let header = read_page_header(cursor, options)?;
    let size = page_size(&header)?;
    let data_header = match header.page_type {
        PageType::DataPage => header
            .data_page_header
            .ok_or_else(|| fmt_err!(Invalid, "data page without a data page header"))?,
        PageType::DataPageV2 => {
            return Err(fmt_err!(Unsupported, "V2 data pages are not supported"));
        }
        other => {
            return Err(fmt_err!(Invalid, "expected a data page, found {:?}", other));
        }
    };
    if data_header.num_values < 0 {
        return Err(fmt_err!(Invalid, "negative page value count {}", data_header.num_values));
    }
    if data_header.definition_level_encoding != Encoding::Rle {
        return Err(fmt_err!(
            NotImplemented,
            "definition levels encoded as {:?}",
            data_header.definition_level_encoding
        ));
    }
    if data_header.encoding != Encoding::Plain && !data_header.encoding.is_dictionary() {
        return Err(fmt_err!(
            NotImplemented,
            "data page encoding {:?}",
            data_header.encoding
        ));
    }
    let buffer = cursor.view(size)?;
    Ok(DataPage { header: data_header, buffer })
}

/// Reads a dictionary page header and borrows its body.
pub fn read_dict_page<'a>(
    cursor: &mut SliceCursor<'a>,
    options: &DecodeOptions,
) -> ParquetResult<DictPage<'a>> {
    let header = read_page_header(cursor, options)?;
    let size = page_size(&header)?;
    if header.page_type != PageType::DictionaryPage {
        return Err(fmt_err!(Invalid, "expected a dictionary page, found {:?}", header.page_type));
    }
    let dict_header = header
        .dictionary_page_header
        .ok_or_else(|| fmt_err!(Invalid, "dictionary page without a dictionary page header"))?;
    if dict_header.num_values < 0 {
        return Err(fmt_err!(
            Invalid,
            "negative dictionary value count {}",
            dict_header.num_values
        ));
    }
    if !matches!(dict_header.encoding, Encoding::Plain | Encoding::PlainDictionary) {
        return Err(fmt_err!(
            NotImplemented,
            "dictionary page encoding {:?}",
            dict_header.encoding
        ));
    }
    let buffer = cursor.view(size)?;
    Ok(DictPage {
        buffer,
        num_values: dict_header.num_values as usize,
        encoding: dict_header.encoding,
    })
}

/// Splits a V1 page body of a flat optional column into
/// (encoded def levels, encoded values).
pub fn split_buffer_v1(buffer: &[u8]) -> ParquetResult<(&[u8], &[u8])> {
    let Some(prefix) = buffer.get(..4) else {
        return Err(fmt_err!(Layout, "page of {} bytes has no definition levels", buffer.len()));
    };
    let mut le = [0u8; 4];
    le.copy_from_slice(prefix);
    let level_buffer_length = u32::from_le_bytes(le) as usize;
    match buffer
        .get(4..)
        .filter(|rest| rest.len() >= level_buffer_length)
        .map(|rest| rest.split_at(level_buffer_length))
    {
        Some(split) => Ok(split),
        None => Err(fmt_err!(
            Layout,
            "{} bytes of definition levels declared in a page of {} bytes",
            level_buffer_length,
            buffer.len()
        )),
    }
}
