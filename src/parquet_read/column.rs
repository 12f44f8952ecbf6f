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

use crate::metadata::{
    ColumnChunk, ColumnMetaData, Compression, PhysicalType, Repetition, SchemaElement,
};
use crate::parquet::config::{DecodeOptions, DictionarySupport};
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet::io::SliceCursor;
use crate::parquet_read::decoders::{HybridRleDecoder, PlainDecoder};
use crate::parquet_read::page::{read_data_page, read_dict_page, split_buffer_v1};
use crate::parquet_read::{Value, Vector, VECTOR_CAPACITY};
use log::{debug, trace};

/// Lifecycle of a column reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Never prepared, or the last `prepare` failed.
    Uninitialized,
    /// Bound to a column chunk with values left to read.
    Ready,
    /// Every value of the bound column chunk has been read.
    Exhausted,
}

/// Facts about the bound column, copied out of the schema and chunk metadata.
#[derive(Debug, Clone)]
pub(crate) struct ColumnBinding {
    pub column_index: usize,
    pub name: String,
    pub physical_type: PhysicalType,
    pub type_length: Option<usize>,
    pub num_values: usize,
    pub chunk_start: usize,
    pub chunk_size: usize,
    pub dictionary_page_offset: Option<usize>,
}

/// Checks everything about a column chunk that can be rejected without
/// reading any of its pages.
pub(crate) fn bind_column(
    column_index: usize,
    schema: &SchemaElement,
    chunk: &ColumnChunk,
    buffer_len: usize,
) -> ParquetResult<ColumnBinding> {
    if let Some(path) = &chunk.file_path {
        return Err(fmt_err!(
            Unsupported,
            "column chunk references external file {}",
            path
        ));
    }
    if chunk.file_offset != 0 {
        return Err(fmt_err!(
            Unsupported,
            "deprecated column chunk file offset is set to {}",
            chunk.file_offset
        ));
    }
    let meta: &ColumnMetaData = chunk
        .meta_data
        .as_ref()
        .ok_or_else(|| fmt_err!(Invalid, "column chunk has no metadata"))?;
    if meta.codec != Compression::Uncompressed {
        return Err(fmt_err!(Unsupported, "compression codec {:?} is not supported", meta.codec));
    }
    if meta.total_compressed_size != meta.total_uncompressed_size {
        return Err(fmt_err!(
            Unsupported,
            "column chunk is compressed: {} bytes compressed, {} uncompressed",
            meta.total_compressed_size,
            meta.total_uncompressed_size
        ));
    }
    if schema.repetition != Some(Repetition::Optional) {
        return Err(fmt_err!(
            Unsupported,
            "only optional columns are supported, {} is {:?}",
            schema.name,
            schema.repetition
        ));
    }
    let physical_type = schema
        .physical_type
        .ok_or_else(|| fmt_err!(Invalid, "column {} has no physical type", schema.name))?;
    if physical_type != meta.physical_type {
        return Err(fmt_err!(
            Invalid,
            "column {} is {:?} in the schema but {:?} in the column chunk",
            schema.name,
            physical_type,
            meta.physical_type
        ));
    }
    if physical_type == PhysicalType::Int96 {
        return Err(fmt_err!(Unsupported, "INT96 column {} is not supported", schema.name));
    }
    let type_length = match physical_type {
        PhysicalType::FixedLenByteArray => match schema.type_length {
            Some(len) if len >= 0 => Some(len as usize),
            other => {
                return Err(fmt_err!(
                    Invalid,
                    "fixed-length byte array column {} has type length {:?}",
                    schema.name,
                    other
                ));
            }
        },
        _ => None,
    };

    let non_negative = |value: i64, what: &str| -> ParquetResult<usize> {
        usize::try_from(value).map_err(|_| fmt_err!(Invalid, "negative {} {}", what, value))
    };
    let num_values = non_negative(meta.num_values, "value count")?;
    let chunk_size = non_negative(meta.total_compressed_size, "column chunk size")?;
    let dictionary_page_offset = meta
        .dictionary_page_offset
        .map(|offset| non_negative(offset, "dictionary page offset"))
        .transpose()?;
    let chunk_start = match dictionary_page_offset {
        Some(offset) => offset,
        None => non_negative(meta.data_page_offset, "data page offset")?,
    };
    if chunk_start.checked_add(chunk_size).map_or(true, |end| end > buffer_len) {
        return Err(fmt_err!(
            Layout,
            "column chunk at offset {} of {} bytes is past the end of the {} byte buffer",
            chunk_start,
            chunk_size,
            buffer_len
        ));
    }

    Ok(ColumnBinding {
        column_index,
        name: schema.name.clone(),
        physical_type,
        type_length,
        num_values,
        chunk_start,
        chunk_size,
        dictionary_page_offset,
    })
}

enum PageValues<'a> {
    Plain(PlainDecoder<'a>),
    Dictionary(HybridRleDecoder<'a>),
}

struct PageState<'a> {
    def_levels: HybridRleDecoder<'a>,
    values: PageValues<'a>,
}

/// Reads one flat optional column chunk in batches of up to [`VECTOR_CAPACITY`].
///
/// A reader is created once and re-bound to a different column chunk by each
/// call to [`ColumnReader::prepare`].
pub struct ColumnReader<'a> {
    buffer: &'a [u8],
    options: DecodeOptions,
    state: ReaderState,
    binding: Option<ColumnBinding>,
    // Cursor over the bound column chunk.
    chunk: SliceCursor<'a>,
    column_left_values: usize,
    column_left_bytes: usize,
    page_left_values: usize,
    page_left_bytes: usize,
    page: Option<PageState<'a>>,
    dictionary: Vec<Value<'a>>,
}

impl<'a> ColumnReader<'a> {
    pub fn new(buffer: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            buffer,
            options,
            state: ReaderState::Uninitialized,
            binding: None,
            chunk: SliceCursor::new(&[]),
            column_left_values: 0,
            column_left_bytes: 0,
            page_left_values: 0,
            page_left_bytes: 0,
            page: None,
            dictionary: Vec::new(),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ReaderState::Exhausted
    }

    /// Index of the bound column, if any.
    pub fn column_index(&self) -> Option<usize> {
        self.binding.as_ref().map(|b| b.column_index)
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.binding.as_ref().map(|b| b.physical_type)
    }

    /// Values of the bound column chunk not yet returned, nulls included.
    pub fn column_left_values(&self) -> usize {
        self.column_left_values
    }

    /// Bytes of the bound column chunk not yet consumed.
    pub fn column_left_bytes(&self) -> usize {
        self.column_left_bytes
    }

    pub fn page_left_values(&self) -> usize {
        self.page_left_values
    }

    pub fn page_left_bytes(&self) -> usize {
        self.page_left_bytes
    }

    /// Entries of the current dictionary, empty for plain-encoded chunks.
    pub fn dictionary(&self) -> &[Value<'a>] {
        &self.dictionary
    }

    /// Binds the reader to `chunk`, loading its dictionary and first data page.
    pub fn prepare(
        &mut self,
        column_index: usize,
        schema: &SchemaElement,
        chunk: &ColumnChunk,
    ) -> ParquetResult<()> {
        self.reset();
        let binding = bind_column(column_index, schema, chunk, self.buffer.len())
            .with_context(|_| format!("could not prepare column {}", column_index))?;
        debug!(
            "binding column {} ({}, {:?}): {} values in {} bytes at offset {}",
            column_index,
            binding.name,
            binding.physical_type,
            binding.num_values,
            binding.chunk_size,
            binding.chunk_start
        );
        self.column_left_values = binding.num_values;
        self.column_left_bytes = binding.chunk_size;
        let buffer = self.buffer;
        self.chunk =
            SliceCursor::new(&buffer[binding.chunk_start..binding.chunk_start + binding.chunk_size]);
        self.binding = Some(binding);

        if self.column_left_values == 0 || self.column_left_bytes == 0 {
            // Nothing to decode; the first read reports exhaustion.
            self.column_left_values = 0;
            self.state = ReaderState::Ready;
            return Ok(());
        }

        self.load_first_pages()
            .with_context(|_| format!("could not prepare column {}", column_index))?;
        self.state = ReaderState::Ready;
        Ok(())
    }

    /// Decodes the next batch into `out`, returning the bytes consumed.
    ///
    /// A batch holds up to [`VECTOR_CAPACITY`] slots and is only shorter at the
    /// end of the column. Once the column is exhausted `out` is left empty and
    /// the reader moves to [`ReaderState::Exhausted`].
    pub fn read(&mut self, out: &mut Vector<'a>) -> ParquetResult<usize> {
        assert!(
            self.state != ReaderState::Uninitialized,
            "column reader used before a successful prepare"
        );
        out.clear();
        if self.state == ReaderState::Exhausted {
            return Ok(0);
        }
        if self.column_left_values == 0 {
            trace!("column {} exhausted", self.binding().column_index);
            self.state = ReaderState::Exhausted;
            return Ok(0);
        }

        let mut consumed = 0;
        while out.total_count() < VECTOR_CAPACITY && self.column_left_values > 0 {
            if self.page_left_values == 0 {
                consumed += self.load_next_page().with_context(|_| {
                    format!("could not read page of column {}", self.binding().column_index)
                })?;
            }
            let count = self
                .page_left_values
                .min(VECTOR_CAPACITY - out.total_count());
            let page_bytes = self.decode_batch(count, out).with_context(|_| {
                format!("could not decode column {}", self.binding().column_index)
            })?;
            if page_bytes > self.page_left_bytes {
                return Err(fmt_err!(
                    Layout,
                    "batch consumed {} bytes, page has {} left",
                    page_bytes,
                    self.page_left_bytes
                ));
            }
            self.page_left_bytes -= page_bytes;
            self.column_left_bytes -= page_bytes;
            self.page_left_values -= count;
            self.column_left_values -= count;
            consumed += page_bytes;
        }
        trace!(
            "column {}: read {} slots ({} values), {} values left",
            self.binding().column_index,
            out.total_count(),
            out.value_count(),
            self.column_left_values
        );
        Ok(consumed)
    }

    fn reset(&mut self) {
        self.state = ReaderState::Uninitialized;
        self.binding = None;
        self.chunk = SliceCursor::new(&[]);
        self.column_left_values = 0;
        self.column_left_bytes = 0;
        self.page_left_values = 0;
        self.page_left_bytes = 0;
        self.page = None;
        self.dictionary.clear();
    }

    fn binding(&self) -> &ColumnBinding {
        self.binding.as_ref().expect("column reader is bound")
    }

    fn load_first_pages(&mut self) -> ParquetResult<()> {
        self.load_dictionary()?;
        self.load_next_page()?;
        Ok(())
    }

    fn load_dictionary(&mut self) -> ParquetResult<()> {
        if self.binding().dictionary_page_offset.is_none() {
            return Ok(());
        }
        if self.options.dictionary_support() == DictionarySupport::Disabled {
            return Err(fmt_err!(Unsupported, "dictionary pages are disabled"));
        }
        let start = self.chunk.location();
        let page = read_dict_page(&mut self.chunk, &self.options)?;
        let (physical_type, type_length) = {
            let binding = self.binding();
            (binding.physical_type, binding.type_length)
        };

        let mut decoder = PlainDecoder::try_new(page.buffer, physical_type, type_length)?;
        let mut dictionary = Vec::with_capacity(page.num_values);
        for _ in 0..page.num_values {
            dictionary.push(decoder.read_value()?);
        }
        if decoder.consumed() != page.buffer.len() {
            return Err(fmt_err!(
                Invalid,
                "dictionary page declares {} bytes but its {} values take {}",
                page.buffer.len(),
                page.num_values,
                decoder.consumed()
            ));
        }
        self.column_left_bytes = self.chunk_left_after(start)?;
        debug!(
            "loaded dictionary of {} {:?} values ({} bytes)",
            dictionary.len(),
            physical_type,
            page.buffer.len()
        );
        self.dictionary = dictionary;
        Ok(())
    }

    /// Moves to the next data page, skipping whatever the current page left
    /// unread. Returns the bytes consumed up front: the page header, the level
    /// length prefix and, for dictionary pages, the bit width.
    fn load_next_page(&mut self) -> ParquetResult<usize> {
        self.column_left_bytes -= self.page_left_bytes;
        self.page_left_bytes = 0;
        self.page = None;

        let start = self.chunk.location();
        let page = read_data_page(&mut self.chunk, &self.options)?;
        self.chunk_left_after(start)?;
        let page_len = self.chunk.location() - start;
        let num_values = page.num_values();
        if num_values == 0 {
            return Err(fmt_err!(Invalid, "data page without values"));
        }
        if num_values > self.column_left_values {
            return Err(fmt_err!(
                Invalid,
                "data page holds {} values, column chunk has {} left",
                num_values,
                self.column_left_values
            ));
        }
        let (def_levels, values) = split_buffer_v1(page.buffer)?;
        let mut upfront = page_len - page.buffer.len() + 4;

        let (physical_type, type_length, has_dictionary) = {
            let binding = self.binding();
            (binding.physical_type, binding.type_length, binding.dictionary_page_offset.is_some())
        };
        let values = if page.encoding().is_dictionary() {
            if !has_dictionary {
                return Err(fmt_err!(
                    Invalid,
                    "dictionary-encoded page in a column chunk without a dictionary page"
                ));
            }
            let Some((&bit_width, indices)) = values.split_first() else {
                return Err(fmt_err!(Layout, "dictionary-encoded page has no bit width"));
            };
            upfront += 1;
            PageValues::Dictionary(HybridRleDecoder::try_new(indices, bit_width)?)
        } else {
            PageValues::Plain(PlainDecoder::try_new(values, physical_type, type_length)?)
        };

        self.column_left_bytes -= upfront;
        self.page_left_bytes = page_len - upfront;
        self.page_left_values = num_values;
        self.page = Some(PageState {
            def_levels: HybridRleDecoder::try_new(def_levels, 1)?,
            values,
        });
        trace!(
            "column {}: data page of {} values, {} bytes, {:?}",
            self.binding().column_index,
            num_values,
            page.buffer.len(),
            page.encoding()
        );
        Ok(upfront)
    }

    /// Bytes of the column chunk left once the page that started at `start`
    /// is fully consumed.
    fn chunk_left_after(&self, start: usize) -> ParquetResult<usize> {
        let page_len = self.chunk.location() - start;
        self.column_left_bytes.checked_sub(page_len).ok_or_else(|| {
            fmt_err!(
                Layout,
                "page of {} bytes overruns the {} bytes left in the column chunk",
                page_len,
                self.column_left_bytes
            )
        })
    }

    /// Decodes `count` slots of the current page after the slots already in
    /// `out`, returning the page bytes consumed.
    fn decode_batch(&mut self, count: usize, out: &mut Vector<'a>) -> ParquetResult<usize> {
        let page = self.page.as_mut().expect("a data page is loaded");
        let levels_before = page.def_levels.consumed();
        let (nulls, non_null) = page.def_levels.read_null_mask(count)?;
        let mut consumed = page.def_levels.consumed() - levels_before;

        match &mut page.values {
            PageValues::Plain(decoder) => {
                let before = decoder.consumed();
                decoder.read_vec(non_null, out)?;
                consumed += decoder.consumed() - before;
            }
            PageValues::Dictionary(indices) => {
                let before = indices.consumed();
                for _ in 0..non_null {
                    let index = indices.next()? as usize;
                    let value = self.dictionary.get(index).ok_or_else(|| {
                        fmt_err!(
                            Invalid,
                            "dictionary index {} out of range, dictionary has {} entries",
                            index,
                            self.dictionary.len()
                        )
                    })?;
                    out.push(*value);
                }
                consumed += indices.consumed() - before;
            }
        }
        let filled = out.total_count();
        out.set_slots(filled + count, out.nulls() | (nulls << filled));
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Encoding;
    use crate::parquet::error::ParquetErrorCause;

    fn chunk(offset: i64, size: i64) -> ColumnChunk {
        ColumnChunk {
            file_path: None,
            file_offset: 0,
            meta_data: Some(ColumnMetaData {
                physical_type: PhysicalType::Int32,
                encodings: vec![Encoding::Plain, Encoding::Rle],
                path_in_schema: vec!["id".to_string()],
                codec: Compression::Uncompressed,
                num_values: 4,
                total_uncompressed_size: size,
                total_compressed_size: size,
                key_value_metadata: None,
                data_page_offset: offset,
                index_page_offset: None,
                dictionary_page_offset: None,
                statistics: None,
            }),
        }
    }

    fn cause_of(schema: &SchemaElement, chunk: &ColumnChunk) -> ParquetErrorCause {
        bind_column(0, schema, chunk, 100).unwrap_err().cause().clone()
    }

    #[test]
    fn test_bind_valid_chunk() {
        let schema = SchemaElement::optional("id", PhysicalType::Int32);
        let binding = bind_column(2, &schema, &chunk(4, 50), 100).unwrap();
        assert_eq!(binding.column_index, 2);
        assert_eq!(binding.chunk_start, 4);
        assert_eq!(binding.chunk_size, 50);
        assert_eq!(binding.num_values, 4);
    }

    #[test]
    fn test_bind_rejects_unsupported_chunks() {
        let schema = SchemaElement::optional("id", PhysicalType::Int32);

        let mut external = chunk(4, 50);
        external.file_path = Some("other.parquet".to_string());
        assert!(matches!(cause_of(&schema, &external), ParquetErrorCause::Unsupported));

        let mut offset = chunk(4, 50);
        offset.file_offset = 4;
        assert!(matches!(cause_of(&schema, &offset), ParquetErrorCause::Unsupported));

        let mut snappy = chunk(4, 50);
        snappy.meta_data.as_mut().unwrap().codec = Compression::Snappy;
        assert!(matches!(cause_of(&schema, &snappy), ParquetErrorCause::Unsupported));

        let mut sizes = chunk(4, 50);
        sizes.meta_data.as_mut().unwrap().total_compressed_size = 40;
        assert!(matches!(cause_of(&schema, &sizes), ParquetErrorCause::Unsupported));

        let mut required = schema.clone();
        required.repetition = Some(Repetition::Required);
        assert!(matches!(cause_of(&required, &chunk(4, 50)), ParquetErrorCause::Unsupported));
    }

    #[test]
    fn test_bind_rejects_inconsistent_chunks() {
        let schema = SchemaElement::optional("id", PhysicalType::Int64);
        assert!(matches!(cause_of(&schema, &chunk(4, 50)), ParquetErrorCause::Invalid));

        let schema = SchemaElement::optional("id", PhysicalType::Int32);
        assert!(matches!(cause_of(&schema, &chunk(60, 50)), ParquetErrorCause::Layout));

        let mut no_meta = chunk(4, 50);
        no_meta.meta_data = None;
        assert!(matches!(cause_of(&schema, &no_meta), ParquetErrorCause::Invalid));
    }

    #[test]
    #[should_panic(expected = "before a successful prepare")]
    fn test_read_before_prepare_panics() {
        let mut reader = ColumnReader::new(&[], DecodeOptions::default());
        reader.read(&mut Vector::new()).unwrap();
    }
}
