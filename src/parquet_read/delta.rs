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

use crate::metadata::{ColumnChunk, PhysicalType, SchemaElement};
use crate::parquet::config::DecodeOptions;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet::io::SliceCursor;
use crate::parquet_read::column::{bind_column, ColumnBinding, ReaderState};
use crate::parquet_read::decoders::PlainDecoder;
use crate::parquet_read::page::read_dict_page;
use crate::parquet_read::{Vector, VECTOR_CAPACITY};
use log::{debug, trace};

// Encoded size of a zero-length byte array: the prefix alone. Marks the end of a run.
const SENTINEL_LEN: usize = 4;

/// Reads the trailing delta column.
///
/// Its byte-array values are stored plain, one run after another, in the body
/// of a single dictionary-framed page. Each run ends with a zero-length value.
pub struct DeltaColumnReader<'a> {
    buffer: &'a [u8],
    options: DecodeOptions,
    state: ReaderState,
    binding: Option<ColumnBinding>,
    values: Option<PlainDecoder<'a>>,
    page_left_bytes: usize,
}

impl<'a> DeltaColumnReader<'a> {
    pub fn new(buffer: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            buffer,
            options,
            state: ReaderState::Uninitialized,
            binding: None,
            values: None,
            page_left_bytes: 0,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ReaderState::Exhausted
    }

    pub fn column_index(&self) -> Option<usize> {
        self.binding.as_ref().map(|b| b.column_index)
    }

    pub fn page_left_bytes(&self) -> usize {
        self.page_left_bytes
    }

    pub fn prepare(
        &mut self,
        column_index: usize,
        schema: &SchemaElement,
        chunk: &ColumnChunk,
    ) -> ParquetResult<()> {
        self.state = ReaderState::Uninitialized;
        self.binding = None;
        self.values = None;
        self.page_left_bytes = 0;
        self.bind(column_index, schema, chunk)
            .with_context(|_| format!("could not prepare delta column {}", column_index))?;
        self.state = ReaderState::Ready;
        Ok(())
    }

    fn bind(
        &mut self,
        column_index: usize,
        schema: &SchemaElement,
        chunk: &ColumnChunk,
    ) -> ParquetResult<()> {
        let binding = bind_column(column_index, schema, chunk, self.buffer.len())?;
        if binding.physical_type != PhysicalType::ByteArray {
            return Err(fmt_err!(
                Unsupported,
                "delta column {} must be a byte array, found {:?}",
                binding.name,
                binding.physical_type
            ));
        }
        if binding.dictionary_page_offset.is_none() {
            return Err(fmt_err!(
                Invalid,
                "delta column {} has no dictionary page offset",
                binding.name
            ));
        }
        debug!(
            "binding delta column {} ({}): {} values in {} bytes at offset {}",
            column_index,
            binding.name,
            binding.num_values,
            binding.chunk_size,
            binding.chunk_start
        );

        if binding.num_values > 0 && binding.chunk_size > 0 {
            let chunk_bytes =
                &self.buffer[binding.chunk_start..binding.chunk_start + binding.chunk_size];
            let page = read_dict_page(&mut SliceCursor::new(chunk_bytes), &self.options)?;
            self.values = Some(PlainDecoder::try_new(page.buffer, PhysicalType::ByteArray, None)?);
            self.page_left_bytes = page.buffer.len();
        }
        self.binding = Some(binding);
        Ok(())
    }

    /// Decodes the rest of the current run, up to [`VECTOR_CAPACITY`] values,
    /// returning the bytes consumed.
    ///
    /// A call stops after consuming a run's terminator. A call that yields no
    /// values moves the reader to [`ReaderState::Exhausted`].
    pub fn read(&mut self, out: &mut Vector<'a>) -> ParquetResult<usize> {
        assert!(
            self.state != ReaderState::Uninitialized,
            "delta column reader used before a successful prepare"
        );
        out.clear();
        if self.state == ReaderState::Exhausted {
            return Ok(0);
        }
        let Some(values) = self.values.as_mut() else {
            self.state = ReaderState::Exhausted;
            return Ok(0);
        };

        let mut consumed = 0;
        while out.value_count() < VECTOR_CAPACITY && self.page_left_bytes >= SENTINEL_LEN {
            let value = values.read_byte_array().with_context(|_| {
                format!("could not decode delta value at page offset {}", values.consumed())
            })?;
            let len = value.byte_len();
            self.page_left_bytes = self.page_left_bytes.saturating_sub(len);
            consumed += len;
            if len == SENTINEL_LEN {
                break;
            }
            out.push(value);
        }

        let count = out.value_count();
        out.set_slots(count, 0);
        if count == 0 {
            trace!("delta column exhausted");
            self.state = ReaderState::Exhausted;
        } else {
            trace!("delta column: read {} values, {} bytes left", count, self.page_left_bytes);
        }
        Ok(consumed)
    }
}
