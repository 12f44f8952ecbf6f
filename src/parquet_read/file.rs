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

use crate::allocator::{PoolSlot, RecordAllocator};
use crate::metadata::{read_record, FileMetaData, PhysicalType, RecordKind, RowGroup};
use crate::parquet::config::DecodeOptions;
use crate::parquet::error::{fmt_err, ParquetErrorExt, ParquetResult};
use crate::parquet_read::{ColumnReader, DeltaColumnReader};
use log::debug;

// Leading magic plus the trailing `[footer length][magic]`.
const MIN_FILE_SIZE: usize = 12;
const TRAILER_SIZE: usize = 8;

/// Decodes one file held in a resident buffer.
///
/// Owns the file metadata and a shared column reader of each kind, which
/// [`FileReader::prepare_column_reader`] and
/// [`FileReader::prepare_delta_column_reader`] re-bind on every call.
pub struct FileReader<'a> {
    buffer: &'a [u8],
    metadata: FileMetaData,
    row_group: Option<usize>,
    column_reader: ColumnReader<'a>,
    delta_reader: DeltaColumnReader<'a>,
    _slots: Vec<PoolSlot>,
}

impl<'a> FileReader<'a> {
    /// Validates the magic bytes and footer, then decodes the file metadata.
    pub fn prepare(
        buffer: &'a [u8],
        options: DecodeOptions,
        allocator: &RecordAllocator,
    ) -> ParquetResult<Self> {
        let metadata = read_metadata(buffer, &options)?;
        validate_schema(&metadata)?;
        let slots = reserve_slots(&metadata, allocator)?;
        debug!(
            "prepared file of {} bytes: {} rows, {} row groups, {} columns",
            buffer.len(),
            metadata.num_rows,
            metadata.row_groups.len(),
            metadata.schema.len() - 1
        );
        Ok(Self {
            buffer,
            metadata,
            row_group: None,
            column_reader: ColumnReader::new(buffer, options),
            delta_reader: DeltaColumnReader::new(buffer, options),
            _slots: slots,
        })
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Leaf columns, not counting the schema root.
    pub fn num_columns(&self) -> usize {
        self.metadata.schema.len() - 1
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.row_groups.len()
    }

    /// Index of the current row group, `None` before the first
    /// [`FileReader::next_row_group`].
    pub fn row_group_index(&self) -> Option<usize> {
        self.row_group
    }

    pub fn row_group(&self) -> Option<&RowGroup> {
        self.row_group.and_then(|index| self.metadata.row_groups.get(index))
    }

    /// Advances to the next row group. Returns `false` once all are read.
    pub fn next_row_group(&mut self) -> bool {
        let next = self.row_group.map_or(0, |index| index + 1);
        if next < self.metadata.row_groups.len() {
            self.row_group = Some(next);
            debug!("row group {}: {} rows", next, self.metadata.row_groups[next].num_rows);
            true
        } else {
            self.row_group = Some(self.metadata.row_groups.len());
            false
        }
    }

    /// Binds the shared column reader to `column_index` of the current row group.
    /// Column 0 is the first leaf, schema element 1.
    pub fn prepare_column_reader(
        &mut self,
        column_index: usize,
    ) -> ParquetResult<&mut ColumnReader<'a>> {
        let row_group = self.current_row_group()?;
        self.check_column_index(column_index)?;
        let schema = &self.metadata.schema[column_index + 1];
        let chunk = &self.metadata.row_groups[row_group].columns[column_index];
        self.column_reader
            .prepare(column_index, schema, chunk)
            .with_context(|_| format!("row group {}", row_group))?;
        Ok(&mut self.column_reader)
    }

    /// Binds the shared delta reader to the last column of the current row group.
    pub fn prepare_delta_column_reader(&mut self) -> ParquetResult<&mut DeltaColumnReader<'a>> {
        let row_group = self.current_row_group()?;
        let column_index = self
            .num_columns()
            .checked_sub(1)
            .ok_or_else(|| fmt_err!(Invalid, "file has no columns"))?;
        let schema = &self.metadata.schema[column_index + 1];
        let chunk = &self.metadata.row_groups[row_group].columns[column_index];
        self.delta_reader
            .prepare(column_index, schema, chunk)
            .with_context(|_| format!("row group {}", row_group))?;
        Ok(&mut self.delta_reader)
    }

    /// Releases the metadata and its pool slots.
    ///
    /// The reader only borrows its buffer, so closing the transport is left to
    /// the owner: call [`ResidentFile::close`](crate::parquet::io::ResidentFile::close)
    /// once `end` has returned. The buffer cannot be closed while a reader
    /// still borrows it.
    pub fn end(self) {
        debug!("closing file of {} bytes", self.buffer.len());
    }

    fn current_row_group(&self) -> ParquetResult<usize> {
        match self.row_group {
            Some(index) if index < self.metadata.row_groups.len() => Ok(index),
            Some(_) => Err(fmt_err!(Invalid, "all row groups have been read")),
            None => Err(fmt_err!(Invalid, "no current row group, call next_row_group first")),
        }
    }

    fn check_column_index(&self, column_index: usize) -> ParquetResult<()> {
        if column_index >= self.num_columns() {
            return Err(fmt_err!(
                Invalid,
                "column index {} out of range, file has {} columns",
                column_index,
                self.num_columns()
            ));
        }
        Ok(())
    }
}

fn read_metadata(buffer: &[u8], options: &DecodeOptions) -> ParquetResult<FileMetaData> {
    let size = buffer.len();
    if size < MIN_FILE_SIZE {
        return Err(fmt_err!(
            Invalid,
            "file of {} bytes is smaller than the minimum of {}",
            size,
            MIN_FILE_SIZE
        ));
    }
    let magic = options.magic();
    let trailer = &buffer[size - TRAILER_SIZE..];
    if trailer[4..] != magic {
        return Err(fmt_err!(Invalid, "bad magic before the footer: {:?}", &trailer[4..]));
    }
    let mut footer_len = [0u8; 4];
    footer_len.copy_from_slice(&trailer[..4]);
    let footer_len = u32::from_le_bytes(footer_len) as usize;
    if footer_len > size - MIN_FILE_SIZE {
        return Err(fmt_err!(
            Invalid,
            "footer of {} bytes does not fit in a file of {} bytes",
            footer_len,
            size
        ));
    }
    let footer_start = size - footer_len - TRAILER_SIZE;
    let (metadata, _) =
        read_record::<FileMetaData>(&buffer[footer_start..size - TRAILER_SIZE], options)
            .with_context(|_| format!("footer at offset {}", footer_start))?;
    if buffer[..4] != magic {
        return Err(fmt_err!(Invalid, "bad magic at the start of the file: {:?}", &buffer[..4]));
    }
    Ok(metadata)
}

fn validate_schema(metadata: &FileMetaData) -> ParquetResult<()> {
    let Some((root, leaves)) = metadata.schema.split_first() else {
        return Err(fmt_err!(Invalid, "file has an empty schema"));
    };
    if root.num_children != Some(leaves.len() as i32) {
        return Err(fmt_err!(
            Unsupported,
            "schema root declares {:?} children but {} elements follow, nested schemas are not supported",
            root.num_children,
            leaves.len()
        ));
    }
    for leaf in leaves {
        if leaf.num_children.is_some_and(|n| n != 0) {
            return Err(fmt_err!(
                Unsupported,
                "nested column {} is not supported",
                leaf.name
            ));
        }
        match leaf.physical_type {
            None => {
                return Err(fmt_err!(Invalid, "column {} has no physical type", leaf.name));
            }
            Some(PhysicalType::Int96) => {
                return Err(fmt_err!(Unsupported, "INT96 column {} is not supported", leaf.name));
            }
            Some(_) => {}
        }
    }
    for (index, row_group) in metadata.row_groups.iter().enumerate() {
        if row_group.columns.len() != leaves.len() {
            return Err(fmt_err!(
                Invalid,
                "row group {} has {} column chunks, schema has {} columns",
                index,
                row_group.columns.len(),
                leaves.len()
            ));
        }
        for (chunk, leaf) in row_group.columns.iter().zip(leaves) {
            let meta = chunk.meta_data.as_ref().ok_or_else(|| {
                fmt_err!(Invalid, "row group {} column {} has no metadata", index, leaf.name)
            })?;
            if leaf.physical_type != Some(meta.physical_type) {
                return Err(fmt_err!(
                    Invalid,
                    "row group {} column {} is {:?} but the schema says {:?}",
                    index,
                    leaf.name,
                    meta.physical_type,
                    leaf.physical_type
                ));
            }
        }
    }
    Ok(())
}

fn reserve_slots(
    metadata: &FileMetaData,
    allocator: &RecordAllocator,
) -> ParquetResult<Vec<PoolSlot>> {
    let mut slots = Vec::new();
    for row_group in &metadata.row_groups {
        slots.push(allocator.acquire(RecordKind::RowGroup)?);
        for _ in &row_group.columns {
            slots.push(allocator.acquire(RecordKind::ColumnChunk)?);
            slots.push(allocator.acquire(RecordKind::ColumnMetaData)?);
        }
    }
    Ok(slots)
}
