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

//! Decoder for flat, uncompressed Parquet files held in a resident buffer.
//!
//! A [`FileReader`] validates the footer of a fully-resident file and hands out
//! a [`ColumnReader`] per column chunk, which decodes values into fixed-size
//! [`Vector`] batches that borrow from the file bytes.

pub mod allocator;
pub mod metadata;
pub mod parquet;
pub mod parquet_read;
pub mod parquet_write;
pub mod thrift;

pub use allocator::RecordAllocator;
pub use parquet::config::{DecodeOptions, DictionarySupport, PoolLimits};
pub use parquet::error::{ParquetError, ParquetErrorCause, ParquetResult};
pub use parquet::io::ResidentFile;
pub use parquet_read::{
    ColumnReader, DeltaColumnReader, FileReader, OwnedValue, ReaderState, Value, Vector,
    VECTOR_CAPACITY,
};
pub use parquet_write::{ColumnSpec, ColumnValues, ParquetWriter};
