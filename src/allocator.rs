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

//! Bounded record pools.
//!
//! Row groups, column chunks and column metadata have a static upper bound
//! (files × row groups × columns), so they are accounted against fixed-capacity
//! free lists instead of growing without limit. The records themselves are
//! owned by their parent container; a [`PoolSlot`] is the proof that the
//! record fits in the budget and returns its slot when dropped.

use crate::metadata::RecordKind;
use crate::parquet::config::PoolLimits;
use crate::parquet::error::{fmt_err, ParquetResult};
use nonmax::NonMaxU32;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

const POOLED_KINDS: [RecordKind; 3] = [
    RecordKind::RowGroup,
    RecordKind::ColumnChunk,
    RecordKind::ColumnMetaData,
];

struct RecordPool {
    kind: RecordKind,
    capacity: usize,
    free: Mutex<Vec<NonMaxU32>>,
}

impl RecordPool {
    fn new(kind: RecordKind, capacity: usize) -> Self {
        // NonMaxU32 can't hold u32::MAX, which caps the pool one short of it.
        let capacity = capacity.min(u32::MAX as usize);
        let free = (0..capacity as u32).rev().filter_map(NonMaxU32::new).collect();
        Self { kind, capacity, free: Mutex::new(free) }
    }
}

struct Pools {
    pools: [RecordPool; 3],
}

impl Pools {
    fn pool(&self, kind: RecordKind) -> Option<(usize, &RecordPool)> {
        self.pools.iter().enumerate().find(|(_, pool)| pool.kind == kind)
    }
}

/// Explicit allocator for the bounded record kinds. Cloning is cheap and
/// clones share the same pools, so one instance can serve many readers and threads.
#[derive(Clone)]
pub struct RecordAllocator {
    inner: Arc<Pools>,
}

impl RecordAllocator {
    pub fn new(limits: PoolLimits) -> Self {
        let [row_group, column_chunk, column_meta] = POOLED_KINDS;
        Self {
            inner: Arc::new(Pools {
                pools: [
                    RecordPool::new(row_group, limits.row_groups()),
                    RecordPool::new(column_chunk, limits.column_chunks()),
                    RecordPool::new(column_meta, limits.column_chunks()),
                ],
            }),
        }
    }

    /// Whether records of `kind` are served from a bounded pool.
    pub fn is_pooled(kind: RecordKind) -> bool {
        POOLED_KINDS.contains(&kind)
    }

    /// Takes one slot for a record of `kind`.
    pub fn acquire(&self, kind: RecordKind) -> ParquetResult<PoolSlot> {
        let Some((pool_index, pool)) = self.inner.pool(kind) else {
            return Err(fmt_err!(Pool, "{} records are not pooled", kind));
        };
        let index = pool.free.lock().pop();
        match index {
            Some(index) => Ok(PoolSlot { pools: self.inner.clone(), pool_index, index }),
            None => Err(fmt_err!(
                Pool,
                "{} pool exhausted, all {} slots are in use",
                kind,
                pool.capacity
            )),
        }
    }

    pub fn capacity(&self, kind: RecordKind) -> usize {
        self.inner.pool(kind).map_or(0, |(_, pool)| pool.capacity)
    }

    /// Number of slots currently free for `kind`.
    pub fn available(&self, kind: RecordKind) -> usize {
        self.inner.pool(kind).map_or(0, |(_, pool)| pool.free.lock().len())
    }
}

impl Default for RecordAllocator {
    fn default() -> Self {
        Self::new(PoolLimits::default())
    }
}

impl Debug for RecordAllocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for pool in &self.inner.pools {
            map.entry(&pool.kind, &(pool.capacity - pool.free.lock().len(), pool.capacity));
        }
        map.finish()
    }
}

/// A reserved pool slot, released back to its pool on drop.
pub struct PoolSlot {
    pools: Arc<Pools>,
    pool_index: usize,
    index: NonMaxU32,
}

impl PoolSlot {
    pub fn kind(&self) -> RecordKind {
        self.pools.pools[self.pool_index].kind
    }

    pub fn index(&self) -> u32 {
        self.index.get()
    }
}

impl Debug for PoolSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PoolSlot({}#{})", self.kind(), self.index())
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.pools.pools[self.pool_index].free.lock().push(self.index);
    }
}
