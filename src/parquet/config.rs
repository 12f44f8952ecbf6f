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

/// The file signature expected at offset 0 and right before the footer length.
pub const PARQUET_MAGIC: [u8; 4] = *b"PAR1";

const DEFAULT_STRING_SIZE_LIMIT: usize = 16 * 1024 * 1024;
const DEFAULT_CONTAINER_SIZE_LIMIT: usize = 1024 * 1024;

/// Whether column chunks may carry a dictionary page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictionarySupport {
    #[default]
    Enabled,
    /// Chunks that declare a dictionary page are rejected.
    Disabled,
}

/// Options fixed for the lifetime of a [`crate::parquet_read::FileReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    string_size_limit: usize,
    container_size_limit: usize,
    dictionary_support: DictionarySupport,
    magic: [u8; 4],
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            string_size_limit: DEFAULT_STRING_SIZE_LIMIT,
            container_size_limit: DEFAULT_CONTAINER_SIZE_LIMIT,
            dictionary_support: DictionarySupport::Enabled,
            magic: PARQUET_MAGIC,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest binary or string the metadata decoder will accept.
    pub fn with_string_size_limit(mut self, limit: usize) -> Self {
        self.string_size_limit = limit;
        self
    }

    /// Largest list, set or map the metadata decoder will accept.
    pub fn with_container_size_limit(mut self, limit: usize) -> Self {
        self.container_size_limit = limit;
        self
    }

    pub fn with_dictionary_support(mut self, support: DictionarySupport) -> Self {
        self.dictionary_support = support;
        self
    }

    pub fn with_magic(mut self, magic: [u8; 4]) -> Self {
        self.magic = magic;
        self
    }

    pub fn string_size_limit(&self) -> usize {
        self.string_size_limit
    }

    pub fn container_size_limit(&self) -> usize {
        self.container_size_limit
    }

    pub fn dictionary_support(&self) -> DictionarySupport {
        self.dictionary_support
    }

    pub fn magic(&self) -> [u8; 4] {
        self.magic
    }
}

/// Static upper bounds used to size the record pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_files: usize,
    pub max_row_groups: usize,
    pub max_columns: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self { max_files: 4, max_row_groups: 64, max_columns: 64 }
    }
}

impl PoolLimits {
    pub fn row_groups(&self) -> usize {
        self.max_files * self.max_row_groups
    }

    pub fn column_chunks(&self) -> usize {
        self.max_files * self.max_row_groups * self.max_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let opts = DecodeOptions::new()
            .with_string_size_limit(10)
            .with_container_size_limit(20)
            .with_dictionary_support(DictionarySupport::Disabled)
            .with_magic(*b"PAR0");
        assert_eq!(opts.string_size_limit(), 10);
        assert_eq!(opts.container_size_limit(), 20);
        assert_eq!(opts.dictionary_support(), DictionarySupport::Disabled);
        assert_eq!(opts.magic(), *b"PAR0");
        assert_eq!(DecodeOptions::default().magic(), PARQUET_MAGIC);
    }

    #[test]
    fn test_pool_limits() {
        let limits = PoolLimits { max_files: 2, max_row_groups: 3, max_columns: 5 };
        assert_eq!(limits.row_groups(), 6);
        assert_eq!(limits.column_chunks(), 30);
    }
}
