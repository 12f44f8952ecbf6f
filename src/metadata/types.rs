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

//! Enumerations of the Parquet format, as stored in metadata and page headers.

use crate::parquet::error::{fmt_err, ParquetError};

macro_rules! thrift_enum {
    ($(#[$meta:meta])* $name:ident, $descr:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = ParquetError;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    unknown => Err(fmt_err!(Invalid, "unknown {} {}", $descr, unknown)),
                }
            }
        }
    };
}

thrift_enum!(
    /// Physical storage type of a column.
    PhysicalType, "physical type", {
        Boolean = 0,
        Int32 = 1,
        Int64 = 2,
        Int96 = 3,
        Float = 4,
        Double = 5,
        ByteArray = 6,
        FixedLenByteArray = 7,
    }
);

impl PhysicalType {
    /// Plain-encoded width in bytes, `None` for booleans and byte arrays.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::Int96 => Some(12),
            PhysicalType::Boolean | PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => {
                None
            }
        }
    }
}

thrift_enum!(
    Repetition, "repetition type", {
        Required = 0,
        Optional = 1,
        Repeated = 2,
    }
);

thrift_enum!(
    Encoding, "encoding", {
        Plain = 0,
        PlainDictionary = 2,
        Rle = 3,
        BitPacked = 4,
        DeltaBinaryPacked = 5,
        DeltaLengthByteArray = 6,
        DeltaByteArray = 7,
        RleDictionary = 8,
        ByteStreamSplit = 9,
    }
);

impl Encoding {
    /// Data page encodings whose values are hybrid-encoded dictionary indices.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

thrift_enum!(
    Compression, "compression codec", {
        Uncompressed = 0,
        Snappy = 1,
        Gzip = 2,
        Lzo = 3,
        Brotli = 4,
        Lz4 = 5,
        Zstd = 6,
        Lz4Raw = 7,
    }
);

thrift_enum!(
    PageType, "page type", {
        DataPage = 0,
        IndexPage = 1,
        DictionaryPage = 2,
        DataPageV2 = 3,
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for t in [
            PhysicalType::Boolean,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::Int96,
            PhysicalType::Float,
            PhysicalType::Double,
            PhysicalType::ByteArray,
            PhysicalType::FixedLenByteArray,
        ] {
            assert_eq!(PhysicalType::try_from(t.code()).unwrap(), t);
        }
        assert_eq!(Encoding::try_from(8).unwrap(), Encoding::RleDictionary);
        assert_eq!(Compression::try_from(0).unwrap(), Compression::Uncompressed);
        assert_eq!(PageType::try_from(2).unwrap(), PageType::DictionaryPage);
    }

    #[test]
    fn test_unknown_code() {
        let err = Encoding::try_from(1).unwrap_err();
        assert_eq!(err.to_string(), "unknown encoding 1");
        assert!(Repetition::try_from(-1).is_err());
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(PhysicalType::Int32.fixed_width(), Some(4));
        assert_eq!(PhysicalType::Double.fixed_width(), Some(8));
        assert_eq!(PhysicalType::ByteArray.fixed_width(), None);
        assert!(Encoding::PlainDictionary.is_dictionary());
        assert!(!Encoding::Rle.is_dictionary());
    }
}
