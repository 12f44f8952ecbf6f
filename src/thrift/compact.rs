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

use super::varint::{decode_varint, from_zigzag_i16, from_zigzag_i32, from_zigzag_i64};
use super::{
    TFieldIdentifier, TListIdentifier, TMapIdentifier, TType, COMPACT_BOOLEAN_TRUE,
    MAX_STRUCT_DEPTH,
};
use crate::parquet::config::DecodeOptions;
use crate::parquet::error::{fmt_err, ParquetResult};
use crate::parquet::io::SliceCursor;

// Lists of lists never push a struct frame, so `skip` bounds its own recursion.
const MAX_SKIP_DEPTH: usize = 64;

/// Reads compact-protocol values from a resident buffer.
pub struct TCompactInputProtocol<'a> {
    cursor: SliceCursor<'a>,
    last_read_field_id: i16,
    read_field_id_stack: [i16; MAX_STRUCT_DEPTH],
    depth: usize,
    // Booleans live in the field header's type nibble; the value is held
    // here until the matching `read_bool`.
    pending_read_bool_value: Option<bool>,
    string_size_limit: usize,
    container_size_limit: usize,
}

impl<'a> TCompactInputProtocol<'a> {
    pub fn new(data: &'a [u8], options: &DecodeOptions) -> Self {
        Self::from_cursor(SliceCursor::new(data), options)
    }

    pub fn from_cursor(cursor: SliceCursor<'a>, options: &DecodeOptions) -> Self {
        Self {
            cursor,
            last_read_field_id: 0,
            read_field_id_stack: [0; MAX_STRUCT_DEPTH],
            depth: 0,
            pending_read_bool_value: None,
            string_size_limit: options.string_size_limit(),
            container_size_limit: options.container_size_limit(),
        }
    }

    /// Current offset into the underlying buffer.
    pub fn location(&self) -> usize {
        self.cursor.location()
    }

    pub fn into_cursor(self) -> SliceCursor<'a> {
        self.cursor
    }

    pub fn read_struct_begin(&mut self) -> ParquetResult<()> {
        if self.depth == MAX_STRUCT_DEPTH {
            return Err(fmt_err!(
                Invalid,
                "structs nested deeper than {} levels at offset {}",
                MAX_STRUCT_DEPTH,
                self.cursor.location()
            ));
        }
        self.read_field_id_stack[self.depth] = self.last_read_field_id;
        self.depth += 1;
        self.last_read_field_id = 0;
        Ok(())
    }

    pub fn read_struct_end(&mut self) -> ParquetResult<()> {
        if self.depth == 0 {
            return Err(fmt_err!(Invalid, "struct end without a matching struct begin"));
        }
        self.depth -= 1;
        self.last_read_field_id = self.read_field_id_stack[self.depth];
        Ok(())
    }

    pub fn read_field_begin(&mut self) -> ParquetResult<TFieldIdentifier> {
        let header = self.cursor.read_u8()?;
        let type_code = header & 0x0F;
        if type_code == 0 {
            return Ok(TFieldIdentifier::stop());
        }
        let field_type = TType::from_compact_code(type_code)?;
        if field_type == TType::Bool {
            self.pending_read_bool_value = Some(type_code == COMPACT_BOOLEAN_TRUE);
        }

        let delta = (header & 0xF0) >> 4;
        let id = if delta != 0 {
            self.last_read_field_id
                .checked_add(delta as i16)
                .ok_or_else(|| fmt_err!(Invalid, "field id overflow"))?
        } else {
            self.read_i16()?
        };
        self.last_read_field_id = id;
        Ok(TFieldIdentifier::new(field_type, id))
    }

    pub fn read_field_end(&mut self) -> ParquetResult<()> {
        Ok(())
    }

    pub fn read_list_begin(&mut self) -> ParquetResult<TListIdentifier> {
        let header = self.cursor.read_u8()?;
        let element_type = TType::from_compact_code(header & 0x0F)?;
        let short_size = (header & 0xF0) >> 4;
        let size = if short_size != 15 {
            short_size as usize
        } else {
            let size = decode_varint(&mut self.cursor)?;
            self.check_container_size(size as i64)?
        };
        Ok(TListIdentifier::new(element_type, size))
    }

    pub fn read_list_end(&mut self) -> ParquetResult<()> {
        Ok(())
    }

    pub fn read_set_begin(&mut self) -> ParquetResult<TListIdentifier> {
        self.read_list_begin()
    }

    pub fn read_set_end(&mut self) -> ParquetResult<()> {
        Ok(())
    }

    pub fn read_map_begin(&mut self) -> ParquetResult<TMapIdentifier> {
        let size = decode_varint(&mut self.cursor)?;
        let size = self.check_container_size(size as i64)?;
        if size == 0 {
            return Ok(TMapIdentifier { key_type: None, value_type: None, size });
        }
        let types = self.cursor.read_u8()?;
        Ok(TMapIdentifier {
            key_type: Some(TType::from_compact_code((types & 0xF0) >> 4)?),
            value_type: Some(TType::from_compact_code(types & 0x0F)?),
            size,
        })
    }

    pub fn read_map_end(&mut self) -> ParquetResult<()> {
        Ok(())
    }

    pub fn read_bool(&mut self) -> ParquetResult<bool> {
        match self.pending_read_bool_value.take() {
            Some(value) => Ok(value),
            // List elements carry the value in a full byte.
            None => Ok(self.cursor.read_u8()? == COMPACT_BOOLEAN_TRUE),
        }
    }

    pub fn read_i8(&mut self) -> ParquetResult<i8> {
        Ok(self.cursor.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> ParquetResult<i16> {
        let raw = decode_varint(&mut self.cursor)?;
        let raw: u16 = raw
            .try_into()
            .map_err(|_| fmt_err!(Invalid, "varint {} does not fit an i16", raw))?;
        Ok(from_zigzag_i16(raw))
    }

    pub fn read_i32(&mut self) -> ParquetResult<i32> {
        let raw = decode_varint(&mut self.cursor)?;
        let raw: u32 = raw
            .try_into()
            .map_err(|_| fmt_err!(Invalid, "varint {} does not fit an i32", raw))?;
        Ok(from_zigzag_i32(raw))
    }

    pub fn read_i64(&mut self) -> ParquetResult<i64> {
        Ok(from_zigzag_i64(decode_varint(&mut self.cursor)?))
    }

    pub fn read_double(&mut self) -> ParquetResult<f64> {
        let bytes = self.cursor.view(8)?;
        let mut le = [0u8; 8];
        le.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(le))
    }

    /// Returns a view into the buffer; nothing is copied.
    pub fn read_binary(&mut self) -> ParquetResult<&'a [u8]> {
        let len = decode_varint(&mut self.cursor)?;
        let len = len as i64;
        if len < 0 {
            return Err(fmt_err!(Invalid, "negative binary length {}", len));
        }
        let len = len as usize;
        if len > self.string_size_limit {
            return Err(fmt_err!(
                Invalid,
                "binary length {} exceeds the limit of {} bytes",
                len,
                self.string_size_limit
            ));
        }
        self.cursor.view(len)
    }

    pub fn read_string(&mut self) -> ParquetResult<String> {
        let bytes = self.read_binary()?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    /// Consumes a value of `field_type` without materializing it.
    pub fn skip(&mut self, field_type: TType) -> ParquetResult<()> {
        self.skip_till_depth(field_type, MAX_SKIP_DEPTH)
    }

    fn skip_till_depth(&mut self, field_type: TType, depth: usize) -> ParquetResult<()> {
        if depth == 0 {
            return Err(fmt_err!(Invalid, "value nested deeper than {} levels", MAX_SKIP_DEPTH));
        }
        match field_type {
            TType::Bool => self.read_bool().map(|_| ()),
            TType::I08 => self.read_i8().map(|_| ()),
            TType::I16 => self.read_i16().map(|_| ()),
            TType::I32 => self.read_i32().map(|_| ()),
            TType::I64 => self.read_i64().map(|_| ()),
            TType::Double => self.read_double().map(|_| ()),
            TType::Binary => self.read_binary().map(|_| ()),
            TType::Struct => {
                self.read_struct_begin()?;
                loop {
                    let field_ident = self.read_field_begin()?;
                    if field_ident.field_type == TType::Stop {
                        break;
                    }
                    self.skip_till_depth(field_ident.field_type, depth - 1)?;
                    self.read_field_end()?;
                }
                self.read_struct_end()
            }
            TType::List | TType::Set => {
                let list_ident = self.read_list_begin()?;
                for _ in 0..list_ident.size {
                    self.skip_till_depth(list_ident.element_type, depth - 1)?;
                }
                self.read_list_end()
            }
            TType::Map => {
                let map_ident = self.read_map_begin()?;
                if let (Some(key_type), Some(value_type)) =
                    (map_ident.key_type, map_ident.value_type)
                {
                    for _ in 0..map_ident.size {
                        self.skip_till_depth(key_type, depth - 1)?;
                        self.skip_till_depth(value_type, depth - 1)?;
                    }
                }
                self.read_map_end()
            }
            TType::Stop => Err(fmt_err!(Invalid, "cannot skip a stop marker")),
        }
    }

    fn check_container_size(&self, size: i64) -> ParquetResult<usize> {
        if size < 0 {
            return Err(fmt_err!(Invalid, "negative container size {}", size));
        }
        let size = size as usize;
        if size > self.container_size_limit {
            return Err(fmt_err!(
                Invalid,
                "container size {} exceeds the limit of {}",
                size,
                self.container_size_limit
            ));
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parquet::error::ParquetErrorCause;

    fn protocol(data: &[u8]) -> TCompactInputProtocol<'_> {
        TCompactInputProtocol::new(data, &DecodeOptions::default())
    }

    #[test]
    fn test_read_short_field_header() {
        let data = [0x35u8];
        let mut prot = protocol(&data);
        prot.read_struct_begin().unwrap();
        let field = prot.read_field_begin().unwrap();
        assert_eq!(field, TFieldIdentifier::new(TType::I32, 3));
    }

    #[test]
    fn test_read_long_field_header() {
        // type byte with zero delta, followed by zigzag(100) = 200 as a varint.
        let data = [0x06u8, 0xC8, 0x01];
        let mut prot = protocol(&data);
        prot.read_struct_begin().unwrap();
        let field = prot.read_field_begin().unwrap();
        assert_eq!(field, TFieldIdentifier::new(TType::I64, 100));
    }

    #[test]
    fn test_field_ids_restored_after_nested_struct() {
        // field 1: struct { field 1: i32 = 1 }, field 2: i32 = 2
        let data = [0x1Cu8, 0x15, 0x02, 0x00, 0x15, 0x04, 0x00];
        let mut prot = protocol(&data);
        prot.read_struct_begin().unwrap();
        assert_eq!(prot.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Struct, 1));
        prot.read_struct_begin().unwrap();
        assert_eq!(prot.read_field_begin().unwrap(), TFieldIdentifier::new(TType::I32, 1));
        assert_eq!(prot.read_i32().unwrap(), 1);
        assert_eq!(prot.read_field_begin().unwrap().field_type, TType::Stop);
        prot.read_struct_end().unwrap();
        assert_eq!(prot.read_field_begin().unwrap(), TFieldIdentifier::new(TType::I32, 2));
        assert_eq!(prot.read_i32().unwrap(), 2);
        assert_eq!(prot.read_field_begin().unwrap().field_type, TType::Stop);
        prot.read_struct_end().unwrap();
    }

    #[test]
    fn test_bool_folded_into_field_header() {
        let data = [0x11u8, 0x12];
        let mut prot = protocol(&data);
        prot.read_struct_begin().unwrap();
        assert_eq!(prot.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Bool, 1));
        assert!(prot.read_bool().unwrap());
        assert_eq!(prot.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Bool, 2));
        assert!(!prot.read_bool().unwrap());
    }

    #[test]
    fn test_list_headers() {
        let data = [0x35u8, 0x02, 0x04, 0x06];
        let mut prot = protocol(&data);
        let list = prot.read_list_begin().unwrap();
        assert_eq!(list, TListIdentifier::new(TType::I32, 3));
        let values: Vec<i32> = (0..3).map(|_| prot.read_i32().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);

        let data = [0xF8u8, 0x14];
        let mut prot = protocol(&data);
        assert_eq!(prot.read_list_begin().unwrap(), TListIdentifier::new(TType::Binary, 20));
    }

    #[test]
    fn test_container_limit() {
        let data = [0xF5u8, 0x80, 0x01];
        let opts = DecodeOptions::default().with_container_size_limit(100);
        let mut prot = TCompactInputProtocol::new(&data, &opts);
        let err = prot.read_list_begin().unwrap_err();
        assert!(err.to_string().contains("container size 128 exceeds the limit of 100"));
    }

    #[test]
    fn test_binary_limits() {
        let data = [0x04u8, b'a', b'b', b'c', b'd'];
        let mut prot = protocol(&data);
        assert_eq!(prot.read_binary().unwrap(), b"abcd");

        let opts = DecodeOptions::default().with_string_size_limit(3);
        let mut prot = TCompactInputProtocol::new(&data, &opts);
        assert!(matches!(prot.read_binary().unwrap_err().cause(), ParquetErrorCause::Invalid));

        let truncated = [0x05u8, b'a'];
        let mut prot = protocol(&truncated);
        assert!(matches!(prot.read_binary().unwrap_err().cause(), ParquetErrorCause::Layout));
    }

    #[test]
    fn test_unknown_type_code() {
        let data = [0x1Du8];
        let mut prot = protocol(&data);
        prot.read_struct_begin().unwrap();
        let err = prot.read_field_begin().unwrap_err();
        assert!(err.to_string().contains("unknown compact type code 0x0d"));
    }

    #[test]
    fn test_skip_struct() {
        // struct { 1: binary "hi", 2: list<i64> [1], 3: map<i32,i32> {1: 2}, 4: bool true }
        // followed by a trailing byte that must stay unread.
        let data = [
            0x18u8, 0x02, b'h', b'i', 0x19, 0x16, 0x02, 0x1B, 0x01, 0x55, 0x02, 0x04, 0x11,
            0x00, 0xEE,
        ];
        let mut prot = protocol(&data);
        prot.skip(TType::Struct).unwrap();
        assert_eq!(prot.location(), data.len() - 1);
    }

    #[test]
    fn test_struct_depth_limit() {
        let mut prot = protocol(&[]);
        for _ in 0..MAX_STRUCT_DEPTH {
            prot.read_struct_begin().unwrap();
        }
        assert!(prot.read_struct_begin().is_err());
    }
}
