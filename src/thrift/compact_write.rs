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

use super::varint::{encode_varint, zigzag_i16, zigzag_i32, zigzag_i64, MAX_VARINT_LEN};
use super::{
    TFieldIdentifier, TListIdentifier, TType, COMPACT_BOOLEAN_FALSE, COMPACT_BOOLEAN_TRUE,
    MAX_STRUCT_DEPTH,
};
use crate::parquet::error::{fmt_err, ParquetResult};
use std::io::Write;

/// Writes compact-protocol values. Every write returns the number of bytes emitted.
pub struct TCompactOutputProtocol<W: Write> {
    writer: W,
    last_write_field_id: i16,
    write_field_id_stack: [i16; MAX_STRUCT_DEPTH],
    depth: usize,
    // A boolean field header is emitted only once its value is known.
    pending_write_bool_field_identifier: Option<TFieldIdentifier>,
}

impl<W: Write> TCompactOutputProtocol<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_write_field_id: 0,
            write_field_id_stack: [0; MAX_STRUCT_DEPTH],
            depth: 0,
            pending_write_bool_field_identifier: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_struct_begin(&mut self) -> ParquetResult<usize> {
        if self.depth == MAX_STRUCT_DEPTH {
            return Err(fmt_err!(Invalid, "structs nested deeper than {} levels", MAX_STRUCT_DEPTH));
        }
        self.write_field_id_stack[self.depth] = self.last_write_field_id;
        self.depth += 1;
        self.last_write_field_id = 0;
        Ok(0)
    }

    pub fn write_struct_end(&mut self) -> ParquetResult<usize> {
        if self.depth == 0 {
            return Err(fmt_err!(Invalid, "struct end without a matching struct begin"));
        }
        self.depth -= 1;
        self.last_write_field_id = self.write_field_id_stack[self.depth];
        Ok(0)
    }

    pub fn write_field_begin(&mut self, field_type: TType, id: i16) -> ParquetResult<usize> {
        if field_type == TType::Bool {
            if self.pending_write_bool_field_identifier.is_some() {
                return Err(fmt_err!(Invalid, "boolean field {} is still pending", id));
            }
            self.pending_write_bool_field_identifier = Some(TFieldIdentifier::new(field_type, id));
            return Ok(0);
        }
        self.write_field_header(field_type.compact_code(), id)
    }

    pub fn write_field_end(&mut self) -> ParquetResult<usize> {
        if let Some(pending) = self.pending_write_bool_field_identifier {
            return Err(fmt_err!(
                Invalid,
                "boolean field {:?} ended without a value",
                pending.id
            ));
        }
        Ok(0)
    }

    pub fn write_field_stop(&mut self) -> ParquetResult<usize> {
        self.write_byte(0)
    }

    pub fn write_list_begin(&mut self, identifier: &TListIdentifier) -> ParquetResult<usize> {
        let element_code = identifier.element_type.compact_code();
        if identifier.size <= 14 {
            self.write_byte(((identifier.size as u8) << 4) | element_code)
        } else {
            let written = self.write_byte(0xF0 | element_code)?;
            Ok(written + self.write_varint(identifier.size as u64)?)
        }
    }

    pub fn write_list_end(&mut self) -> ParquetResult<usize> {
        Ok(0)
    }

    pub fn write_bool(&mut self, value: bool) -> ParquetResult<usize> {
        let code = if value { COMPACT_BOOLEAN_TRUE } else { COMPACT_BOOLEAN_FALSE };
        match self.pending_write_bool_field_identifier.take() {
            Some(pending) => {
                let id = pending.id.unwrap_or_default();
                self.write_field_header(code, id)
            }
            None => self.write_byte(code),
        }
    }

    pub fn write_i8(&mut self, value: i8) -> ParquetResult<usize> {
        self.write_byte(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> ParquetResult<usize> {
        self.write_varint(zigzag_i16(value) as u64)
    }

    pub fn write_i32(&mut self, value: i32) -> ParquetResult<usize> {
        self.write_varint(zigzag_i32(value) as u64)
    }

    pub fn write_i64(&mut self, value: i64) -> ParquetResult<usize> {
        self.write_varint(zigzag_i64(value))
    }

    pub fn write_double(&mut self, value: f64) -> ParquetResult<usize> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(8)
    }

    pub fn write_binary(&mut self, value: &[u8]) -> ParquetResult<usize> {
        let written = self.write_varint(value.len() as u64)?;
        self.writer.write_all(value)?;
        Ok(written + value.len())
    }

    pub fn write_string(&mut self, value: &str) -> ParquetResult<usize> {
        self.write_binary(value.as_bytes())
    }

    pub fn flush(&mut self) -> ParquetResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_field_header(&mut self, type_code: u8, id: i16) -> ParquetResult<usize> {
        let delta = id.wrapping_sub(self.last_write_field_id);
        let written = if id > self.last_write_field_id && delta <= 15 {
            self.write_byte(((delta as u8) << 4) | type_code)?
        } else {
            self.write_byte(type_code)? + self.write_i16(id)?
        };
        self.last_write_field_id = id;
        Ok(written)
    }

    fn write_varint(&mut self, value: u64) -> ParquetResult<usize> {
        let mut container = [0u8; MAX_VARINT_LEN];
        let used = encode_varint(value, &mut container);
        self.writer.write_all(&container[..used])?;
        Ok(used)
    }

    fn write_byte(&mut self, byte: u8) -> ParquetResult<usize> {
        self.writer.write_all(&[byte])?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parquet::config::DecodeOptions;
    use crate::thrift::TCompactInputProtocol;

    #[test]
    fn test_short_field_header() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_struct_begin().unwrap();
        assert_eq!(prot.write_field_begin(TType::I32, 3).unwrap(), 1);
        assert_eq!(prot.into_inner(), vec![0x35]);
    }

    #[test]
    fn test_long_field_header_on_large_or_backward_jump() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_struct_begin().unwrap();
        prot.write_field_begin(TType::I64, 100).unwrap();
        prot.write_field_begin(TType::I64, 2).unwrap();
        assert_eq!(prot.into_inner(), vec![0x06, 0xC8, 0x01, 0x06, 0x04]);
    }

    #[test]
    fn test_bool_header_deferred() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_struct_begin().unwrap();
        assert_eq!(prot.write_field_begin(TType::Bool, 1).unwrap(), 0);
        assert_eq!(prot.write_bool(true).unwrap(), 1);
        prot.write_field_end().unwrap();
        prot.write_field_begin(TType::Bool, 2).unwrap();
        prot.write_bool(false).unwrap();
        prot.write_field_end().unwrap();
        assert_eq!(prot.into_inner(), vec![0x11, 0x12]);
    }

    #[test]
    fn test_bool_field_without_value() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_struct_begin().unwrap();
        prot.write_field_begin(TType::Bool, 1).unwrap();
        assert!(prot.write_field_end().is_err());
    }

    #[test]
    fn test_list_headers() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_list_begin(&TListIdentifier::new(TType::I32, 14)).unwrap();
        prot.write_list_begin(&TListIdentifier::new(TType::Struct, 15)).unwrap();
        prot.write_list_begin(&TListIdentifier::new(TType::Binary, 300)).unwrap();
        assert_eq!(prot.into_inner(), vec![0xE5, 0xFC, 0x0F, 0xF8, 0xAC, 0x02]);
    }

    #[test]
    fn test_roundtrip_nested_struct() {
        let mut prot = TCompactOutputProtocol::new(Vec::new());
        prot.write_struct_begin().unwrap();
        prot.write_field_begin(TType::I32, 1).unwrap();
        prot.write_i32(-7).unwrap();
        prot.write_field_begin(TType::Struct, 4).unwrap();
        prot.write_struct_begin().unwrap();
        prot.write_field_begin(TType::Binary, 20).unwrap();
        prot.write_string("nested").unwrap();
        prot.write_field_stop().unwrap();
        prot.write_struct_end().unwrap();
        prot.write_field_begin(TType::Double, 5).unwrap();
        prot.write_double(2.5).unwrap();
        prot.write_field_begin(TType::Bool, 6).unwrap();
        prot.write_bool(true).unwrap();
        prot.write_field_stop().unwrap();
        prot.write_struct_end().unwrap();
        let bytes = prot.into_inner();

        let opts = DecodeOptions::default();
        let mut input = TCompactInputProtocol::new(&bytes, &opts);
        input.read_struct_begin().unwrap();
        assert_eq!(input.read_field_begin().unwrap(), TFieldIdentifier::new(TType::I32, 1));
        assert_eq!(input.read_i32().unwrap(), -7);
        assert_eq!(input.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Struct, 4));
        input.read_struct_begin().unwrap();
        assert_eq!(input.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Binary, 20));
        assert_eq!(input.read_string().unwrap(), "nested");
        assert_eq!(input.read_field_begin().unwrap().field_type, TType::Stop);
        input.read_struct_end().unwrap();
        assert_eq!(input.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Double, 5));
        assert_eq!(input.read_double().unwrap(), 2.5);
        assert_eq!(input.read_field_begin().unwrap(), TFieldIdentifier::new(TType::Bool, 6));
        assert!(input.read_bool().unwrap());
        assert_eq!(input.read_field_begin().unwrap().field_type, TType::Stop);
        input.read_struct_end().unwrap();
        assert_eq!(input.location(), bytes.len());
    }
}
