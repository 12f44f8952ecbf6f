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

use crate::parquet::error::{fmt_err, ParquetError, ParquetResult};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
    Closed,
}

/// The fully-resident bytes of one file.
///
/// Every decoder borrows from [`ResidentFile::bytes`], so nothing on the decode
/// path performs I/O once the file is open.
pub struct ResidentFile {
    backing: Backing,
}

impl ResidentFile {
    /// Memory-maps `path`.
    pub fn open(path: impl AsRef<Path>) -> ParquetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            let mut err = ParquetError::from(e);
            err.add_context(format!("could not open {}", path.display()));
            err
        })?;
        let size = file.metadata()?.len();
        if size == 0 {
            // Mapping an empty file fails on some platforms.
            return Ok(Self::from_vec(Vec::new()));
        }
        // SAFETY: the mapping is read-only and the file is expected not to change while open.
        let mmap = unsafe { Mmap::map(&file)? };
        log::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
        Ok(Self { backing: Backing::Mapped(mmap) })
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { backing: Backing::Owned(bytes) }
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => &mmap[..],
            Backing::Owned(vec) => vec.as_slice(),
            Backing::Closed => &[],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes().len()
    }

    /// Hints that `offset..offset + len` is about to be decoded.
    pub fn prefetch(&self, offset: usize, len: usize) -> ParquetResult<()> {
        let size = self.size();
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(fmt_err!(
                Layout,
                "prefetch range {}..{} exceeds file size {}",
                offset,
                offset.saturating_add(len),
                size
            ));
        }
        #[cfg(unix)]
        if let Backing::Mapped(mmap) = &self.backing {
            if len > 0 {
                mmap.advise_range(memmap2::Advice::WillNeed, offset, len)?;
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.backing, Backing::Closed)
    }

    pub fn close(&mut self) {
        self.backing = Backing::Closed;
    }
}

/// A read cursor over a resident buffer.
///
/// Reads either copy into a caller buffer ([`SliceCursor::read_all`]) or hand
/// out views that borrow the underlying buffer for `'a` ([`SliceCursor::view`]).
#[derive(Debug, Clone, Copy)]
pub struct SliceCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn location(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn set_location(&mut self, offset: usize) -> ParquetResult<()> {
        if offset > self.data.len() {
            return Err(fmt_err!(
                Layout,
                "offset {} is past the end of the buffer ({} bytes)",
                offset,
                self.data.len()
            ));
        }
        self.pos = offset;
        Ok(())
    }

    /// Copies up to `buf.len()` bytes, returning how many were copied.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.pos..self.pos + count]);
        self.pos += count;
        count
    }

    /// Copies exactly `buf.len()` bytes or fails without moving the cursor.
    pub fn read_all(&mut self, buf: &mut [u8]) -> ParquetResult<()> {
        let src = self.view(buf.len())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    /// Returns the next `len` bytes without copying and advances past them.
    #[inline]
    pub fn view(&mut self, len: usize) -> ParquetResult<&'a [u8]> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.data.len() => {
                let res = &self.data[self.pos..end];
                self.pos = end;
                Ok(res)
            }
            _ => Err(fmt_err!(
                Layout,
                "cannot read {} bytes at offset {}, buffer has {} bytes",
                len,
                self.pos,
                self.data.len()
            )),
        }
    }

    #[inline]
    pub fn read_u8(&mut self) -> ParquetResult<u8> {
        Ok(self.view(1)?[0])
    }

    pub fn skip(&mut self, len: usize) -> ParquetResult<()> {
        self.view(len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parquet::error::ParquetErrorCause;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cursor_view_and_location() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = SliceCursor::new(&data);
        assert_eq!(cursor.view(2).unwrap(), &[1, 2]);
        assert_eq!(cursor.location(), 2);
        cursor.set_location(4).unwrap();
        assert_eq!(cursor.read_u8().unwrap(), 5);
        assert_eq!(cursor.remaining(), 0);

        let err = cursor.view(1).unwrap_err();
        assert!(matches!(err.cause(), ParquetErrorCause::Layout));
        assert!(cursor.set_location(6).is_err());
    }

    #[test]
    fn test_cursor_read_partial_and_read_all() {
        let data = [9u8, 8, 7];
        let mut cursor = SliceCursor::new(&data);
        let mut buf = [0u8; 2];
        cursor.read_all(&mut buf).unwrap();
        assert_eq!(buf, [9, 8]);

        let mut big = [0u8; 4];
        assert_eq!(cursor.read(&mut big), 1);
        assert_eq!(big[0], 7);
        assert!(cursor.read_all(&mut buf).is_err());
    }

    #[test]
    fn test_resident_file_mapped() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"PAR1hello").expect("write");
        file.flush().expect("flush");

        let mut resident = ResidentFile::open(file.path()).unwrap();
        assert_eq!(resident.size(), 9);
        assert_eq!(&resident.bytes()[..4], b"PAR1");
        resident.prefetch(4, 5).unwrap();
        assert!(resident.prefetch(4, 6).is_err());

        resident.close();
        assert!(resident.is_closed());
        assert_eq!(resident.size(), 0);
    }

    #[test]
    fn test_resident_file_missing() {
        let err = ResidentFile::open("/definitely/not/here.parquet")
            .err()
            .expect("open should fail");
        assert!(matches!(err.cause(), ParquetErrorCause::Io(_)));
        assert!(err.to_string().starts_with("could not open"));
    }
}
