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

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Cause of a parquet error.
#[derive(Debug, Clone)]
pub enum ParquetErrorCause {
    /// Malformed input: bad magic, broken varints, negative sizes, missing required fields.
    Invalid,

    /// Well-formed input outside the flat, uncompressed subset this crate reads.
    Unsupported,

    /// An encoding the decoders do not implement.
    NotImplemented,

    /// A read would run past the page, the column chunk or the buffer.
    Layout,

    /// A bounded record pool ran out of slots.
    Pool,

    Utf8Decode(std::str::Utf8Error),
    Io(Arc<std::io::Error>),
}

impl ParquetErrorCause {
    pub fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParquetErrorCause::Utf8Decode(err) => Some(err),
            ParquetErrorCause::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Stable negative code handed to hosts that can't carry a Rust error.
    pub fn code(&self) -> i32 {
        match self {
            ParquetErrorCause::Invalid => -1,
            ParquetErrorCause::Unsupported => -2,
            ParquetErrorCause::NotImplemented => -3,
            ParquetErrorCause::Layout => -4,
            ParquetErrorCause::Pool => -5,
            ParquetErrorCause::Utf8Decode(_) => -6,
            ParquetErrorCause::Io(_) => -7,
        }
    }

    #[track_caller]
    pub fn into_err(self) -> ParquetError {
        ParquetError::new(self)
    }
}

/// An error reading or writing parquet.
#[derive(Clone)]
pub struct ParquetError {
    /// What caused the error.
    cause: ParquetErrorCause,

    /// Initial message (if any) and
    /// stack of additional contextual information,
    /// printed in reverse order.
    context: Vec<String>,

    backtrace: Arc<Backtrace>,
}

impl ParquetError {
    #[track_caller]
    pub fn new(cause: ParquetErrorCause) -> Self {
        Self {
            cause,
            context: Vec::new(),
            backtrace: Backtrace::capture().into(),
        }
    }

    #[track_caller]
    pub fn with_descr(cause: ParquetErrorCause, descr: impl Into<String>) -> Self {
        Self {
            cause,
            context: vec![descr.into()],
            backtrace: Backtrace::capture().into(),
        }
    }

    pub fn cause(&self) -> &ParquetErrorCause {
        &self.cause
    }

    pub fn code(&self) -> i32 {
        self.cause.code()
    }

    pub fn add_context(&mut self, context: impl Into<String>) {
        self.context.push(context.into());
    }

    fn fmt_msg(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Print the context first in reverse order.
        let source = self.cause.source();
        let last_index = self.context.len().saturating_sub(1);
        for (index, context) in self.context.iter().rev().enumerate() {
            if index == last_index {
                write!(f, "{}", context)?;
            } else {
                write!(f, "{}: ", context)?;
            }
        }
        if let Some(source) = source {
            if self.context.is_empty() {
                write!(f, "{}", source)?;
            } else {
                write!(f, ": {}", source)?;
            }
        }
        Ok(())
    }
}

impl Debug for ParquetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ParquetError\n    Cause: {:?}", self.cause)?;
        writeln!(f, "    Context:")?;
        for line in self.context.iter().rev() {
            writeln!(f, "        {}", line)?;
        }
        if self.backtrace.status() == BacktraceStatus::Captured {
            writeln!(f, "    Backtrace:\n{}", self.backtrace)?;
        }
        Ok(())
    }
}

impl Display for ParquetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_msg(f)
    }
}

impl std::error::Error for ParquetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.source()
    }
}

impl From<std::io::Error> for ParquetError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ParquetErrorCause::Io(Arc::new(e)))
    }
}

impl From<std::str::Utf8Error> for ParquetError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::new(ParquetErrorCause::Utf8Decode(e))
    }
}

pub type ParquetResult<T> = Result<T, ParquetError>;

pub trait ParquetErrorExt<T> {
    fn context(self, context: &str) -> Self;
    fn with_context<F>(self, context: F) -> Self
    where
        F: FnOnce(&mut ParquetError) -> String;
}

impl<T> ParquetErrorExt<T> for ParquetResult<T> {
    /// Add a layer of context to the error.
    /// The `context: &str` is copied into a `String` iff the error is an `Err`.
    fn context(self, context: &str) -> Self {
        match self {
            Ok(val) => Ok(val),
            Err(mut err) => {
                err.add_context(context);
                Err(err)
            }
        }
    }

    /// Lazily add a layer of context to the error.
    fn with_context<F>(self, context: F) -> Self
    where
        F: FnOnce(&mut ParquetError) -> String,
    {
        match self {
            Ok(val) => Ok(val),
            Err(mut err) => {
                let context = context(&mut err);
                err.add_context(context);
                Err(err)
            }
        }
    }
}

macro_rules! fmt_err {
    ($cause: ident, $($arg:tt)*) => {
        crate::parquet::error::ParquetError::with_descr(
            crate::parquet::error::ParquetErrorCause::$cause,
            format!($($arg)*))
    };
}

pub(crate) use fmt_err;
