// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_fio_apdu::{is_printable, Encoding};

use super::Error;

/// Field value, as shown to the user when a field is displayed
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Value<'a> {
    /// Printable text
    Text(&'a str),
    /// Unsigned integer
    Number(u64),
    /// Opaque bytes
    Bytes(&'a [u8]),
}

/// Normalised field body, in the form appended to the content digest
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Normalised<'a> {
    value: Value<'a>,
    width: usize,
}

impl<'a> Normalised<'a> {
    /// Parse and normalise a raw field body.
    ///
    /// Numeric bodies are big-endian with 1..=width bytes, and normalise
    /// to the fixed-width little-endian value.
    pub fn parse(encoding: Encoding, body: &'a [u8]) -> Result<Self, Error> {
        let r = match encoding.width() {
            Some(width) => {
                if body.is_empty() || body.len() > width {
                    return Err(Error::MalformedData);
                }

                let v = body.iter().fold(0u64, |a, b| (a << 8) | *b as u64);

                Self {
                    value: Value::Number(v),
                    width,
                }
            }
            None if encoding == Encoding::String => {
                if !is_printable(body) {
                    return Err(Error::MalformedData);
                }
                let s = core::str::from_utf8(body).map_err(|_| Error::MalformedData)?;

                Self {
                    value: Value::Text(s),
                    width: body.len(),
                }
            }
            None => Self {
                value: Value::Bytes(body),
                width: body.len(),
            },
        };

        Ok(r)
    }

    /// Fetch displayable value
    pub fn value(&self) -> Value<'a> {
        self.value
    }

    /// Call `f` with the normalised bytes
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match self.value {
            Value::Number(v) => f(&v.to_le_bytes()[..self.width]),
            Value::Text(s) => f(s.as_bytes()),
            Value::Bytes(b) => f(b),
        }
    }
}
