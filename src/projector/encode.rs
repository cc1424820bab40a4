use std::fmt::Display;

use crate::codec::TextCodec;
use crate::error::{Error, Result};
use crate::sink::Cell;

/// Applies the book codec to every value bound for the sink.
#[derive(Debug, Clone, Copy)]
pub(super) struct Encoder {
    codec: TextCodec,
}

impl Encoder {
    pub(super) fn new(codec: TextCodec) -> Self {
        Self { codec }
    }

    pub(super) fn bytes(&self, value: &str, field: impl FnOnce() -> String) -> Result<Vec<u8>> {
        self.codec
            .encode(value)
            .ok_or_else(|| Error::EncodingFailure {
                field: field(),
                codec: self.codec,
            })
    }

    pub(super) fn text(&self, value: &str, field: impl FnOnce() -> String) -> Result<Cell> {
        self.bytes(value, field).map(Cell::Text)
    }

    // Every supported codec is an ASCII superset, so decimal text needs no lookup.
    pub(super) fn number(&self, value: impl Display) -> Cell {
        Cell::Text(value.to_string().into_bytes())
    }

    pub(super) fn flag(&self, value: bool) -> Cell {
        self.number(u8::from(value))
    }

    pub(super) fn id_list(&self, ids: impl IntoIterator<Item = i64>) -> Vec<u8> {
        ids.into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
            .into_bytes()
    }
}
