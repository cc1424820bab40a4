//! The table-writer contract the projector emits into.

mod memory;
mod sqlite;

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};

use crate::bundle::EntityType;
use crate::error::SinkError;

pub use memory::{RecordingSink, SinkCall};
pub use sqlite::{
    REFERENCE_URL_STRING_ID, SqliteSink, table_row_counts, top_mentioned_entities,
};

/// One value of a row: codec-encoded text bytes or SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(Vec<u8>),
    Null,
}

pub type Row = Vec<Cell>;

impl Cell {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Cell::Text(bytes) => Some(bytes),
            Cell::Null => None,
        }
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Text(bytes) => ToSqlOutput::Borrowed(ValueRef::Text(bytes)),
            Cell::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// Tables populated row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    BookMetadata,
    Entity,
    EntityDescription,
    EntityExcerpt,
    Excerpt,
    Occurrence,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::BookMetadata,
        Table::Entity,
        Table::EntityDescription,
        Table::EntityExcerpt,
        Table::Excerpt,
        Table::Occurrence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::BookMetadata => "book_metadata",
            Table::Entity => "entity",
            Table::EntityDescription => "entity_description",
            Table::EntityExcerpt => "entity_excerpt",
            Table::Excerpt => "excerpt",
            Table::Occurrence => "occurrence",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::BookMetadata => &[
                "srl",
                "erl",
                "has_images",
                "has_excerpts",
                "show_spoilers_default",
                "num_people",
                "num_terms",
                "num_images",
                "preview_images",
            ],
            Table::Entity => &["id", "label", "loc_label", "type", "count", "has_info_card"],
            Table::EntityDescription => &["text", "source_wildcard", "source", "entity"],
            Table::EntityExcerpt => &["entity", "excerpt"],
            Table::Excerpt => &["id", "start", "length", "image", "related_entities", "goto"],
            Table::Occurrence => &["entity", "start", "length"],
        }
    }
}

/// Pre-seeded single values the projector overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    /// The book's external reference URL in the `string` table.
    ReferenceUrl,
    /// `type.top_mentioned_entities` for one entity type.
    TopMentioned(EntityType),
}

/// Append-only writer for the X-Ray tables.
///
/// Lifecycle is strictly `insert_rows`/`update_scalar` → `create_indices` →
/// `save` → `close`.
pub trait TableSink {
    fn insert_rows(&mut self, table: Table, rows: Vec<Row>) -> Result<(), SinkError>;

    fn update_scalar(&mut self, field: ScalarField, value: Vec<u8>) -> Result<(), SinkError>;

    fn create_indices(&mut self) -> Result<(), SinkError>;

    fn save(&mut self) -> Result<(), SinkError>;

    fn close(self) -> Result<(), SinkError>
    where
        Self: Sized;
}
