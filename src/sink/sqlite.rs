use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use super::{Cell, Row, ScalarField, Table, TableSink};
use crate::bundle::EntityType;
use crate::error::SinkError;

/// `string.id` of the book's external reference URL.
pub const REFERENCE_URL_STRING_ID: i64 = 15;

const SCHEMA_SQL: &str = "
    CREATE TABLE book_metadata (
      srl INTEGER,
      erl INTEGER,
      has_images TINYINT,
      has_excerpts TINYINT,
      show_spoilers_default TINYINT,
      num_people INTEGER,
      num_terms INTEGER,
      num_images INTEGER,
      preview_images TEXT
    );

    CREATE TABLE entity (
      id INTEGER PRIMARY KEY,
      label TEXT,
      loc_label INTEGER,
      type INTEGER,
      count INTEGER,
      has_info_card TINYINT
    );

    CREATE TABLE entity_description (
      text TEXT,
      source_wildcard TEXT,
      source INTEGER,
      entity INTEGER,
      PRIMARY KEY(entity)
    );

    CREATE TABLE entity_excerpt (
      entity INTEGER,
      excerpt INTEGER
    );

    CREATE TABLE excerpt (
      id INTEGER PRIMARY KEY,
      start INTEGER,
      length INTEGER,
      image TEXT,
      related_entities TEXT,
      goto INTEGER
    );

    CREATE TABLE occurrence (
      entity INTEGER,
      start INTEGER,
      length INTEGER
    );

    CREATE TABLE source (
      id INTEGER PRIMARY KEY,
      label INTEGER,
      url INTEGER,
      license_label INTEGER,
      license_url INTEGER
    );

    CREATE TABLE string (
      id INTEGER,
      language TEXT,
      text TEXT
    );

    CREATE TABLE type (
      id INTEGER PRIMARY KEY,
      label INTEGER,
      singular_label INTEGER,
      icon INTEGER,
      top_mentioned_entities TEXT
    );
";

// Label strings referenced by `source` and `type`; id 15 is overwritten with
// the book URL and is what the description source 2 points at.
const SEED_SQL: &str = "
    INSERT INTO string(id, language, text) VALUES
      (1, 'en', 'People'),
      (2, 'en', 'Person'),
      (3, 'en', 'Terms'),
      (4, 'en', 'Term'),
      (5, 'en', 'Kindle Store'),
      (6, 'en', 'Wikipedia'),
      (7, 'en', 'Goodreads'),
      (8, 'en', 'Notable Clips'),
      (15, 'en', '');

    INSERT INTO source(id, label, url, license_label, license_url) VALUES
      (0, 5, NULL, NULL, NULL),
      (1, 6, NULL, NULL, NULL),
      (2, 7, 15, NULL, NULL);

    INSERT INTO type(id, label, singular_label, icon, top_mentioned_entities) VALUES
      (1, 1, 2, 1, ''),
      (2, 3, 4, 2, '');
";

const INDEX_SQL: &str = "
    CREATE INDEX idx_occurrence_start ON occurrence(start ASC);
    CREATE INDEX idx_entity_type ON entity(type ASC);
    CREATE INDEX idx_entity_excerpt ON entity_excerpt(entity ASC);
";

const SEEDED_TABLES: [&str; 3] = ["source", "string", "type"];

/// Writes the X-Ray container as a SQLite file.
///
/// Schema creation, seeding and every insert run inside one transaction that
/// only [`TableSink::save`] commits; dropping the sink unsaved leaves an
/// empty database.
pub struct SqliteSink {
    connection: Connection,
    path: Option<PathBuf>,
    saved: bool,
}

impl SqliteSink {
    pub fn create(path: &Path, replace: bool) -> Result<Self, SinkError> {
        if path.exists() {
            if !replace {
                return Err(SinkError::AlreadyExists(path.to_path_buf()));
            }
            fs::remove_file(path)?;
        }

        let connection = Connection::open(path)?;
        Self::initialize(connection, Some(path.to_path_buf()))
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(connection: Connection, path: Option<PathBuf>) -> Result<Self, SinkError> {
        configure_connection(&connection)?;
        connection.execute_batch("BEGIN")?;
        connection.execute_batch(SCHEMA_SQL)?;
        connection.execute_batch(SEED_SQL)?;

        debug!(path = ?path, "initialized x-ray schema");

        Ok(Self {
            connection,
            path,
            saved: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn configure_connection(connection: &Connection) -> Result<(), SinkError> {
    // The container must stay a single self-contained file.
    connection.pragma_update(None, "journal_mode", "DELETE")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

fn insert_sql(table: Table) -> String {
    let columns = table.columns();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {}({}) VALUES({})",
        table.as_str(),
        columns.join(", "),
        placeholders
    )
}

impl TableSink for SqliteSink {
    fn insert_rows(&mut self, table: Table, rows: Vec<Row>) -> Result<(), SinkError> {
        let expected = table.columns().len();
        let mut statement = self.connection.prepare_cached(&insert_sql(table))?;

        for row in &rows {
            if row.len() != expected {
                return Err(SinkError::Rejected(format!(
                    "{} row has {} values, expected {expected}",
                    table.as_str(),
                    row.len()
                )));
            }
            statement.execute(params_from_iter(row.iter()))?;
        }

        debug!(table = table.as_str(), rows = rows.len(), "inserted rows");
        Ok(())
    }

    fn update_scalar(&mut self, field: ScalarField, value: Vec<u8>) -> Result<(), SinkError> {
        let value = Cell::Text(value);
        let updated = match field {
            ScalarField::ReferenceUrl => self.connection.execute(
                "UPDATE string SET text = ?1 WHERE id = ?2",
                params![value, REFERENCE_URL_STRING_ID],
            )?,
            ScalarField::TopMentioned(entity_type) => self.connection.execute(
                "UPDATE type SET top_mentioned_entities = ?1 WHERE id = ?2",
                params![value, entity_type.code()],
            )?,
        };

        if updated != 1 {
            return Err(SinkError::Rejected(format!(
                "scalar update {field:?} touched {updated} rows"
            )));
        }
        Ok(())
    }

    fn create_indices(&mut self) -> Result<(), SinkError> {
        self.connection.execute_batch(INDEX_SQL)?;
        Ok(())
    }

    fn save(&mut self) -> Result<(), SinkError> {
        if self.saved {
            return Err(SinkError::AlreadySaved);
        }
        self.connection.execute_batch("COMMIT")?;
        self.saved = true;
        Ok(())
    }

    fn close(self) -> Result<(), SinkError> {
        self.connection.close().map_err(|(_, err)| SinkError::from(err))
    }
}

/// Row counts for every X-Ray table, populated and seeded alike.
pub fn table_row_counts(connection: &Connection) -> Result<Vec<(&'static str, i64)>, SinkError> {
    let names = Table::ALL
        .iter()
        .map(|table| table.as_str())
        .chain(SEEDED_TABLES);

    let mut counts = Vec::new();
    for name in names {
        let count = connection.query_row(&format!("SELECT COUNT(*) FROM {name}"), [], |row| {
            row.get(0)
        })?;
        counts.push((name, count));
    }
    Ok(counts)
}

/// The comma-joined ranking stored for `entity_type`, if the type row exists.
pub fn top_mentioned_entities(
    connection: &Connection,
    entity_type: EntityType,
) -> Result<Option<String>, SinkError> {
    let value = connection
        .query_row(
            "SELECT CAST(top_mentioned_entities AS TEXT) FROM type WHERE id = ?1",
            [entity_type.code()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.as_bytes().to_vec())
    }

    #[test]
    fn new_sink_seeds_lookup_tables() {
        let sink = SqliteSink::in_memory().expect("in-memory sink should open");
        let counts = table_row_counts(sink.connection()).expect("counts");

        let lookup = |name: &str| {
            counts
                .iter()
                .find(|(table, _)| *table == name)
                .map(|(_, count)| *count)
        };
        assert_eq!(lookup("entity"), Some(0));
        assert_eq!(lookup("type"), Some(2));
        assert_eq!(lookup("source"), Some(3));
        assert_eq!(lookup("string"), Some(9));
    }

    #[test]
    fn insert_rows_binds_encoded_text_and_nulls() {
        let mut sink = SqliteSink::in_memory().expect("in-memory sink should open");
        sink.insert_rows(
            Table::Excerpt,
            vec![vec![
                text("4"),
                text("120"),
                text("30"),
                text(""),
                text("10,11"),
                Cell::Null,
            ]],
        )
        .expect("insert should succeed");

        let (id, related, goto): (i64, String, Option<i64>) = sink
            .connection()
            .query_row(
                "SELECT id, related_entities, goto FROM excerpt",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("excerpt row");
        assert_eq!(id, 4);
        assert_eq!(related, "10,11");
        assert_eq!(goto, None);
    }

    #[test]
    fn insert_rows_rejects_wrong_arity() {
        let mut sink = SqliteSink::in_memory().expect("in-memory sink should open");
        let err = sink
            .insert_rows(Table::Occurrence, vec![vec![text("1"), text("2")]])
            .expect_err("short row must be rejected");
        assert!(matches!(err, SinkError::Rejected(_)));
    }

    #[test]
    fn scalar_updates_land_in_seeded_rows() {
        let mut sink = SqliteSink::in_memory().expect("in-memory sink should open");
        sink.update_scalar(ScalarField::ReferenceUrl, b"https://example.test/b".to_vec())
            .expect("url update");
        sink.update_scalar(
            ScalarField::TopMentioned(EntityType::Term),
            b"7,3".to_vec(),
        )
        .expect("type update");

        let url: String = sink
            .connection()
            .query_row(
                "SELECT text FROM string WHERE id = ?1",
                [REFERENCE_URL_STRING_ID],
                |row| row.get(0),
            )
            .expect("url row");
        assert_eq!(url, "https://example.test/b");
        assert_eq!(
            top_mentioned_entities(sink.connection(), EntityType::Term).expect("query"),
            Some("7,3".to_string())
        );
        assert_eq!(
            top_mentioned_entities(sink.connection(), EntityType::Person).expect("query"),
            Some(String::new())
        );
    }

    #[test]
    fn save_commits_and_rejects_a_second_save() {
        let mut sink = SqliteSink::in_memory().expect("in-memory sink should open");
        sink.create_indices().expect("indices");
        sink.save().expect("first save");
        assert!(matches!(sink.save(), Err(SinkError::AlreadySaved)));

        let index_count: i64 = sink
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%'",
                [],
                |row| row.get(0),
            )
            .expect("index count");
        assert_eq!(index_count, 3);
        sink.close().expect("close");
    }

    #[test]
    fn create_refuses_to_overwrite_without_replace() {
        let dir = std::env::temp_dir().join(format!("xray-sink-test-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("existing.asc");
        fs::write(&path, b"occupied").expect("seed file");

        assert!(matches!(
            SqliteSink::create(&path, false),
            Err(SinkError::AlreadyExists(_))
        ));

        let sink = SqliteSink::create(&path, true).expect("replace should succeed");
        assert_eq!(sink.path(), Some(path.as_path()));
        sink.close().expect("close");

        fs::remove_dir_all(&dir).expect("cleanup");
    }
}
