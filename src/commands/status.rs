use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{info, warn};
use xray_db::EntityType;
use xray_db::sink::{table_row_counts, top_mentioned_entities};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = &args.db_path;
    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    for (table, count) in table_row_counts(&conn).context("failed to count x-ray rows")? {
        info!(table, rows = count, "table status");
    }

    let metadata = conn
        .query_row(
            "
            SELECT CAST(erl AS TEXT), CAST(has_excerpts AS TEXT),
                   CAST(num_people AS TEXT), CAST(num_terms AS TEXT)
            FROM book_metadata
            LIMIT 1
            ",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    match metadata {
        Some((erl, has_excerpts, num_people, num_terms)) => info!(
            erl = %erl.unwrap_or_default(),
            has_excerpts = %has_excerpts.unwrap_or_default(),
            num_people = %num_people.unwrap_or_default(),
            num_terms = %num_terms.unwrap_or_default(),
            "book metadata"
        ),
        None => warn!(path = %db_path.display(), "book metadata row missing"),
    }

    for entity_type in EntityType::ALL {
        let ranked = top_mentioned_entities(&conn, entity_type)?.unwrap_or_default();
        info!(
            entity_type = entity_type.as_str(),
            top_mentioned = %ranked,
            "type ranking"
        );
    }

    Ok(())
}
