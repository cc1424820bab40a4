use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::info;
use xray_db::sink::{table_row_counts, top_mentioned_entities};
use xray_db::{AnalysisBundle, EntityType, XRayProjector, write_database, xray_file_name};

use crate::cli::WriteArgs;
use crate::model::XRayRunManifest;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: WriteArgs) -> Result<()> {
    let bundle = load_bundle(&args)?;

    info!(
        bundle = %args.bundle.display(),
        asin = %args.asin,
        entities = bundle.entity_data.len(),
        excerpts = bundle.excerpt_data.len(),
        notable_clips = bundle.notable_clips.len(),
        codec = %bundle.text_codec,
        "loaded analysis bundle"
    );

    if args.dry_run {
        let file_name = xray_file_name(&args.asin)?;
        bundle.validate()?;
        let projection = XRayProjector::new(&bundle).project()?;
        info!(
            file_name = %file_name,
            rows = projection.row_count(),
            people = projection.summary.num_people,
            terms = projection.summary.num_terms,
            "dry-run complete"
        );
        return Ok(());
    }

    let db_path = write_database(&args.output_dir, &args.asin, &bundle, args.replace)
        .with_context(|| format!("failed to write x-ray database for {}", args.asin))?;

    if let Some(manifest_path) = &args.manifest_path {
        let manifest = build_manifest(&args, &bundle, &db_path)?;
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
    }

    Ok(())
}

fn load_bundle(args: &WriteArgs) -> Result<AnalysisBundle> {
    let raw = fs::read(&args.bundle)
        .with_context(|| format!("failed to read {}", args.bundle.display()))?;
    let mut bundle: AnalysisBundle = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", args.bundle.display()))?;

    if let Some(source_url) = &args.source_url {
        bundle.source_url = source_url.clone();
    }
    if let Some(codec) = args.codec {
        bundle.text_codec = codec;
    }

    Ok(bundle)
}

fn build_manifest(
    args: &WriteArgs,
    bundle: &AnalysisBundle,
    db_path: &Path,
) -> Result<XRayRunManifest> {
    let connection = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to reopen {}", db_path.display()))?;

    let table_counts = table_row_counts(&connection)
        .context("failed to count x-ray rows")?
        .into_iter()
        .map(|(table, count)| (table.to_string(), count))
        .collect::<BTreeMap<_, _>>();
    let top_people = top_mentioned_entities(&connection, EntityType::Person)?.unwrap_or_default();
    let top_terms = top_mentioned_entities(&connection, EntityType::Term)?.unwrap_or_default();
    drop(connection);

    Ok(XRayRunManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        asin: args.asin.clone(),
        bundle_path: args.bundle.display().to_string(),
        db_path: db_path.display().to_string(),
        db_sha256: sha256_file(db_path)?,
        text_codec: bundle.text_codec.to_string(),
        table_counts,
        top_people,
        top_terms,
    })
}
