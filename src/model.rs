use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct XRayRunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub asin: String,
    pub bundle_path: String,
    pub db_path: String,
    pub db_sha256: String,
    pub text_codec: String,
    pub table_counts: BTreeMap<String, i64>,
    pub top_people: String,
    pub top_terms: String,
}
