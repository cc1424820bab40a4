//! Places the projected database on disk.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::info;

use crate::bundle::AnalysisBundle;
use crate::error::{Error, Result, SinkError};
use crate::projector::XRayProjector;
use crate::sink::{SqliteSink, TableSink};

const ASIN_PATTERN: &str = r"^[A-Z0-9]{10}$";

/// `XRAY.entities.<ASIN>.asc`, the name the reader looks up per book.
pub fn xray_file_name(asin: &str) -> Result<String> {
    let pattern = Regex::new(ASIN_PATTERN)?;
    if !pattern.is_match(asin) {
        return Err(Error::InvalidAsin(asin.to_string()));
    }
    Ok(format!("XRAY.entities.{asin}.asc"))
}

pub fn xray_path(xray_directory: &Path, asin: &str) -> Result<PathBuf> {
    Ok(xray_directory.join(xray_file_name(asin)?))
}

/// Validates `bundle`, writes it to a fresh database under `xray_directory`
/// and returns the file path.
///
/// On failure the partially created file is removed.
pub fn write_database(
    xray_directory: &Path,
    asin: &str,
    bundle: &AnalysisBundle,
    replace: bool,
) -> Result<PathBuf> {
    let path = xray_path(xray_directory, asin)?;
    bundle.validate()?;

    fs::create_dir_all(xray_directory).map_err(SinkError::from)?;

    let mut sink = SqliteSink::create(&path, replace)?;
    let written = XRayProjector::new(bundle)
        .write(&mut sink)
        .and_then(|()| sink.save().map_err(Error::from));

    if let Err(err) = written {
        drop(sink);
        let _ = fs::remove_file(&path);
        return Err(err);
    }
    sink.close()?;

    info!(path = %path.display(), asin, "wrote x-ray database");
    Ok(path)
}
