//! CSV emission of the assembled dataset.

use anyhow::{Context, Result};
use core_ingest::Dataset;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes `dataset` to `path`, creating parent directories. Returns the
/// number of data rows written.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(file, dataset).with_context(|| format!("Failed to write {}", path.display()))
}

/// Header plus one record per row. Attribute columns are present only when
/// the dataset joined attributes.
pub fn write_records<W: Write>(writer: W, dataset: &Dataset) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.header())?;

    let mut written = 0;
    for record in dataset.records() {
        wtr.write_record(&record)?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}
