//! Reference feature JSON files

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::analysis::result::ReferenceFeature;
use crate::error::AnalysisError;

/// Read a reference record
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the file cannot be read or is
/// not a valid reference record.
pub fn load_reference(path: impl AsRef<Path>) -> Result<ReferenceFeature, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Loading reference features from {}", path.display());
    let file = File::open(path)
        .map_err(|e| AnalysisError::ProcessingError(format!("{}: {}", path.display(), e)))?;
    let reference: ReferenceFeature = serde_json::from_reader(BufReader::new(file))?;

    if reference.times.len() != reference.f0_log.len() {
        return Err(AnalysisError::ProcessingError(format!(
            "{}: {} times for {} contour frames",
            path.display(),
            reference.times.len(),
            reference.f0_log.len()
        )));
    }
    Ok(reference)
}

/// Write a reference record as compact JSON
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the file cannot be written.
pub fn save_reference(path: impl AsRef<Path>, reference: &ReferenceFeature) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    log::debug!(
        "Saving reference {} ({} frames) to {}",
        reference.audio_id,
        reference.f0_log.len(),
        path.display()
    );
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, reference)?;
    writer.flush()?;
    Ok(())
}
