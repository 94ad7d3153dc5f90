//! CSV column contracts and (de)serialization
//!
//! Exact header names for the raw device log and the cleaned session log,
//! header validation, and helpers to read/write each format. Schema errors
//! (missing or renamed columns) are distinguished from parse errors
//! (non-numeric fields) so failures are attributable.

use crate::error::PipelineError;
use crate::types::{CleanRecord, RawRecord, SessionSample};

/// Required columns of the raw device log.
pub const RAW_COLUMNS: [&str; 7] = [
    "Timestamp (UTC)",
    "Right Wheel Displacement",
    "Left Wheel Displacement",
    "Joystick X",
    "Joystick Y",
    "Right Wheel Velocity",
    "Left Wheel Velocity",
];

/// Columns of the cleaned session log, in output order.
pub const CLEAN_COLUMNS: [&str; 13] = [
    "Timestamp (UTC)",
    "Elapsed Time (s)",
    "Elapsed Time (min)",
    "WheelDispR",
    "WheelDispL",
    "JoyX",
    "JoyY",
    "WheelVelR",
    "WheelVelL",
    "JoyMag",
    "VelMag",
    "DispMag",
    "AvgVel",
];

/// Cleaned columns the feature extractor requires. Extra columns are
/// ignored on read.
pub const EXTRACTOR_COLUMNS: [&str; 9] = [
    "Elapsed Time (s)",
    "JoyX",
    "JoyY",
    "WheelVelL",
    "WheelVelR",
    "WheelDispL",
    "WheelDispR",
    "JoyMag",
    "VelMag",
];

/// Check that every required column is present in the header row.
fn validate_headers(
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), PipelineError> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| !headers.iter().any(|h| h == **name))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema(missing.join(", ")))
    }
}

/// Parse a raw device log. Validates the header row, then deserializes
/// every data row; a non-numeric field fails with the offending line
/// number.
pub fn read_raw_csv(input: &str) -> Result<Vec<RawRecord>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(input.as_bytes());
    let headers = reader.headers()?.clone();
    validate_headers(&headers, &RAW_COLUMNS)?;

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<RawRecord>().enumerate() {
        let record = result
            .map_err(|e| PipelineError::Parse(format!("line {}: {}", index + 2, e)))?;
        rows.push(record);
    }

    if rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(rows)
}

/// Parse a cleaned session log into extractor samples.
pub fn read_clean_csv(input: &str) -> Result<Vec<SessionSample>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(input.as_bytes());
    let headers = reader.headers()?.clone();
    validate_headers(&headers, &EXTRACTOR_COLUMNS)?;

    let mut samples = Vec::new();
    for (index, result) in reader.deserialize::<SessionSample>().enumerate() {
        let sample = result
            .map_err(|e| PipelineError::Parse(format!("line {}: {}", index + 2, e)))?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(samples)
}

/// Serialize cleaned records to CSV text. The header row comes from the
/// serde renames on [`CleanRecord`], so the column order matches
/// [`CLEAN_COLUMNS`].
pub fn write_clean_csv(records: &[CleanRecord]) -> Result<String, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Parse(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Parse(e.to_string()))
}
