//! Pipeline orchestration
//!
//! This module provides the public API: each stage as a pure function from
//! text input to text output, plus [`SessionProcessor`], which binds a
//! loaded classifier handle so callers pass the model dependency
//! explicitly instead of resolving artifact paths at predict time.

use crate::classifier::ClassifierHandle;
use crate::error::PipelineError;
use crate::features::FeatureExtractor;
use crate::preprocess::Preprocessor;
use crate::schema;
use crate::types::{Prediction, SessionFeatures};

/// Clean a raw session log: raw CSV text in, cleaned CSV text out.
///
/// Output has one row per input row, in input order.
pub fn preprocess_session(raw_csv: &str) -> Result<String, PipelineError> {
    let rows = schema::read_raw_csv(raw_csv)?;
    let cleaned = Preprocessor::clean(&rows)?;
    schema::write_clean_csv(&cleaned)
}

/// Extract features from a cleaned log and classify them: cleaned CSV text
/// in, single-row result CSV out (header plus one data line).
pub fn analyze_session(
    clean_csv: &str,
    classifier: &ClassifierHandle,
) -> Result<String, PipelineError> {
    let samples = schema::read_clean_csv(clean_csv)?;
    let features = FeatureExtractor::extract(&samples)?;
    let prediction = classifier.predict(&features)?;
    write_result_csv(&features, &prediction)
}

/// Run the full pipeline: raw CSV text in, single-row result CSV out.
pub fn run_session(raw_csv: &str, classifier: &ClassifierHandle) -> Result<String, PipelineError> {
    let cleaned = preprocess_session(raw_csv)?;
    analyze_session(&cleaned, classifier)
}

/// Session processor owning a loaded classifier.
///
/// Use this when classifying more than one session against the same model
/// artifacts; the artifacts are read and validated once.
pub struct SessionProcessor {
    classifier: ClassifierHandle,
}

impl SessionProcessor {
    pub fn new(classifier: ClassifierHandle) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    /// Raw CSV → cleaned CSV. Stateless; exposed here so one processor
    /// covers the whole pipeline surface.
    pub fn preprocess(&self, raw_csv: &str) -> Result<String, PipelineError> {
        preprocess_session(raw_csv)
    }

    /// Cleaned CSV → result CSV.
    pub fn analyze(&self, clean_csv: &str) -> Result<String, PipelineError> {
        analyze_session(clean_csv, &self.classifier)
    }

    /// Raw CSV → result CSV.
    pub fn run(&self, raw_csv: &str) -> Result<String, PipelineError> {
        run_session(raw_csv, &self.classifier)
    }
}

/// Result CSV columns, in order: the feature fields, then
/// `Predicted_Class`, `Confidence_Score`, and one `Prob_<label>` column
/// per class in model label order. NaN values serialize as empty fields.
fn write_result_csv(
    features: &SessionFeatures,
    prediction: &Prediction,
) -> Result<String, PipelineError> {
    let mut header: Vec<String> = SessionFeatures::FIELD_ORDER
        .iter()
        .map(|name| name.to_string())
        .collect();
    header.push("Predicted_Class".to_string());
    header.push("Confidence_Score".to_string());
    for (label, _) in &prediction.probabilities {
        header.push(format!("Prob_{}", label));
    }

    let mut row: Vec<String> = features.values().iter().map(|v| number_cell(*v)).collect();
    row.push(prediction.label.clone());
    row.push(number_cell(prediction.confidence));
    for (_, probability) in &prediction.probabilities {
        row.push(number_cell(*probability));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    writer.write_record(&row)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Parse(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Parse(e.to_string()))
}

fn number_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
