//! Core types for the mobikin pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw log records, cleaned records, bouts, the session feature
//! vector, and the classifier prediction.

use serde::{Deserialize, Serialize};

/// Nominal sampling rate of the device log, in Hz.
///
/// This is a precondition, not something the pipeline re-derives from
/// timestamps: all tick-based aggregates (active time, bout durations,
/// the bout close gap) assume the input was sampled at this rate.
pub const TICK_HZ: f64 = 120.0;

/// Duration of one sampling tick, in seconds.
pub const TICK_SECONDS: f64 = 1.0 / TICK_HZ;

/// One row of the raw session log, as written by the device.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Timestamp (UTC)")]
    pub timestamp: String,
    #[serde(rename = "Right Wheel Displacement")]
    pub wheel_disp_r: f64,
    #[serde(rename = "Left Wheel Displacement")]
    pub wheel_disp_l: f64,
    #[serde(rename = "Joystick X")]
    pub joy_x: f64,
    #[serde(rename = "Joystick Y")]
    pub joy_y: f64,
    #[serde(rename = "Right Wheel Velocity")]
    pub wheel_vel_r: f64,
    #[serde(rename = "Left Wheel Velocity")]
    pub wheel_vel_l: f64,
}

/// One row of the cleaned session log.
///
/// Joystick and velocity columns hold the deadzoned, smoothed values;
/// displacement columns are copied verbatim from the raw log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanRecord {
    #[serde(rename = "Timestamp (UTC)")]
    pub timestamp: String,
    #[serde(rename = "Elapsed Time (s)")]
    pub elapsed_s: f64,
    #[serde(rename = "Elapsed Time (min)")]
    pub elapsed_min: f64,
    #[serde(rename = "WheelDispR")]
    pub wheel_disp_r: f64,
    #[serde(rename = "WheelDispL")]
    pub wheel_disp_l: f64,
    #[serde(rename = "JoyX")]
    pub joy_x: f64,
    #[serde(rename = "JoyY")]
    pub joy_y: f64,
    #[serde(rename = "WheelVelR")]
    pub wheel_vel_r: f64,
    #[serde(rename = "WheelVelL")]
    pub wheel_vel_l: f64,
    #[serde(rename = "JoyMag")]
    pub joy_mag: f64,
    #[serde(rename = "VelMag")]
    pub vel_mag: f64,
    #[serde(rename = "DispMag")]
    pub disp_mag: f64,
    #[serde(rename = "AvgVel")]
    pub avg_vel: f64,
}

/// The subset of cleaned columns the feature extractor reads.
///
/// Deserialized by header name, so extra columns in the cleaned CSV are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSample {
    #[serde(rename = "Elapsed Time (s)")]
    pub elapsed_s: f64,
    #[serde(rename = "JoyX")]
    pub joy_x: f64,
    #[serde(rename = "JoyY")]
    pub joy_y: f64,
    #[serde(rename = "WheelVelL")]
    pub wheel_vel_l: f64,
    #[serde(rename = "WheelVelR")]
    pub wheel_vel_r: f64,
    #[serde(rename = "WheelDispL")]
    pub wheel_disp_l: f64,
    #[serde(rename = "WheelDispR")]
    pub wheel_disp_r: f64,
    #[serde(rename = "JoyMag")]
    pub joy_mag: f64,
    #[serde(rename = "VelMag")]
    pub vel_mag: f64,
}

/// Classification of a bout by whether it produced wheel motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoutKind {
    /// The joystick engagement produced meaningful wheel motion
    Movement,
    /// The joystick was engaged but the wheels did not respond
    Attempt,
}

/// A contiguous interval of nonzero joystick engagement, bounded by a
/// minimum inactivity gap and validated by a peak-magnitude threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Bout {
    /// Tick index of the first nonzero-magnitude sample
    pub start: usize,
    /// One past the tick index of the last nonzero-magnitude sample
    pub end: usize,
    /// Bout duration in seconds (span ticks at the nominal rate)
    pub duration_s: f64,
    /// Peak joystick magnitude within the span
    pub peak_joy_mag: f64,
    /// Mean wheel-velocity magnitude over the span's nonzero-joystick ticks
    pub mean_vel_mag: f64,
    pub kind: BoutKind,
}

impl Bout {
    pub fn is_movement(&self) -> bool {
        self.kind == BoutKind::Movement
    }
}

/// Session-level feature vector.
///
/// The field set and its order are a stable contract: the classifier's
/// feature-list artifact names fields from this set, and the result CSV
/// emits them in [`SessionFeatures::FIELD_ORDER`]. Undefined aggregates
/// (zero bouts, zero session time, no joystick engagement) are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionFeatures {
    pub session_time_min: f64,
    pub active_time_min: f64,
    pub moving_time_min: f64,
    pub avg_path_length: f64,
    pub hist_fr: f64,
    pub hist_f: f64,
    pub hist_fl: f64,
    pub hist_bl: f64,
    pub hist_b: f64,
    pub hist_br: f64,
    pub path_ft: f64,
    pub hist_joy_per6_fr: f64,
    pub hist_joy_per6_f: f64,
    pub hist_joy_per6_fl: f64,
    pub hist_joy_per6_bl: f64,
    pub hist_joy_per6_b: f64,
    pub hist_joy_per6_br: f64,
    pub num_bouts: u32,
    pub mean_bout_duration_s: f64,
    pub max_bout_duration_s: f64,
    pub joy_activations: u32,
    pub joy_attempts: u32,
    pub activation_ratio: f64,
    pub per_max_mean: f64,
    pub per_max_std: f64,
    pub per_move_2s: f64,
    pub angle_range_mean: f64,
    pub move_mean_dur: f64,
    pub joy_count_norm: f64,
    pub move_count_norm: f64,
    pub path_length_avg_norm: f64,
    pub path_efficiency: f64,
}

impl SessionFeatures {
    /// Canonical field names, in emission order.
    ///
    /// These are the names the feature-list artifact may reference and the
    /// header names of the result CSV.
    pub const FIELD_ORDER: [&'static str; 32] = [
        "session_time_min",
        "active_time_min",
        "moving_time_min",
        "avg_path_length",
        "hist_FR",
        "hist_F",
        "hist_FL",
        "hist_BL",
        "hist_B",
        "hist_BR",
        "path_ft",
        "histJoyPer6_FR",
        "histJoyPer6_F",
        "histJoyPer6_FL",
        "histJoyPer6_BL",
        "histJoyPer6_B",
        "histJoyPer6_BR",
        "num_bouts",
        "mean_bout_duration_s",
        "max_bout_duration_s",
        "joy_activations",
        "joy_attempts",
        "activation_ratio",
        "perMaxMean",
        "perMaxStd",
        "perMove_2s",
        "angleRangeMean",
        "moveMeanDur",
        "joyCount_Norm",
        "moveCount_Norm",
        "pathLengthAvg_Norm",
        "pathEfficiency",
    ];

    /// Look up a feature by its canonical name. Integer-valued counts are
    /// widened to f64. Returns `None` for names outside the contract.
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "session_time_min" => self.session_time_min,
            "active_time_min" => self.active_time_min,
            "moving_time_min" => self.moving_time_min,
            "avg_path_length" => self.avg_path_length,
            "hist_FR" => self.hist_fr,
            "hist_F" => self.hist_f,
            "hist_FL" => self.hist_fl,
            "hist_BL" => self.hist_bl,
            "hist_B" => self.hist_b,
            "hist_BR" => self.hist_br,
            "path_ft" => self.path_ft,
            "histJoyPer6_FR" => self.hist_joy_per6_fr,
            "histJoyPer6_F" => self.hist_joy_per6_f,
            "histJoyPer6_FL" => self.hist_joy_per6_fl,
            "histJoyPer6_BL" => self.hist_joy_per6_bl,
            "histJoyPer6_B" => self.hist_joy_per6_b,
            "histJoyPer6_BR" => self.hist_joy_per6_br,
            "num_bouts" => self.num_bouts as f64,
            "mean_bout_duration_s" => self.mean_bout_duration_s,
            "max_bout_duration_s" => self.max_bout_duration_s,
            "joy_activations" => self.joy_activations as f64,
            "joy_attempts" => self.joy_attempts as f64,
            "activation_ratio" => self.activation_ratio,
            "perMaxMean" => self.per_max_mean,
            "perMaxStd" => self.per_max_std,
            "perMove_2s" => self.per_move_2s,
            "angleRangeMean" => self.angle_range_mean,
            "moveMeanDur" => self.move_mean_dur,
            "joyCount_Norm" => self.joy_count_norm,
            "moveCount_Norm" => self.move_count_norm,
            "pathLengthAvg_Norm" => self.path_length_avg_norm,
            "pathEfficiency" => self.path_efficiency,
            _ => return None,
        };
        Some(value)
    }

    /// All feature values in [`Self::FIELD_ORDER`] order.
    pub fn values(&self) -> Vec<f64> {
        Self::FIELD_ORDER
            .iter()
            .map(|name| self.get(name).expect("FIELD_ORDER names are exhaustive"))
            .collect()
    }
}

/// Output of the classifier stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class label (argmax of the probability distribution)
    pub label: String,
    /// Maximum class probability
    pub confidence: f64,
    /// Per-class probabilities, in the model's label order
    pub probabilities: Vec<(String, f64)>,
}
