//! mobikin - Session analytics engine for pediatric powered-mobility telemetry
//!
//! mobikin transforms a raw device session log into a behavioral
//! classification through a deterministic pipeline: preprocessing
//! (timestamps, deadzone, smoothing, magnitudes) → session feature
//! extraction (timing, path length, directional histogram, bout
//! segmentation) → classification against a pre-trained random forest.
//!
//! Each stage is a pure function from CSV text to CSV text; the classifier
//! artifacts are loaded once into a handle and passed in explicitly.

pub mod bouts;
pub mod classifier;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod preprocess;
pub mod schema;
pub mod types;

pub use classifier::{ClassifierHandle, DecisionTree, ForestModel, TreeNode};
pub use error::PipelineError;
pub use pipeline::{analyze_session, preprocess_session, run_session, SessionProcessor};
pub use types::{Bout, BoutKind, Prediction, SessionFeatures, TICK_HZ, TICK_SECONDS};

/// mobikin version embedded in CLI output
pub const MOBIKIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI diagnostics
pub const PRODUCER_NAME: &str = "mobikin";
