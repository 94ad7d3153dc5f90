//! mobikin CLI - Command-line interface for session analytics
//!
//! Commands:
//! - preprocess: Clean a raw session log (raw CSV -> cleaned CSV)
//! - analyze: Extract features and classify (cleaned CSV -> result CSV)
//! - run: Full pipeline (raw CSV -> result CSV)
//! - schema: Print column contracts

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mobikin::schema::{CLEAN_COLUMNS, EXTRACTOR_COLUMNS, RAW_COLUMNS};
use mobikin::types::SessionFeatures;
use mobikin::{ClassifierHandle, PipelineError, SessionProcessor, MOBIKIN_VERSION};

/// mobikin - Session analytics for pediatric powered-mobility telemetry
#[derive(Parser)]
#[command(name = "mobikin")]
#[command(version = MOBIKIN_VERSION)]
#[command(about = "Classify powered-mobility session logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a raw session log (raw CSV -> cleaned CSV)
    Preprocess {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Extract features from a cleaned log and classify them
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Trained model artifact (JSON random forest)
        #[arg(long)]
        model: PathBuf,

        /// Ordered feature-list artifact (JSON array of names)
        #[arg(long)]
        features: PathBuf,
    },

    /// Run the full pipeline (raw CSV -> result CSV)
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Trained model artifact (JSON random forest)
        #[arg(long)]
        model: PathBuf,

        /// Ordered feature-list artifact (JSON array of names)
        #[arg(long)]
        features: PathBuf,
    },

    /// Print column contracts
    Schema {
        /// Contract to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Raw device log columns
    Raw,
    /// Cleaned session log columns
    Clean,
    /// Result row columns
    Result,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MobikinCliError> {
    match cli.command {
        Commands::Preprocess { input, output } => {
            let raw = read_input(&input)?;
            let cleaned = mobikin::preprocess_session(&raw)?;
            write_output(&output, &cleaned)
        }

        Commands::Analyze {
            input,
            output,
            model,
            features,
        } => {
            let processor = load_processor(&model, &features)?;
            let clean = read_input(&input)?;
            let result = processor.analyze(&clean)?;
            write_output(&output, &result)
        }

        Commands::Run {
            input,
            output,
            model,
            features,
        } => {
            let processor = load_processor(&model, &features)?;
            let raw = read_input(&input)?;
            let result = processor.run(&raw)?;
            write_output(&output, &result)
        }

        Commands::Schema { schema_type } => {
            cmd_schema(schema_type);
            Ok(())
        }
    }
}

fn load_processor(model: &Path, features: &Path) -> Result<SessionProcessor, MobikinCliError> {
    let classifier = ClassifierHandle::load(model, features)?;
    Ok(SessionProcessor::new(classifier))
}

fn read_input(input: &Path) -> Result<String, MobikinCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("reading session CSV from stdin; pipe a file or press Ctrl-D to finish");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), MobikinCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
        Ok(())
    } else {
        Ok(fs::write(output, data)?)
    }
}

fn cmd_schema(schema_type: SchemaType) {
    match schema_type {
        SchemaType::Raw => {
            println!("Raw device log columns ({} required):", RAW_COLUMNS.len());
            for column in RAW_COLUMNS {
                println!("  - {}", column);
            }
            println!();
            println!("Timestamps use the format YYYY-MM-DD_HH:MM:SS.ffffff.");
            println!("Sampling is assumed to be 120 Hz; this is a precondition.");
        }
        SchemaType::Clean => {
            println!("Cleaned session log columns, in order:");
            for column in CLEAN_COLUMNS {
                println!("  - {}", column);
            }
            println!();
            println!("The analyze command requires these of them:");
            for column in EXTRACTOR_COLUMNS {
                println!("  - {}", column);
            }
        }
        SchemaType::Result => {
            println!("Result row columns, in order:");
            for field in SessionFeatures::FIELD_ORDER {
                println!("  - {}", field);
            }
            println!("  - Predicted_Class");
            println!("  - Confidence_Score");
            println!("  - Prob_<label> (one per model class, in model label order)");
            println!();
            println!("Undefined (NaN) feature values serialize as empty fields.");
        }
    }
}

// Error types

#[derive(Debug)]
enum MobikinCliError {
    Io(io::Error),
    Pipeline(PipelineError),
}

impl From<io::Error> for MobikinCliError {
    fn from(e: io::Error) -> Self {
        MobikinCliError::Io(e)
    }
}

impl From<PipelineError> for MobikinCliError {
    fn from(e: PipelineError) -> Self {
        MobikinCliError::Pipeline(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MobikinCliError> for CliError {
    fn from(e: MobikinCliError) -> Self {
        match e {
            MobikinCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MobikinCliError::Pipeline(e) => {
                let hint = match &e {
                    PipelineError::Schema(_) => {
                        Some("Run 'mobikin schema raw' or 'mobikin schema clean' for the expected columns".to_string())
                    }
                    PipelineError::Parse(_) | PipelineError::Csv(_) => {
                        Some("Check the input CSV for malformed rows".to_string())
                    }
                    PipelineError::EmptyInput => {
                        Some("Ensure the input contains at least one data row".to_string())
                    }
                    PipelineError::ArtifactLoad(_) | PipelineError::Json(_) => {
                        Some("Check the --model and --features paths".to_string())
                    }
                    PipelineError::ArtifactMismatch(_) => Some(
                        "The feature-list artifact does not match this mobikin version".to_string(),
                    ),
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
        }
    }
}
