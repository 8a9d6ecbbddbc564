//! Vitals CLI - Command-line interface for Vitals Risk
//!
//! Commands:
//! - assess: Assess one reading from flags, or NDJSON readings from a file/stdin
//! - serve: Run the HTTP assessment endpoint
//! - doctor: Train the model and report on its health

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use vitals_risk::{
    AssessError, AssessmentResult, Config, ConfigError, ModelError, Reading, RiskEvaluator,
    SERVICE_NAME, VERSION,
};
use vitals_risk::forest::AnomalyClassifier;
use vitals_risk::types::{Verdict, Vitals};

/// Vitals - Health-risk assessment for heart rate and blood oxygen readings
#[derive(Parser)]
#[command(name = "vitals")]
#[command(version = VERSION)]
#[command(about = "Assess heart rate and blood oxygen readings", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a single reading or a stream of NDJSON readings
    Assess {
        /// Heart rate (bpm)
        #[arg(long)]
        heart_rate: Option<f64>,

        /// Blood oxygen saturation (%)
        #[arg(long)]
        blood_oxygen: Option<f64>,

        /// NDJSON input file, one reading per line (use - for stdin)
        #[arg(short, long, conflicts_with_all = ["heart_rate", "blood_oxygen"])]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Run the HTTP assessment endpoint
    #[cfg(feature = "server")]
    Serve {
        /// Host to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Train the model and check its health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), VitalsCliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Assess {
            heart_rate,
            blood_oxygen,
            input,
            output_format,
        } => cmd_assess(&config, heart_rate, blood_oxygen, input.as_deref(), output_format),

        #[cfg(feature = "server")]
        Commands::Serve { host, port } => cmd_serve(config, host, port),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn cmd_assess(
    config: &Config,
    heart_rate: Option<f64>,
    blood_oxygen: Option<f64>,
    input: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), VitalsCliError> {
    let from_flags = heart_rate.is_some() || blood_oxygen.is_some();

    if !from_flags && input.is_none() && atty::is(atty::Stream::Stdin) {
        return Err(VitalsCliError::NoInput);
    }

    let evaluator = RiskEvaluator::train(&config.model)?;

    if from_flags {
        let reading = Reading {
            heart_rate,
            blood_oxygen,
        };
        let result = evaluator.evaluate(&reading)?;
        print!("{}", format_output(&[result], &output_format)?);
        return Ok(());
    }

    let reader: Box<dyn BufRead> = match input {
        Some(path) if path.to_string_lossy() != "-" => Box::new(BufReader::new(fs::File::open(path)?)),
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let mut results: Vec<AssessmentResult> = Vec::new();
    let mut failures: Vec<LineFailure> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        match Reading::from_json(trimmed).and_then(|reading| evaluator.evaluate(&reading)) {
            Ok(result) => results.push(result),
            Err(e) => failures.push(LineFailure {
                line: index + 1,
                error: e.to_string(),
            }),
        }
    }

    let mut stdout = io::stdout();
    write!(stdout, "{}", format_output(&results, &output_format)?)?;
    stdout.flush()?;

    for failure in &failures {
        eprintln!("{}", serde_json::to_string(failure)?);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(VitalsCliError::ReadingsFailed(failures.len()))
    }
}

#[cfg(feature = "server")]
fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<(), VitalsCliError> {
    use std::sync::Arc;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    // The model must exist before the listener accepts requests.
    let evaluator = Arc::new(RiskEvaluator::train(&config.model)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(vitals_risk::server::serve(&config.server, evaluator))?;
    Ok(())
}

fn cmd_doctor(config: &Config, json: bool) -> Result<(), VitalsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", SERVICE_NAME, VERSION),
    });

    match config.model.validate() {
        Ok(()) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "{} samples, {} trees, contamination {}, seed {}",
                config.model.n_samples,
                config.model.n_estimators,
                config.model.contamination,
                config.model.seed
            ),
        }),
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let started = Instant::now();
    match RiskEvaluator::train(&config.model) {
        Ok(evaluator) => {
            let forest = evaluator.classifier();
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Fitted {} trees in {} ms (offset {:.4})",
                    forest.n_estimators(),
                    started.elapsed().as_millis(),
                    forest.offset()
                ),
            });

            let fraction = forest.training_outlier_fraction();
            let drift = (fraction - config.model.contamination).abs();
            checks.push(DoctorCheck {
                name: "training_outliers".to_string(),
                status: if drift <= 0.02 { CheckStatus::Ok } else { CheckStatus::Warning },
                message: format!(
                    "{:.1}% of training readings flagged (expected {:.1}%)",
                    fraction * 100.0,
                    config.model.contamination * 100.0
                ),
            });

            let (hr_low, hr_high) = config.model.heart_rate_range;
            let (bo_low, bo_high) = config.model.blood_oxygen_range;
            let center = Vitals {
                heart_rate: (hr_low + hr_high) / 2.0,
                blood_oxygen: (bo_low + bo_high) / 2.0,
            };
            checks.push(match forest.predict(&center) {
                Verdict::Normal => DoctorCheck {
                    name: "sanity".to_string(),
                    status: CheckStatus::Ok,
                    message: "Center of the normal range classified as normal".to_string(),
                },
                Verdict::Anomalous => DoctorCheck {
                    name: "sanity".to_string(),
                    status: CheckStatus::Error,
                    message: "Center of the normal range classified as anomalous".to_string(),
                },
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Error,
            message: format!("Model fit failed: {}", e),
        }),
    }

    let report = DoctorReport {
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitals Doctor Report");
        println!("====================");
        println!("Service: {}", report.service);
        println!("Version: {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VitalsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output(results: &[AssessmentResult], format: &OutputFormat) -> Result<String, VitalsCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for result in results {
                out.push_str(&serde_json::to_string(result)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(results)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(results)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum VitalsCliError {
    Io(io::Error),
    Assess(AssessError),
    Model(ModelError),
    Config(ConfigError),
    Json(serde_json::Error),
    NoInput,
    ReadingsFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for VitalsCliError {
    fn from(e: io::Error) -> Self {
        VitalsCliError::Io(e)
    }
}

impl From<AssessError> for VitalsCliError {
    fn from(e: AssessError) -> Self {
        VitalsCliError::Assess(e)
    }
}

impl From<ModelError> for VitalsCliError {
    fn from(e: ModelError) -> Self {
        VitalsCliError::Model(e)
    }
}

impl From<ConfigError> for VitalsCliError {
    fn from(e: ConfigError) -> Self {
        VitalsCliError::Config(e)
    }
}

impl From<serde_json::Error> for VitalsCliError {
    fn from(e: serde_json::Error) -> Self {
        VitalsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VitalsCliError> for CliError {
    fn from(e: VitalsCliError) -> Self {
        match e {
            VitalsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            VitalsCliError::Assess(e) => CliError {
                code: match e {
                    AssessError::MissingMetric(_) => "MISSING_METRIC".to_string(),
                    AssessError::JsonError(_) => "JSON_ERROR".to_string(),
                    AssessError::Model(_) => "MODEL_ERROR".to_string(),
                },
                message: e.to_string(),
                hint: Some("Provide non-zero --heart-rate and --blood-oxygen values".to_string()),
            },
            VitalsCliError::Model(e) => CliError {
                code: "MODEL_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the model section of the config file".to_string()),
            },
            VitalsCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --config file".to_string()),
            },
            VitalsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            VitalsCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No reading supplied".to_string(),
                hint: Some("Pass --heart-rate and --blood-oxygen, --input <file>, or pipe NDJSON on stdin".to_string()),
            },
            VitalsCliError::ReadingsFailed(count) => CliError {
                code: "READINGS_FAILED".to_string(),
                message: format!("{} readings could not be assessed", count),
                hint: Some("See the per-line errors above".to_string()),
            },
            VitalsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct LineFailure {
    line: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    service: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
