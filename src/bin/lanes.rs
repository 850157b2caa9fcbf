//! Lanes CLI - Command-line interface for the lane pattern classifier
//!
//! Commands:
//! - replay: Replay a recorded round and emit classification frames (batch mode)
//! - run: Classify lane events streamed on stdin (streaming mode)
//! - config: Print the effective classifier configuration
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use lane_pattern::adapter::{parse_array, parse_event, parse_ndjson, trail_to_events};
use lane_pattern::replay::{replay, ClassificationFrame, ReplayMode, DEFAULT_POLL_INTERVAL_MS};
use lane_pattern::session::RoundSession;
use lane_pattern::{ClassifierConfig, LaneEvent, LANES_VERSION, PRODUCER_NAME};

/// Lanes - Real-time play-pattern classifier for lane-based rhythm games
#[derive(Parser)]
#[command(name = "lanes")]
#[command(version = LANES_VERSION)]
#[command(about = "Classify lane play as sequential, repetitive or exploratory", long_about = None)]
struct Cli {
    /// Log verbosity when LANES_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded round (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "trail")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Host polling period in milliseconds (0 classifies after every event)
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
        poll_ms: f64,

        /// Classifier configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit the round report instead of frames
        #[arg(long)]
        report: bool,
    },

    /// Classify NDJSON lane events from stdin, one frame per event (streaming mode)
    Run {
        /// Classifier configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Flush output after each frame
        #[arg(long, default_value = "true")]
        flush: bool,

        /// Print the round report to stderr at end of input
        #[arg(long)]
        report: bool,
    },

    /// Print the effective classifier configuration
    Config {
        /// Configuration file to load and validate
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Click-trail export ({ lanes, points, durationSec })
    Trail,
    /// Newline-delimited lane events
    Ndjson,
    /// JSON array of lane events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

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

/// Log to stderr so stdout stays machine-readable
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_env("LANES_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), LanesCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            poll_ms,
            config,
            report,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            poll_ms,
            config.as_deref(),
            report,
        ),

        Commands::Run {
            config,
            flush,
            report,
        } => cmd_run(config.as_deref(), flush, report),

        Commands::Config { config } => cmd_config(config.as_deref()),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    poll_ms: f64,
    config_path: Option<&Path>,
    report: bool,
) -> Result<(), LanesCliError> {
    let config = load_config(config_path)?;
    let input_data = read_input(input)?;

    let events: Vec<LaneEvent> = match input_format {
        InputFormat::Trail => trail_to_events(&input_data)?,
        InputFormat::Ndjson => parse_ndjson(&input_data)?,
        InputFormat::Json => parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(LanesCliError::NoEvents);
    }

    let mode = if poll_ms > 0.0 {
        ReplayMode::Poll {
            interval_ms: poll_ms,
        }
    } else {
        ReplayMode::PerEvent
    };

    let result = replay(&events, &config, mode)?;

    let rendered = if report {
        match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&result.report)? + "\n",
            _ => serde_json::to_string(&result.report)? + "\n",
        }
    } else {
        format_frames(&result.frames, &output_format)?
    };

    write_output(output, &rendered)
}

fn cmd_run(config_path: Option<&Path>, flush: bool, report: bool) -> Result<(), LanesCliError> {
    let config = load_config(config_path)?;
    let mut session = RoundSession::with_config(config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let event = parse_event(trimmed)?;
        session.ingest(event);

        let analysis = session.poll();
        let frame = ClassificationFrame::from_analysis(event.timestamp, analysis);

        writeln!(stdout, "{}", serde_json::to_string(&frame)?)?;
        if flush {
            stdout.flush()?;
        }
    }
    stdout.flush()?;

    if report {
        eprintln!("{}", serde_json::to_string(&session.finish_round())?);
    }

    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> Result<(), LanesCliError> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), LanesCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, LANES_VERSION),
    });

    if let Some(path) = config_path {
        let check = if !path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults will be used".to_string(),
            }
        } else {
            match fs::read_to_string(path) {
                Ok(content) => match ClassifierConfig::from_json(&content) {
                    Ok(config) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (window {}, buffer {}, alpha {})",
                            config.window_size, config.buffer_capacity, config.smoothing_alpha
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Check stdin is available (for streaming mode)
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (streaming mode ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: LANES_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Lanes Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LanesCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<ClassifierConfig, LanesCliError> {
    match path {
        Some(path) => Ok(ClassifierConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ClassifierConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, LanesCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, content: &str) -> Result<(), LanesCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, content)?;
    }
    Ok(())
}

fn format_frames(
    frames: &[ClassificationFrame],
    format: &OutputFormat,
) -> Result<String, LanesCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::with_capacity(frames.len());
            for frame in frames {
                lines.push(serde_json::to_string(frame)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(frames)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(frames)? + "\n"),
    }
}

#[derive(Debug)]
enum LanesCliError {
    Io(io::Error),
    Classifier(lane_pattern::ClassifierError),
    Json(serde_json::Error),
    NoEvents,
    DoctorFailed,
}

impl From<io::Error> for LanesCliError {
    fn from(e: io::Error) -> Self {
        LanesCliError::Io(e)
    }
}

impl From<lane_pattern::ClassifierError> for LanesCliError {
    fn from(e: lane_pattern::ClassifierError) -> Self {
        LanesCliError::Classifier(e)
    }
}

impl From<serde_json::Error> for LanesCliError {
    fn from(e: serde_json::Error) -> Self {
        LanesCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LanesCliError> for CliError {
    fn from(e: LanesCliError) -> Self {
        match e {
            LanesCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LanesCliError::Classifier(e) => {
                let hint = match &e {
                    lane_pattern::ClassifierError::InvalidConfig(_) => {
                        "Run 'lanes config' to see valid defaults"
                    }
                    lane_pattern::ClassifierError::InvalidLane(_) => "Lanes must be 1-5",
                    _ => "Check the input format",
                };
                CliError {
                    code: "CLASSIFIER_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            LanesCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LanesCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            LanesCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
