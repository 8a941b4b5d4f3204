mod config;
mod runner;
mod tap;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use seqn_core::time::{
    get_balanced_duration, get_doy_time, get_unix_epoch_time, parse_doy_or_ymd_time,
};
use seqn_core::{
    check_round_trip, document_to_seqn, parse_duration_string, seqn_to_document, validate_time,
    DurationUnit, SeqnError, TimeKind,
};
use seqn_interchange::{from_interchange, to_interchange};

use config::Settings;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// SeqN sequencing language compiler and decompiler.
#[derive(Parser)]
#[command(
    name = "seqn",
    version,
    about = "SeqN sequencing language compiler and decompiler"
)]
struct Cli {
    /// Output format (text or json) [default: text]
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .seqn file to sequence document JSON
    Compile {
        /// Path to the .seqn source file
        file: PathBuf,
    },

    /// Render a sequence document JSON file as SeqN text
    Decompile {
        /// Path to the document JSON file
        file: PathBuf,
    },

    /// Check that a .seqn file compiles
    Check {
        /// Path to the .seqn source file
        file: PathBuf,
        /// Also require the file to be in canonical form
        #[arg(long)]
        round_trip: bool,
    },

    /// Validate document JSON against the formal JSON Schema
    Validate {
        /// Path to the document JSON file
        document: PathBuf,
    },

    /// Run the conformance test suite
    Test {
        /// Path to the conformance suite directory
        #[arg(default_value = "conformance")]
        suite_dir: PathBuf,
    },

    /// Time tag and duration utilities
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Check a time tag against one grammar, or list every grammar it matches
    Validate {
        text: String,
        /// absolute, epoch, relative, epoch-simple or relative-simple
        #[arg(long)]
        kind: Option<String>,
    },

    /// Parse a duration into its components
    Parse {
        #[arg(allow_hyphen_values = true)]
        text: String,
        /// Unit for a bare number (y, d, h, m, s, ms, us)
        #[arg(long)]
        unit: Option<String>,
    },

    /// Rewrite a duration as a balanced [DDDT]hh:mm:ss[.sss] tag
    Balance {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },

    /// Format milliseconds since the Unix epoch as a day-of-year timestamp
    Doy {
        #[arg(allow_hyphen_values = true)]
        unix_ms: i64,
    },

    /// Convert a day-of-year timestamp to milliseconds since the Unix epoch
    Epoch { doy: String },

    /// Read a DOY timestamp, YMD timestamp or duration leniently
    Calendar {
        #[arg(allow_hyphen_values = true)]
        text: String,
        /// Fractional-second digits to keep
        #[arg(long)]
        precision: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli);
    let (output, quiet) = (settings.output, cli.quiet);

    match cli.command {
        Commands::Compile { file } => cmd_compile(&file, output, quiet),
        Commands::Decompile { file } => cmd_decompile(&file, output, quiet),
        Commands::Check { file, round_trip } => cmd_check(&file, round_trip, output, quiet),
        Commands::Validate { document } => cmd_validate(&document, output, quiet),
        Commands::Test { suite_dir } => cmd_test(&suite_dir, output, quiet),
        Commands::Time { command } => cmd_time(command, &settings, quiet),
    }
}

fn load_settings(cli: &Cli) -> Settings {
    let file = match &cli.config {
        Some(path) => match config::read_config(path) {
            Ok(file) => file,
            Err(msg) => {
                report_error(&msg, cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
                process::exit(1);
            }
        },
        None => config::ConfigFile::default(),
    };
    match file.resolve(cli.output) {
        Ok(settings) => settings,
        Err(msg) => {
            report_error(&msg, cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
            process::exit(1);
        }
    }
}

fn read_file(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn read_json_file(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let src = read_file(path, output, quiet);
    match serde_json::from_str(&src) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_compile(file: &Path, output: OutputFormat, quiet: bool) {
    let src = read_file(file, output, quiet);
    match seqn_to_document(&src) {
        Ok(doc) => {
            let pretty = serde_json::to_string_pretty(&to_interchange(&doc))
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        Err(e) => {
            report_seqn_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_decompile(file: &Path, output: OutputFormat, quiet: bool) {
    let value = read_json_file(file, output, quiet);
    let doc = match from_interchange(&value) {
        Ok(doc) => doc,
        Err(e) => {
            let msg = format!("error reading document '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match document_to_seqn(&doc) {
        Ok(text) => print!("{}", text),
        Err(e) => {
            report_seqn_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_check(file: &Path, round_trip: bool, output: OutputFormat, quiet: bool) {
    let src = read_file(file, output, quiet);
    let result = if round_trip {
        check_round_trip(&src)
    } else {
        seqn_to_document(&src)
    };

    match result {
        Ok(doc) => {
            if quiet {
                return;
            }
            let requests = doc.requests.len();
            let steps = doc.steps.len();
            match output {
                OutputFormat::Text => println!(
                    "ok: {} ({} steps, {} requests{})",
                    doc.id,
                    steps,
                    requests,
                    if round_trip { ", canonical" } else { "" }
                ),
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "canonical": round_trip,
                        "id": doc.id,
                        "ok": true,
                        "requests": requests,
                        "steps": steps,
                    });
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json).unwrap_or_default()
                    );
                }
            }
        }
        Err(e) => {
            report_seqn_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

static DOCUMENT_SCHEMA_STR: &str = include_str!("../../../docs/seqn-document-schema.json");

fn cmd_validate(document: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(DOCUMENT_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!(
                "internal error: failed to parse embedded document schema: {}",
                e
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc = read_json_file(document, output, quiet);

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
    } else {
        match output {
            OutputFormat::Text => {
                if !quiet {
                    eprintln!("invalid document");
                    for err in &errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                );
            }
        }
        process::exit(1);
    }
}

fn cmd_test(suite_dir: &Path, output: OutputFormat, quiet: bool) {
    if !suite_dir.exists() {
        let msg = format!(
            "error: conformance suite directory not found: {}",
            suite_dir.display()
        );
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    let result = runner::run_suite(suite_dir);
    if result.failed > 0 {
        process::exit(1);
    }
}

fn cmd_time(command: TimeCommands, settings: &Settings, quiet: bool) {
    let output = settings.output;
    let result = match command {
        TimeCommands::Validate { text, kind } => {
            time_validate(&text, kind.as_deref(), output, quiet);
            return;
        }
        TimeCommands::Parse { text, unit } => {
            let unit = match unit.map(|u| u.parse::<DurationUnit>()) {
                Some(Ok(u)) => u,
                Some(Err(e)) => {
                    report_seqn_error(&e, output, quiet);
                    process::exit(1);
                }
                None => settings.duration_unit,
            };
            parse_duration_string(&text, unit).map(|parsed| {
                let canonical = parsed.to_string();
                let mut json = serde_json::to_value(parsed).unwrap_or_default();
                if let Some(obj) = json.as_object_mut() {
                    obj.insert("canonical".to_string(), canonical.clone().into());
                }
                (canonical, json)
            })
        }
        TimeCommands::Balance { text } => get_balanced_duration(&text)
            .map(|balanced| (balanced.clone(), serde_json::json!({ "balanced": balanced }))),
        TimeCommands::Doy { unix_ms } => doy_from_unix_ms(unix_ms)
            .map(|doy| (doy.clone(), serde_json::json!({ "doy": doy }))),
        TimeCommands::Epoch { doy } => get_unix_epoch_time(&doy)
            .map(|ms| (ms.to_string(), serde_json::json!({ "unix_ms": ms }))),
        TimeCommands::Calendar { text, precision } => {
            let precision = precision.unwrap_or(settings.decimal_precision);
            match parse_doy_or_ymd_time(&text, precision) {
                Some(parsed) => {
                    let json = serde_json::to_value(&parsed).unwrap_or_default();
                    let pretty = serde_json::to_string_pretty(&json).unwrap_or_default();
                    Ok((pretty, json))
                }
                None => Err(SeqnError::format(
                    &text,
                    "not a day-of-year timestamp, YMD timestamp or duration",
                )),
            }
        }
    };

    match result {
        Ok((text, json)) => match output {
            OutputFormat::Text => println!("{}", text),
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            ),
        },
        Err(e) => {
            report_seqn_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn time_validate(text: &str, kind: Option<&str>, output: OutputFormat, quiet: bool) {
    let kinds: Vec<TimeKind> = match kind {
        Some(k) => match k.parse() {
            Ok(k) => vec![k],
            Err(e) => {
                report_seqn_error(&e, output, quiet);
                process::exit(1);
            }
        },
        None => TimeKind::ALL.to_vec(),
    };
    let matched: Vec<&str> = kinds
        .iter()
        .filter(|k| validate_time(text, **k))
        .map(|k| k.name())
        .collect();

    if !quiet {
        match output {
            OutputFormat::Text => {
                if matched.is_empty() {
                    println!("invalid");
                } else {
                    println!("valid: {}", matched.join(", "));
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "matches": matched,
                    "valid": !matched.is_empty(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                );
            }
        }
    }
    if matched.is_empty() {
        process::exit(1);
    }
}

fn doy_from_unix_ms(unix_ms: i64) -> Result<String, SeqnError> {
    let nanos = i128::from(unix_ms) * 1_000_000;
    time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map(|date| get_doy_time(date, true))
        .map_err(|e| SeqnError::format(&unix_ms.to_string(), e.to_string()))
}

pub(crate) fn report_seqn_error(e: &SeqnError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", e);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
