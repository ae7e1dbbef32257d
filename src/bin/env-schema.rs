//! Environment Schema CLI
//!
//! Command-line interface for checking schema documents and validating the
//! process environment against them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use env_schema::{
    load_document_auto, process_environment, render, BuildError, Schema, Target, ValidateError,
};

#[derive(Parser)]
#[command(name = "env-schema")]
#[command(about = "Resolve and validate environment-variable schemas")]
#[command(version)]
struct Cli {
    /// Log resolution details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a schema document and report every error
    Check {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,
    },

    /// Print the resolved schema as a JSON manifest
    Plan {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List applications and the subjects each one needs
    Apps {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the process environment for an application or subject
    Validate(ValidateArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Schema source: file path or URL (http:// or https://)
    schema: String,

    /// Application to validate
    #[arg(long, conflicts_with = "subject", required_unless_present = "subject")]
    app: Option<String>,

    /// Subject to validate
    #[arg(long, conflicts_with = "app", required_unless_present = "app")]
    subject: Option<String>,

    /// Output results as JSON (for automation)
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { schema } => run_check(&schema),
        Commands::Plan {
            schema,
            output,
            pretty,
        } => run_plan(&schema, output, pretty),
        Commands::Apps { schema, json } => run_apps(&schema, json),
        Commands::Validate(args) => run_validate(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("env_schema={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Load and build a schema, printing errors to stderr.
fn load_schema(source: &str) -> Result<Schema, u8> {
    let entries = load_document_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    debug!(source, entries = entries.len(), "loaded document");

    Schema::build(&entries).map_err(|e| {
        report_build_error(&e);
        e.exit_code() as u8
    })
}

fn report_build_error(err: &BuildError) {
    eprintln!("Error: {}", err);
    for error in &err.errors {
        eprintln!("  {}", error);
    }
}

fn run_check(source: &str) -> Result<(), u8> {
    let schema = load_schema(source)?;
    println!(
        "OK: {} subjects, {} variables, {} applications",
        schema.subjects().len(),
        schema.variable_count(),
        schema.scopes().len()
    );
    Ok(())
}

fn run_plan(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let schema = load_schema(source)?;
    let manifest = render::manifest(&schema);

    let json_output = if pretty {
        serde_json::to_string_pretty(&manifest)
    } else {
        serde_json::to_string(&manifest)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_apps(source: &str, json_output: bool) -> Result<(), u8> {
    let schema = load_schema(source)?;

    if json_output {
        let output = serde_json::to_string(schema.scopes()).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        for scope in schema.scopes() {
            println!("{}: {}", scope.application, scope.subjects.join(", "));
        }
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let ValidateArgs {
        schema: source,
        app,
        subject,
        json: json_output,
    } = args;

    let schema = load_schema(&source)?;
    let target = match (&app, &subject) {
        (Some(app), _) => Target::Application(app),
        (None, Some(subject)) => Target::Subject(subject),
        (None, None) => {
            report_error(json_output, "either --app or --subject is required");
            return Err(2);
        }
    };

    let env = process_environment();
    match schema.evaluate(target, &env) {
        Ok(config) => {
            if json_output {
                // Resolved values may hold secrets; only subject names are printed.
                let output = serde_json::json!({
                    "valid": true,
                    "subjects": config
                        .subjects
                        .iter()
                        .map(|s| s.subject.as_str())
                        .collect::<Vec<_>>(),
                });
                println!("{}", output);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { violations }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "violations": violations,
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for violation in &violations {
                    eprintln!("  {}", violation);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
