mod logging;
mod report;
mod settings;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tabgen_schema::{DirectorySource, SchemaError, SchemaStore};
use tabgen_validate::{SpecError, validate_specification};
use thiserror::Error;
use uuid::Uuid;

use report::{RunOutcome, RunReport, write_report};
use settings::{Settings, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("settings error in {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },
    #[error("logging error: {0}")]
    Logging(String),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tabgen", version, about = "Tabgen specification tooling")]
struct Cli {
    /// Settings file (defaults to ./tabgen.toml when present).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a generation specification.
    Validate(ValidateArgs),
    /// Print a schema, or one of its subschemas, with its `$id`.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Specification JSON file.
    #[arg(value_name = "SPEC")]
    spec: PathBuf,
    /// Directory holding `<name>.schema.json` files.
    #[arg(long, value_name = "DIR")]
    schemas_dir: Option<PathBuf>,
    /// Schema locator to validate against.
    #[arg(long, value_name = "NAME")]
    schema: Option<String>,
    /// Write a JSON run report here.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Schema locator, e.g. `generate`.
    #[arg(value_name = "NAME")]
    name: String,
    /// Extract `#/definitions/<SUBSCHEMA>`.
    #[arg(long)]
    subschema: Option<String>,
    /// Definitions to carry into the extracted subschema.
    #[arg(long = "dep", value_name = "DEFINITION", requires = "subschema")]
    deps: Vec<String>,
    /// Directory holding `<name>.schema.json` files.
    #[arg(long, value_name = "DIR")]
    schemas_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(cli.log_json, cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::from(RunOutcome::Unavailable.exit_code());
    }

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Command::Validate(args) => run_validate(args, settings),
        Command::Schema(args) => run_schema(args, settings).map(|()| RunOutcome::Valid),
    });

    match result {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            tracing::error!(event = "command_failed", error = %err);
            eprintln!("error: {err}");
            ExitCode::from(RunOutcome::Unavailable.exit_code())
        }
    }
}

fn run_validate(args: ValidateArgs, settings: Settings) -> Result<RunOutcome, CliError> {
    let ValidateArgs {
        spec,
        schemas_dir,
        schema,
        report,
    } = args;

    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    tracing::info!(event = "run_started", run_id = %run_id, spec = %spec.display());

    let root = schema.unwrap_or(settings.schemas.root);
    let store = SchemaStore::new(
        DirectorySource::new(schemas_dir.unwrap_or(settings.schemas.dir)),
        settings.api,
    );

    let content = fs::read_to_string(&spec)?;
    let result = match serde_json::from_str::<Value>(&content) {
        Ok(document) => store
            .load(&root)
            .map_err(SpecError::from)
            .and_then(|schema| validate_specification(&document, &schema))
            .map_err(|err| (RunOutcome::from(err.outcome()), err.to_string())),
        Err(err) => Err((
            RunOutcome::Rejected,
            format!("specification is not valid JSON: {err}"),
        )),
    };

    let (outcome, message) = match result {
        Ok(()) => (RunOutcome::Valid, None),
        Err((outcome, message)) => (outcome, Some(message)),
    };

    match (outcome, &message) {
        (RunOutcome::Valid, _) | (_, None) => println!("specification is valid"),
        (RunOutcome::Rejected, Some(message)) => println!("specification rejected: {message}"),
        (RunOutcome::Unavailable, Some(message)) => {
            println!("validation unavailable: {message}")
        }
    }

    if let Some(path) = report {
        let report = RunReport::new(
            run_id.clone(),
            started_at,
            &spec,
            Some(store.schema_id(&root, None)),
            outcome,
            message,
        );
        write_report(&path, &report)?;
    }

    tracing::info!(event = "run_finished", run_id = %run_id, outcome = ?outcome);
    Ok(outcome)
}

fn run_schema(args: SchemaArgs, settings: Settings) -> Result<(), CliError> {
    let store = SchemaStore::new(
        DirectorySource::new(args.schemas_dir.unwrap_or(settings.schemas.dir)),
        settings.api,
    );
    let root = store.load(&args.name)?;

    let node = match &args.subschema {
        Some(name) => {
            let deps: Vec<&str> = args.deps.iter().map(String::as_str).collect();
            root.subschema(name, &deps)?
        }
        None => root,
    };

    println!("{}", serde_json::to_string_pretty(node.document())?);
    Ok(())
}
