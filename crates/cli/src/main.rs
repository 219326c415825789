//! Command-line entrypoint for pgboot.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pgboot_app::{oltp_schema, Bootstrapper, InvocationContext};
use pgboot_db::SchemaScript;
use pgboot_kernel::{missing_variables, ConfigError, ProcessEnv, Settings};

#[derive(Parser)]
#[command(name = "pgboot")]
#[command(about = "Idempotent bootstrap of the OLTP role, database and schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one bootstrap and print the result as JSON
    Run(RunArgs),
    /// Report which required environment variables are missing
    CheckEnv,
    /// Print the bundled schema-definition and seed scripts
    Schema,
}

#[derive(Args)]
struct RunArgs {
    /// JSON event from the trigger; passed through and otherwise ignored
    #[arg(long)]
    event: Option<PathBuf>,

    /// Replace the bundled schema-definition script
    #[arg(long, requires = "seed")]
    schema: Option<PathBuf>,

    /// Replace the bundled seed script
    #[arg(long, requires = "schema")]
    seed: Option<PathBuf>,

    /// Request id attached to log output (defaults to a fresh UUIDv7)
    #[arg(long)]
    request_id: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load pgboot settings")?;
    pgboot_telemetry::init(&settings.telemetry)?;

    tracing::debug!(env = ?settings.environment, "pgboot starting");

    match cli.command {
        Commands::Run(args) => run(args, &settings).await,
        Commands::CheckEnv => Ok(check_env()),
        Commands::Schema => {
            let script = oltp_schema();
            println!("{}\n{}", script.definition, script.seed);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(args: RunArgs, settings: &Settings) -> anyhow::Result<ExitCode> {
    let event = match &args.event {
        Some(path) => {
            let raw = read(path)?;
            serde_json::from_str(&raw)
                .with_context(|| format!("event file {} is not valid JSON", path.display()))?
        }
        None => serde_json::Value::Null,
    };

    let script = match (&args.schema, &args.seed) {
        (Some(schema), Some(seed)) => SchemaScript::new(read(schema)?, read(seed)?),
        _ => oltp_schema(),
    };

    let context = args
        .request_id
        .map(InvocationContext::new)
        .unwrap_or_default();

    let result = Bootstrapper::from_settings(settings, script)
        .init_db(event, context)
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn check_env() -> ExitCode {
    let missing = missing_variables(&ProcessEnv);
    if missing.is_empty() {
        println!("all required environment variables are set");
        ExitCode::SUCCESS
    } else {
        println!("{}", ConfigError::Missing(missing));
        ExitCode::FAILURE
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
