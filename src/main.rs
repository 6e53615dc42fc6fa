use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stint_config::Configuration;
use stint_engine::Context;
use stint_plan::{PlanDef, run_plan};

/// Stint - run units of work and inspect how they ended
#[derive(Parser)]
#[command(name = "stint")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a plan and print its result log
  Run {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,

    /// Fail when the root invocation does not succeed
    #[arg(long)]
    strict: bool,

    /// Path to an engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env().add_directive("stint=info".parse()?))
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run {
      plan_file,
      strict,
      config,
    }) => {
      run(plan_file, strict, config)?;
    }
    None => {
      println!("stint - use --help to see available commands");
    }
  }

  Ok(())
}

fn run(plan_file: PathBuf, strict: bool, config_file: Option<PathBuf>) -> Result<()> {
  // Read plan definition
  let plan = PlanDef::from_path(&plan_file)
    .with_context(|| format!("failed to load plan file: {}", plan_file.display()))?;

  eprintln!("Loaded plan: {} ({} commands)", plan.name, plan.size());

  // Load engine configuration
  let config = match &config_file {
    Some(path) => Configuration::from_path(path)
      .with_context(|| format!("failed to load config file: {}", path.display()))?,
    None => Configuration::default(),
  };

  // Read initial context from stdin
  let payload = read_payload_from_stdin()?;
  let serde_json::Value::Object(data) = payload else {
    bail!("context from stdin must be a JSON object");
  };

  let context = Context::with_config(config);
  context.merge(data).context("failed to seed context")?;

  // Execute plan
  let run = run_plan(&plan, &context, strict);

  eprintln!(
    "Execution {}: {} ({}, {} invocations)",
    run.execution_id,
    run.status,
    run.state,
    run.results.len()
  );

  // Print the run as JSON
  println!("{}", serde_json::to_string_pretty(&run)?);

  if let Some(fault) = run.fault {
    bail!("plan '{}' ended with {} fault: {}", plan.name, fault.kind(), fault);
  }

  Ok(())
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read context from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse context JSON from stdin")
    }
  }
}
