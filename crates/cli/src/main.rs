//! Weft CLI - inspect and exercise advised operations from a manifest.

mod catalog;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weft_core::{ModuleKey, OperationId, Target, Value};
use weft_engine::{CallSite, Engine, EngineConfig};
use weft_registry::Manifest;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Call interception engine", long_about = None)]
struct Cli {
    /// Manifest file
    #[arg(long, short, default_value = "weft.json")]
    manifest: PathBuf,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered operations and their advice counts
    List,
    /// Show the layers a call passes through, outermost first
    Explain {
        /// Operation, as `Type::member`
        operation: String,
    },
    /// Invoke an operation
    Run {
        /// Operation, as `Type::member`
        operation: String,
        /// Argument, as JSON (bare words are taken as strings)
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Generic argument
        #[arg(long = "generic")]
        generics: Vec<String>,
        /// Call without running the operation's own body
        #[arg(long)]
        interface: bool,
        /// Receiver is implemented entirely by advices
        #[arg(long)]
        abstracted: bool,
    },
    /// Run info advices for every type of a module
    Info {
        /// Module key
        module: String,
    },
}

/// A manifest plus optional engine configuration.
#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    config: EngineConfig,
    #[serde(flatten)]
    manifest: Manifest,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<Engine> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let document: Document = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    let registry = document.manifest.build(&catalog::builtin())?;
    Ok(Engine::with_config(Arc::new(registry), document.config))
}

fn parse_operation(s: &str) -> Result<OperationId> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

fn parse_arg(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = load(&cli.manifest)?;

    match cli.command {
        Commands::List => {
            let operations: Vec<_> = engine.registry().operations().cloned().collect();
            println!("Operations ({})", operations.len());
            for op in operations {
                let advices = engine.descriptor(&op.id).map(|d| d.advices().len());
                match advices {
                    Ok(count) => println!("  {} | {:?} | {} advices", op.id, op.returns, count),
                    Err(e) => println!("  {} | {:?} | unresolved: {}", op.id, op.returns, e),
                }
            }
        }
        Commands::Explain { operation } => {
            let id = parse_operation(&operation)?;
            let descriptor = engine.descriptor(&id)?;
            println!("{}", id);
            if let Some(binding) = descriptor.property() {
                let role = if binding.is_setter { "setter" } else { "getter" };
                println!("  {} of property {}", role, binding.property.name);
            }
            for layer in engine.describe(&id)? {
                println!("  {:>6} | {} | {}", layer.priority, layer.advice, layer.kind);
            }
            match descriptor.pointcut() {
                Some(pointcut) if pointcut.body.is_some() => println!("  body   | {}", pointcut.id),
                _ => println!("  (no body)"),
            }
        }
        Commands::Run {
            operation,
            args,
            generics,
            interface,
            abstracted,
        } => {
            let id = parse_operation(&operation)?;
            let mut call = if interface {
                CallSite::interface(id.clone())
            } else {
                CallSite::new(id.clone())
            };
            if abstracted {
                call = call.abstracted();
            }
            let call = call
                .on(Target::new(id.declaring_type.to_string()))
                .args(args.iter().map(|a| Value::new(parse_arg(a))).collect())
                .generic_arguments(generics);

            let returned = engine.proceed(call)?.settle().await?;
            info!(operation = %id, "Call completed");
            match returned.and_then(|v| v.get::<serde_json::Value>()) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("(no value)"),
            }
        }
        Commands::Info { module } => {
            let runs = engine.process_module_info_advices(&ModuleKey::new(module))?;
            info!(runs, "Processed info advices");
        }
    }

    Ok(())
}
