//! Metafix CLI - apply a fix to JSON records
//!
//! ```bash
//! metafix run --fix fix.json --input records.json   # Transform records
//! metafix run --fix fix.json --var source=catalog   # Read stdin, set a variable
//! metafix functions                                 # List built-in operations
//! metafix check --fix fix.json                      # Report unknown operations
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG` (default `info`) to adjust it.

use clap::{Parser, Subcommand};
use metafix::{
    load_fix, parse_records, records_to_json, unresolved_names, EngineConfig, FixConditional,
    FixContext, FixMethod, Metafix, Record,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metafix")]
#[command(about = "Transform metadata records with a fix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a fix to a JSON array (or JSON Lines) of records
    Run {
        /// Fix file (JSON expression tree)
        #[arg(short, long)]
        fix: PathBuf,

        /// Input records (default: stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Engine configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fix variable as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// List built-in functions and predicates
    Functions,

    /// Check that every operation in a fix resolves
    Check {
        /// Fix file (JSON expression tree)
        #[arg(short, long)]
        fix: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            fix,
            input,
            output,
            config,
            vars,
        } => cmd_run(&fix, input.as_deref(), output.as_deref(), config.as_deref(), vars),

        Commands::Functions => cmd_functions(),

        Commands::Check { fix } => cmd_check(&fix),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_var(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", arg))
}

fn cmd_run(
    fix_path: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    config_path: Option<&Path>,
    vars: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fix = load_fix(fix_path)?;

    let mut config = match config_path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::new().with_base_dir(
            fix_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
    };
    for (name, value) in vars {
        config = config.with_var(name, value);
    }

    let content = match input {
        Some(path) => {
            eprintln!("Processing: {}", path.display());
            fs::read_to_string(path)?
        }
        None => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            content
        }
    };
    let records = parse_records(&content)?;
    eprintln!("   Records: {}", records.len());
    eprintln!("   Expressions: {}", fix.len());

    let mut metafix = Metafix::with_config(fix, config)?;
    let mut emitted: Vec<Record> = Vec::new();
    let summary = metafix.process(records, &mut emitted)?;

    eprintln!("{}", summary.summary());
    for failed in summary.failed.iter().take(5) {
        eprintln!("   Record {}: {}", failed.index, failed.message);
    }

    let json = serde_json::to_string_pretty(&records_to_json(&emitted))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_functions() -> Result<(), Box<dyn std::error::Error>> {
    println!("Functions:");
    for method in FixMethod::ALL {
        println!("  {}", method);
    }
    println!();
    println!("Predicates:");
    for conditional in FixConditional::ALL {
        println!("  {}", conditional);
    }
    Ok(())
}

fn cmd_check(fix_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Checking: {}", fix_path.display());

    let fix = load_fix(fix_path)?;
    let unresolved = unresolved_names(&FixContext::new(), &fix);

    if unresolved.is_empty() {
        eprintln!("All operations resolve ({} expressions)", fix.len());
        return Ok(());
    }

    eprintln!("Unknown operations:");
    for name in &unresolved {
        println!("  {}", name);
    }
    std::process::exit(1);
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
