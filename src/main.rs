use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bql::ast::{Metadata, Target};
use bql::compiler::{BqlCompiler, OptimizedStatement};
use bql::config::{self, Config, OutputFormat};
use bql::options::{OptionValue, Options};
use clap::Parser;
use tracing::Level;

/// Compile a BQL statement into SQL or a search query
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Backend to generate for (defaults to the config file's `default_target`)
    #[arg(long, value_enum)]
    target: Option<Target>,

    /// Option file: JSON when it ends in `.json`, TOML otherwise
    #[arg(long = "options", value_name = "FILE")]
    options_file: Option<PathBuf>,

    /// Bind an option, e.g. `--set id=10` or `--set 'ids=[1,2]'`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Print table and column metadata instead of generated text
    #[arg(long)]
    metadata: bool,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Use this config file instead of ~/.config/bqlc/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log verbosity on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// BQL statement; read from stdin when omitted
    bql: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries only the generated output
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let target = cli.target.unwrap_or(config.default_target);
    let format = cli.format.unwrap_or(config.format);

    let bql = match cli.bql {
        Some(ref bql) => bql.clone(),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("reading BQL from stdin")?;
            input
        }
    };

    let compiled = BqlCompiler::new()
        .compile(bql.trim())
        .context("compiling BQL")?;

    if cli.metadata {
        print_metadata(&compiled.metadata, format)?;
        return Ok(());
    }

    let options = collect_options(&config, &cli)?;
    let optimized = compiled.optimize(&options).context("binding options")?;
    print_output(&optimized, target, format)
}

/// Config defaults, then the option file, then `--set`, later ones winning.
fn collect_options(config: &Config, cli: &Cli) -> Result<Options> {
    let mut options = config.default_options().context("reading [defaults]")?;

    if let Some(ref path) = cli.options_file {
        options.extend(config::load_options_file(path)?);
    }

    for assignment in &cli.set {
        let (name, value) = parse_set(assignment)?;
        options.insert(name, value);
    }

    Ok(options)
}

/// Parse `NAME=VALUE`. The value is read as JSON, falling back to a string.
fn parse_set(assignment: &str) -> Result<(String, OptionValue)> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("--set expects NAME=VALUE, got {:?}", assignment))?;
    let name = name.trim().trim_start_matches(':').to_string();
    if name.is_empty() {
        anyhow::bail!("--set expects NAME=VALUE, got {:?}", assignment);
    }

    let json = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    let value = OptionValue::from_json(&name, &json)?;
    Ok((name, value))
}

fn print_output(optimized: &OptimizedStatement, target: Target, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = optimized.output(target);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("{}", optimized.generate(target));
            if target == Target::Sql {
                for bound in &optimized.bound_options {
                    println!("-- {} = {}", bound.name, bound.value);
                }
            }
        }
    }
    Ok(())
}

fn print_metadata(metadata: &Metadata, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(metadata)?),
        OutputFormat::Text => {
            let mut table = match metadata.schema {
                Some(ref schema) => format!("{}.{}", schema, metadata.table),
                None => metadata.table.clone(),
            };
            if let Some(ref alias) = metadata.alias {
                table.push_str(&format!(" AS {}", alias));
            }
            println!("table: {}", table);
            println!("columns: {}", metadata.column_names().join(", "));
        }
    }
    Ok(())
}
