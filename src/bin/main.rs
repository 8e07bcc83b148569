//! CLI tool for expanding wildcard prompt templates
use anyhow::{bail, Context, Result};
use clap::Parser;
use prompt_wildcards::{diagnostic, expand, ExpandOptions, TagLibrary, DEFAULT_SIZE};
use rand::Rng;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

/// Expand a prompt template against a directory of tag files
#[derive(Parser, Debug)]
#[command(name = "wildcards")]
#[command(about = "Expand wildcard prompt templates against a tag library")]
struct Args {
    /// Template file, or `-` to read from stdin
    template: Option<String>,

    /// Tag library root
    #[arg(long, short = 'r', env = "WILDCARDS_ROOT", default_value = "./wildcards")]
    root: PathBuf,

    /// Seed for deterministic output (default: random, printed to stderr)
    #[arg(long, short = 's')]
    seed: Option<u64>,

    /// Default width, overridden by `@@width=..@@`
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    width: u32,

    /// Default height, overridden by `@@height=..@@`
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    height: u32,

    /// Base negative prompt the generated negatives are appended to
    #[arg(long, short = 'n', default_value = "")]
    negative: String,

    /// Print the full expansion as JSON
    #[arg(long)]
    json: bool,

    /// Include a per-pass trace (implies --json)
    #[arg(long)]
    trace: bool,

    /// Parse every tag source and report problems
    #[arg(long)]
    check: bool,

    /// Print file names and structured tags as JSON
    #[arg(long)]
    catalog: bool,
}

fn read_template(source: &str) -> Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Error reading from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(source).with_context(|| format!("Error reading file '{}'", source))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let library = TagLibrary::new(&args.root);

    if args.check {
        let issues = library.check();
        for issue in &issues {
            eprint!("{}", diagnostic::report_issue(issue));
        }
        if !issues.is_empty() {
            eprintln!("{} tag source(s) failed to parse", issues.len());
            process::exit(1);
        }
        eprintln!("All tag sources under {} parsed", library.root().display());
        return Ok(());
    }

    if args.catalog {
        println!("{}", serde_json::to_string_pretty(&library.catalog())?);
        return Ok(());
    }

    let Some(source) = args.template.as_deref() else {
        bail!("A template file (or `-` for stdin) is required");
    };
    let template = read_template(source)?;

    let seed = args.seed.unwrap_or_else(|| {
        let seed = rand::thread_rng().gen();
        eprintln!("seed: {}", seed);
        seed
    });
    let options = ExpandOptions::new(seed)
        .with_size(args.width, args.height)
        .with_negative(args.negative.clone())
        .with_trace(args.trace);

    let expansion = expand(&library, &template, &options);
    if args.json || args.trace {
        println!("{}", serde_json::to_string_pretty(&expansion)?);
    } else {
        println!("{}", expansion.text);
        if !expansion.negative.is_empty() {
            eprintln!("negative: {}", expansion.negative);
        }
    }
    Ok(())
}
