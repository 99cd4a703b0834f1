//! gaql: Google Ads Query Language checker
//!
//! # Usage
//!
//! ```bash
//! # Validate a query
//! gaql "SELECT campaign.id FROM campaign LIMIT 10"
//!
//! # Repair a query read from a file
//! gaql --fix -f report.gaql -o report.fixed.gaql
//!
//! # Lay out a query from stdin
//! cat report.gaql | gaql --format
//! ```

use std::io::{IsTerminal, Read};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::*;
use gaql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gaql")]
#[command(version)]
#[command(about = "Validate, format and repair Google Ads Query Language queries", long_about = None)]
#[command(after_help = "EXAMPLES:
    gaql 'SELECT campaign.id FROM campaign LIMIT 10'
    gaql --strict -f report.gaql
    gaql --fix 'SELECT campaign.id FROM campaing WHERE segments.date = LAST_7_DAYS'
    gaql explain 'SELECT ad_group.id FROM ad_group'")]
struct Cli {
    /// The GAQL query to check
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long, conflicts_with = "query")]
    file: Option<String>,

    /// Fail on the first problem with a typed error
    #[arg(long)]
    strict: bool,

    /// Repair the query and print the fixed version
    #[arg(long, conflicts_with = "format")]
    fix: bool,

    /// Print the query laid out one clause per line
    #[arg(long)]
    format: bool,

    /// Write the fixed or formatted query to a file
    #[arg(short, long)]
    output: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Indentation of the WHERE continuation line
    #[arg(long)]
    indent: Option<usize>,

    /// Debug logging (GAQL_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query and print its structure
    Explain {
        /// The GAQL query to explain
        query: String,
    },
    /// Show the resources, fields and operators the validator knows
    Rules,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("GAQL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = Config::discover()?;
    if !config.output.color {
        colored::control::set_override(false);
    }
    let formatter = Formatter::with_indent(cli.indent.unwrap_or(config.format.indent));

    match &cli.command {
        Some(Commands::Explain { query }) => explain_query(query),
        Some(Commands::Rules) => {
            show_rules();
            Ok(0)
        }
        None => {
            let query = read_query(cli)?;
            if cli.fix {
                fix_query(&query, formatter, cli)
            } else if cli.format {
                write_output(&formatter.format(&query), cli)?;
                Ok(0)
            } else {
                check_query(&query, cli.strict || config.validate.strict, cli)
            }
        }
    }
}

fn read_query(cli: &Cli) -> anyhow::Result<String> {
    if let Some(query) = &cli.query {
        return Ok(query.clone());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path));
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("No query given. Pass QUERY, use --file, or pipe a query on stdin.");
    }
    let mut query = String::new();
    stdin.read_to_string(&mut query).context("Failed to read stdin")?;
    Ok(query)
}

fn write_output(text: &str, cli: &Cli) -> anyhow::Result<()> {
    match &cli.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", text))
                .with_context(|| format!("Failed to write {}", path))?;
            eprintln!("{} Wrote query to {}", "✓".green(), path.cyan());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn check_query(query: &str, strict: bool, cli: &Cli) -> anyhow::Result<i32> {
    let report = gaql::validate(query, strict)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!("{} {}", "✓".green(), "Valid GAQL query".green().bold());
    } else {
        eprintln!("{} {}", "✗".red(), "Invalid GAQL query".red().bold());
        for error in &report.errors {
            eprintln!("  - {}", error);
        }
    }

    Ok(if report.valid { 0 } else { 1 })
}

fn fix_query(query: &str, formatter: Formatter, cli: &Cli) -> anyhow::Result<i32> {
    let (fixed, changes) = Fixer::with_formatter(formatter).fix_query(query);
    let valid = Validator::new().validate(&fixed).valid;

    if cli.json {
        let out = serde_json::json!({
            "query": fixed,
            "valid": valid,
            "changes": changes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        write_output(&fixed, cli)?;
        eprintln!();
        eprintln!("{}", "Changes:".cyan().bold());
        for change in &changes {
            eprintln!("  - {}", change.dimmed());
        }
    }

    Ok(if valid { 0 } else { 1 })
}

fn explain_query(query: &str) -> anyhow::Result<i32> {
    match gaql::parse(query) {
        Ok(parsed) => {
            println!("{}", "Parsed Structure:".green().bold());
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            println!();
            println!("{}", "Canonical GAQL:".green().bold());
            println!("  {}", parsed.to_gaql()?.white());
            Ok(0)
        }
        Err(e) => {
            eprintln!("{} {}", "Parse Error:".red().bold(), e);
            Ok(1)
        }
    }
}

fn show_rules() {
    let rules = Rules::GAQL;

    println!("{}", "Resources:".cyan().bold());
    println!("  {}", rules.resources.join(", "));
    println!();
    println!("{}", "Field prefixes:".cyan().bold());
    println!("  {}", rules.field_prefixes.join(", "));
    println!();
    println!("{}", "Date fields (DURING / BETWEEN):".cyan().bold());
    println!("  {}", rules.date_fields.join(", "));
    println!();
    println!("{}", "Operator restrictions:".cyan().bold());
    for (field, operators) in rules.operator_restrictions {
        let allowed: Vec<&str> = operators.iter().map(Operator::as_str).collect();
        println!("  {:36} {}", field.yellow(), allowed.join(", ").dimmed());
    }
    println!();
    println!("{}", "Parameters (true / false):".cyan().bold());
    println!("  {}", rules.parameters.join(", "));
}
