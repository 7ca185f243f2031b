//! `rubric` command-line tool.
//!
//! # Responsibility
//! - Validate, flatten and evaluate rubric documents without a database.
//! - Exercise `rubric_core` end to end from the shell.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use rubric_core::{
    apply_leaf_values, evaluate, flatten, init_logging, CoreConfig, LeafValues, Node,
};

#[derive(Parser)]
#[command(name = "rubric", version, about = "Composable grading rubric tool")]
struct Cli {
    /// JSON config file; enables logging as configured
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a rubric document and report its size
    Validate {
        /// Rubric document (JSON)
        file: PathBuf,
    },

    /// Print the component and operator rows of a rubric document
    Flatten {
        /// Rubric document (JSON)
        file: PathBuf,
    },

    /// Fill leaf values and print grade, bounds and normalized grade
    Evaluate {
        /// Rubric document (JSON)
        file: PathBuf,

        /// Leaf value as NAME=VALUE; repeatable
        #[arg(long = "value", value_name = "NAME=VALUE", value_parser = parse_leaf_value)]
        values: Vec<(String, f64)>,

        /// Drop values already stored in the document first
        #[arg(long)]
        reset: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.config {
        let config = CoreConfig::load(path)?;
        init_logging(&config.logging).context("failed to initialize logging")?;
    }

    match cli.command {
        Commands::Validate { file } => {
            let root = load_document(&file)?;
            println!(
                "ok: {} components, {} leaves",
                root.node_count(),
                root.leaves().len()
            );
        }
        Commands::Flatten { file } => {
            let root = load_document(&file)?;
            print_json(&flatten(&root))?;
        }
        Commands::Evaluate {
            file,
            values,
            reset,
        } => {
            let mut root = load_document(&file)?;
            if reset {
                root.clear_values();
            }
            debug!(
                "event=cli_evaluate module=cli status=start values={}",
                values.len()
            );
            apply_leaf_values(&mut root, &LeafValues::named(values))
                .with_context(|| format!("failed to fill `{}`", file.display()))?;
            let evaluation = evaluate(&root)
                .with_context(|| format!("failed to evaluate `{}`", file.display()))?;
            print_json(&evaluation)?;
        }
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    let root: Node = serde_json::from_str(&text)
        .with_context(|| format!("invalid rubric document `{}`", path.display()))?;
    root.validate()
        .with_context(|| format!("invalid rubric document `{}`", path.display()))?;
    Ok(root)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{text}");
    Ok(())
}

fn parse_leaf_value(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("leaf name is empty in `{raw}`"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid value in `{raw}`: {err}"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::parse_leaf_value;

    #[test]
    fn parse_leaf_value_splits_on_last_equals() {
        assert_eq!(
            parse_leaf_value("Mix=Master=7.5").unwrap(),
            ("Mix=Master".to_string(), 7.5)
        );
        assert_eq!(
            parse_leaf_value(" Lyrics = 6 ").unwrap(),
            ("Lyrics".to_string(), 6.0)
        );
    }

    #[test]
    fn parse_leaf_value_rejects_malformed_input() {
        assert!(parse_leaf_value("Lyrics").is_err());
        assert!(parse_leaf_value("=4").is_err());
        assert!(parse_leaf_value("Lyrics=high").is_err());
    }
}
