//! `license-attribution` — attribute third-party licenses for the files shipped in a build.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config (`config::load_config`) and build the engine.
//! 3. Read the file references per output group (`--refs` or stdin).
//! 4. Resolve each reference to a package and its license (`engine`).
//! 5. Render the requested report (`report`).
//! 6. Exit `0` (clean) or `1` (unacceptable license or aborted run).

mod cli;

use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, ReportFormat};
use license_attribution::config::load_config;
use license_attribution::engine::AttributionEngine;
use license_attribution::error::AttributionError;
use license_attribution::fs::RealFileSystem;
use license_attribution::report::text::{group_file_name, TextRenderer};
use license_attribution::report::{terminal, Renderer};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Resolve project path
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let config = load_config(&path, cli.config.as_deref())?;
    let mut engine = config.build_engine(&path, Box::new(RealFileSystem))?;

    let references = read_references(&cli)?;

    if let Err(err) = process(&mut engine, &path, &references) {
        terminal::render_diagnostics(engine.diagnostics());
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(1);
    }

    match cli.report {
        ReportFormat::Terminal => {
            terminal::render(
                &engine.all_modules(),
                engine.diagnostics(),
                &path,
                cli.quiet,
            );
        }
        ReportFormat::Json => {
            let groups: BTreeMap<String, Vec<_>> = engine
                .groups()
                .into_iter()
                .map(|group| {
                    let modules = engine.modules_for_group(&group);
                    (group, modules)
                })
                .collect();
            let report = serde_json::json!({
                "groups": groups,
                "modules": engine.all_modules(),
                "diagnostics": engine.diagnostics(),
            });
            let rendered = format!("{}\n", serde_json::to_string_pretty(&report)?);
            write_output(cli.output.as_deref(), &rendered)?;
        }
        ReportFormat::Text => {
            if cli.per_group {
                let dir = cli.output.as_deref().unwrap_or(Path::new("."));
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                for group in engine.groups() {
                    let rendered = TextRenderer.render(&engine.modules_for_group(&group));
                    write_output(Some(&dir.join(group_file_name(&group))), &rendered)?;
                }
            } else {
                let rendered = TextRenderer.render(&engine.all_modules());
                write_output(cli.output.as_deref(), &rendered)?;
            }
            if !cli.quiet {
                terminal::render_diagnostics(engine.diagnostics());
            }
        }
    }

    if engine.diagnostics().iter().any(|d| d.is_error()) {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// File references per group, from `--refs` or from stdin (one path per line).
fn read_references(cli: &Cli) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    if let Some(refs) = &cli.refs {
        let content = std::fs::read_to_string(refs)
            .with_context(|| format!("failed to read {}", refs.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", refs.display()));
    }

    let mut paths = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read file paths from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(BTreeMap::from([(cli.group.clone(), paths)]))
}

fn process(
    engine: &mut AttributionEngine,
    project: &Path,
    references: &BTreeMap<String, Vec<PathBuf>>,
) -> Result<(), AttributionError> {
    for (group, files) in references {
        for file in files {
            engine.process_file(group, &project.join(file))?;
        }
        engine.process_additional(group)?;
    }
    Ok(())
}

fn write_output(target: Option<&Path>, content: &str) -> Result<()> {
    match target {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
