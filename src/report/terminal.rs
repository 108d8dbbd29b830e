use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::{Diagnostic, ResolvedModule};

/// Render a colored terminal report.
pub fn render(
    modules: &[&ResolvedModule],
    diagnostics: &[Diagnostic],
    path: &Path,
    quiet: bool,
) {
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;
    let missing_text = modules
        .iter()
        .filter(|m| m.license.text.is_none())
        .count();

    if quiet {
        println!(
            "Packages: {}  Without text: {}  Warnings: {}  Errors: {}",
            modules.len(),
            missing_text.to_string().yellow(),
            warnings.to_string().yellow(),
            errors.to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "license-attribution".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Project: {}\n", path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Attributed packages : {}", modules.len()));
    println!(
        " │  {:<48} │",
        format!("Licenses            : {}", summarize_licenses(modules))
    );
    println!(
        " │  {:<48} │",
        format!("{}  Without text     : {:>4}", "⚠".yellow(), missing_text)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Errors           : {:>4}", "✗".red(), errors)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if !modules.is_empty() {
        render_table(modules);
        println!();
    }

    render_diagnostics(diagnostics);
}

/// Print the diagnostics collected during the run, errors first.
pub fn render_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let (errors, warnings): (Vec<&Diagnostic>, Vec<&Diagnostic>) =
        diagnostics.iter().partition(|d| d.is_error());

    for diagnostic in errors {
        eprintln!(" {} {}", "[ERROR]".red().bold(), diagnostic);
    }
    for diagnostic in warnings {
        eprintln!(" {} {}", "[WARN]".yellow().bold(), diagnostic);
    }
}

fn render_table(modules: &[&ResolvedModule]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("License").add_attribute(Attribute::Bold),
            Cell::new("Text").add_attribute(Attribute::Bold),
            Cell::new("Repository").add_attribute(Attribute::Bold),
        ]);

    for module in modules {
        let (license, license_color) = match &module.license.license_type {
            Some(license) => (license.as_str(), Color::Green),
            None => ("unknown", Color::DarkGrey),
        };
        let (text, text_color) = match (&module.license.text, module.text_source) {
            (Some(_), Some(source)) => (source.to_string(), Color::Reset),
            (Some(_), None) => ("yes".to_string(), Color::Reset),
            (None, _) => ("missing".to_string(), Color::Yellow),
        };

        table.add_row(vec![
            Cell::new(module.name()),
            Cell::new(module.version().unwrap_or("-")),
            Cell::new(license).fg(license_color),
            Cell::new(text).fg(text_color),
            Cell::new(module.manifest.repository_url().unwrap_or("")),
        ]);
    }

    println!("{}", table);
}

fn summarize_licenses(modules: &[&ResolvedModule]) -> String {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for module in modules {
        let license = module
            .license
            .license_type
            .as_deref()
            .unwrap_or("unknown");
        *counts.entry(license).or_insert(0) += 1;
    }

    let mut pairs: Vec<(&str, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    pairs
        .iter()
        .take(3)
        .map(|(license, count)| format!("{} ({})", license, count))
        .collect::<Vec<_>>()
        .join(", ")
}
