use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};
use tracing::info;

use crate::cli::build_pipeline;
use crate::dimensions::build_star_schema;
use crate::error::Result;
use crate::export::write_star_schema;
use crate::fmt::{euro, short_hash};
use crate::importer::read_statement;
use crate::models::{yes_no, EnrichedRecord};
use crate::pipeline::Coverage;
use crate::settings::shellexpand_path;

pub fn run(
    file: &str,
    output_dir: Option<&str>,
    rules: Option<&str>,
    preview: Option<usize>,
) -> Result<()> {
    let (settings, pipeline) = build_pipeline(rules)?;
    let output_dir = PathBuf::from(shellexpand_path(output_dir.unwrap_or(&settings.output_dir)));

    let records = read_statement(&PathBuf::from(file))?;
    let enriched = pipeline.run(records);
    let schema = build_star_schema(&enriched)?;

    if let Some(n) = preview {
        println!("{}", format_preview(&enriched, n));
    }

    let written = write_star_schema(&output_dir, &schema)?;
    info!(dir = %output_dir.display(), "run complete");

    let cov = Coverage::of(&enriched);
    println!(
        "{} rows, {} companies, {} transaction types",
        schema.facts.len(),
        schema.companies.len(),
        schema.transaction_info.len()
    );
    println!(
        "{} of rows resolved to a company",
        format!("{:.1}%", cov.percent_resolved()).bold()
    );
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn format_preview(records: &[EnrichedRecord], n: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Description",
        "Counterparty",
        "Type",
        "Amount",
        "Company",
        "Category",
        "Salary",
        "Income",
        "Expense",
    ]);
    for rec in records.iter().take(n) {
        table.add_row(vec![
            Cell::new(rec.record.date.format("%Y-%m-%d")),
            Cell::new(&rec.record.description),
            Cell::new(rec.counterparty_hash.as_deref().map(short_hash).unwrap_or_default()),
            Cell::new(rec.direction.label()),
            Cell::new(euro(rec.signed_amount())),
            Cell::new(rec.company_name.as_deref().unwrap_or("")),
            Cell::new(rec.expense_category.as_deref().unwrap_or("")),
            Cell::new(yes_no(rec.flags.is_salary)),
            Cell::new(yes_no(rec.flags.is_income)),
            Cell::new(yes_no(rec.flags.is_expense)),
        ]);
    }
    table.to_string()
}
