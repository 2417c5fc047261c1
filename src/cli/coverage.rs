use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::build_pipeline;
use crate::error::Result;
use crate::fmt::{euro, short_hash};
use crate::importer::read_statement;
use crate::models::EnrichedRecord;
use crate::pipeline::{unresolved_counterparties, Coverage};

pub fn run(file: &str, rules: Option<&str>, top: usize, counterparty: Option<&str>) -> Result<()> {
    let (_, pipeline) = build_pipeline(rules)?;
    let enriched = pipeline.run(read_statement(&PathBuf::from(file))?);

    println!("{}", format_coverage(&enriched, top));
    if let Some(cp) = counterparty {
        println!("{}", format_counterparty_rows(&enriched, cp, 5));
    }
    Ok(())
}

/// Summary line plus the largest unresolved counterparty groups.
pub fn format_coverage(records: &[EnrichedRecord], top: usize) -> String {
    let cov = Coverage::of(records);
    let pct = format!("{:.1}%", cov.percent_resolved());
    let pct = if cov.percent_resolved() >= 80.0 {
        pct.green()
    } else {
        pct.yellow()
    };
    let summary = format!("{} of {} rows resolved ({pct})", cov.resolved, cov.rows);

    let groups = unresolved_counterparties(records);
    if groups.is_empty() {
        return summary;
    }

    let mut table = Table::new();
    table.set_header(vec!["Counterparty", "Rows"]);
    for (counterparty, rows) in groups.iter().take(top) {
        let label = if counterparty.is_empty() {
            "(none)".to_string()
        } else {
            counterparty.clone()
        };
        table.add_row(vec![Cell::new(label), Cell::new(rows)]);
    }
    format!("{summary}\nUnresolved counterparties\n{table}")
}

/// Rows for one raw counterparty, the way it appears in the statement.
pub fn format_counterparty_rows(records: &[EnrichedRecord], counterparty: &str, n: usize) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Hash", "Company"]);
    for rec in records
        .iter()
        .filter(|r| {
            r.record
                .counterparty
                .as_deref()
                .is_some_and(|c| c.contains(counterparty))
        })
        .take(n)
    {
        table.add_row(vec![
            Cell::new(rec.record.date.format("%Y-%m-%d")),
            Cell::new(&rec.record.description),
            Cell::new(euro(rec.signed_amount())),
            Cell::new(rec.counterparty_hash.as_deref().map(short_hash).unwrap_or_default()),
            Cell::new(rec.company_name.as_deref().unwrap_or("")),
        ]);
    }
    table.to_string()
}
