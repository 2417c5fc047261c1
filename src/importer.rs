use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{FinError, Result};
use crate::models::TransactionRecord;

/// Column layout of the bank's semicolon export, in order.
pub const EXPECTED_HEADER: [&str; 11] = [
    "Date",
    "Name / Description",
    "Account",
    "Counterparty",
    "Code",
    "Debit/credit",
    "Amount (EUR)",
    "Transaction type",
    "Notifications",
    "Resulting balance",
    "Tag",
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a locale amount. Comma is the decimal separator when present: `1.234,56`, `-150,00`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim().replace('"', "").replace('€', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = if let Some(comma) = s.rfind(',') {
        // `.` only groups thousands, so it may not follow the decimal comma.
        if s.matches(',').count() > 1 || s[comma..].contains('.') {
            return None;
        }
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `YYYYMMDD` as exported, or ISO `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn optional(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

fn check_header(header: &csv::StringRecord) -> Result<()> {
    let found: Vec<&str> = header
        .iter()
        .map(|f| f.trim_start_matches('\u{feff}').trim())
        .collect();
    if found != EXPECTED_HEADER {
        return Err(FinError::Header(format!(
            "expected [{}], found [{}]",
            EXPECTED_HEADER.join(";"),
            found.join(";")
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Statement reader
// ---------------------------------------------------------------------------

/// Parse a whole statement. Any malformed row fails the batch.
pub fn parse_statement<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    check_header(rdr.headers()?)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() != EXPECTED_HEADER.len() {
            return Err(FinError::MalformedRow {
                line,
                reason: format!(
                    "expected {} columns, found {}",
                    EXPECTED_HEADER.len(),
                    record.len()
                ),
            });
        }
        let malformed = |reason: String| FinError::MalformedRow { line, reason };

        let date = parse_date(&record[0])
            .ok_or_else(|| malformed(format!("unparsable date '{}'", &record[0])))?;
        let amount = parse_amount(&record[6])
            .ok_or_else(|| malformed(format!("unparsable amount '{}'", &record[6])))?;
        let balance = parse_amount(&record[9])
            .ok_or_else(|| malformed(format!("unparsable balance '{}'", &record[9])))?;

        rows.push(TransactionRecord {
            date,
            description: record[1].trim().to_string(),
            account: record[2].trim().to_string(),
            counterparty: optional(&record[3]),
            code: record[4].trim().to_string(),
            debit_credit: record[5].trim().to_string(),
            amount,
            transaction_type: record[7].trim().to_string(),
            notifications: record[8].trim().to_string(),
            balance,
            tag: optional(&record[10]),
            source_cells: record.iter().map(str::to_string).collect(),
        });
    }
    debug!(rows = rows.len(), "parsed statement");
    Ok(rows)
}

pub fn read_statement(file_path: &Path) -> Result<Vec<TransactionRecord>> {
    let file = std::fs::File::open(file_path)?;
    let rows = parse_statement(std::io::BufReader::new(file))?;
    info!(file = %file_path.display(), rows = rows.len(), "read statement");
    Ok(rows)
}
