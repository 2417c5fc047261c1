use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;
use crate::models::{CompanyDimRow, StarSchema, TransactionInfoDimRow};

pub const COMPANY_FILE: &str = "company_dimension.csv";
pub const TRANSACTION_INFO_FILE: &str = "transaction_info_dimension.csv";
pub const FACT_FILE: &str = "fact_transactions.csv";

fn write_rows<W: Write, T: Serialize>(writer: W, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_companies<W: Write>(writer: W, schema: &StarSchema) -> Result<()> {
    write_rows(writer, schema.companies.iter().map(CompanyDimRow::from))
}

pub fn write_transaction_info<W: Write>(writer: W, schema: &StarSchema) -> Result<()> {
    write_rows(
        writer,
        schema.transaction_info.iter().map(TransactionInfoDimRow::from),
    )
}

pub fn write_facts<W: Write>(writer: W, schema: &StarSchema) -> Result<()> {
    write_rows(writer, schema.facts.iter())
}

fn staged(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_staged(
    path: &Path,
    write: impl FnOnce(std::io::BufWriter<std::fs::File>) -> Result<()>,
) -> Result<PathBuf> {
    let tmp = staged(path);
    let file = std::fs::File::create(&tmp)?;
    if let Err(e) = write(std::io::BufWriter::new(file)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

fn remove_all(paths: &[PathBuf]) {
    for p in paths {
        let _ = std::fs::remove_file(p);
    }
}

/// Write all three tables. Nothing replaces the previous outputs unless every table was written.
pub fn write_star_schema(output_dir: &Path, schema: &StarSchema) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let targets = [
        output_dir.join(COMPANY_FILE),
        output_dir.join(TRANSACTION_INFO_FILE),
        output_dir.join(FACT_FILE),
    ];
    let writers: [&dyn Fn(std::io::BufWriter<std::fs::File>) -> Result<()>; 3] = [
        &|w| write_companies(w, schema),
        &|w| write_transaction_info(w, schema),
        &|w| write_facts(w, schema),
    ];

    let mut tmps = Vec::with_capacity(targets.len());
    for (target, write) in targets.iter().zip(writers) {
        match write_staged(target, write) {
            Ok(tmp) => tmps.push(tmp),
            Err(e) => {
                remove_all(&tmps);
                return Err(e);
            }
        }
    }

    for (i, (tmp, target)) in tmps.iter().zip(&targets).enumerate() {
        if let Err(e) = std::fs::rename(tmp, target) {
            let replaced: Vec<String> = targets[..i].iter().map(|t| t.display().to_string()).collect();
            error!(
                failed = %target.display(),
                replaced = ?replaced,
                "output set is mixed: earlier tables were already replaced"
            );
            remove_all(&tmps[i..]);
            return Err(e.into());
        }
        info!(file = %target.display(), "wrote table");
    }
    Ok(targets.to_vec())
}
