use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::hashing::salted_hash;
use crate::settings::{load_salt, load_settings};

pub fn run(identifiers: &[String]) -> Result<()> {
    let settings = load_settings()?;
    let salt = load_salt(true)?;

    let mut table = Table::new();
    table.set_header(vec!["Identifier", "Hash"]);
    for id in identifiers {
        let hash = salted_hash(Some(id), &salt, settings.digest).unwrap_or_default();
        table.add_row(vec![Cell::new(id), Cell::new(hash)]);
    }
    println!("{table}");
    Ok(())
}
