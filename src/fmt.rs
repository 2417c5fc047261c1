/// Format a float the way the statement does: comma decimal, no grouping. `-150,00`
pub fn decimal_comma(val: f64) -> String {
    format!("{val:.2}").replace('.', ",")
}

/// Format a float as a euro amount with thousands separators: €1.234,56
pub fn euro(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-€{with_dots},{dec_part}")
    } else {
        format!("€{with_dots},{dec_part}")
    }
}

/// Shorten a hex digest for on-screen tables.
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}
