use std::path::Path;

use crate::tally::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Identifiers for the rows that do not carry one: the file name and the line number.
pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Reads the number of identical ballots held by a row. Empty cells count
/// as one ballot.
pub fn parse_count(content: &str, lineno: usize) -> TallyResult<u64> {
    let s = content.trim();
    if s.is_empty() {
        return Ok(1);
    }
    if let Ok(x) = s.parse::<u64>() {
        return Ok(x);
    }
    // Spreadsheets write integers as floats.
    match s.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        _ => InvalidCountSnafu {
            lineno,
            content: s.to_string(),
        }
        .fail(),
    }
}
