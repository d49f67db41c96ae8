//! Common utilities for document generation.
//!
//! Shared helpers for output naming, date formatting and XML escaping.

use chrono::NaiveDate;

use crate::storage::TIMESTAMP_FORMAT;

/// Format a date the way the contract prints it (e.g. "15/01/2025").
pub fn format_br_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Current local time in the format used for generated file names.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Escape text for insertion into WordprocessingML character data.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Base name shared by every artifact of one submission,
/// e.g. `contrato_Maria_Silva_20250110093000`.
pub fn contract_base_name(renter_name: &str, stamp: &str) -> String {
    let underscored = renter_name.trim().replace(' ', "_");
    let safe = sanitize_filename::sanitize(&underscored);
    let safe = safe.trim_matches('.');
    if safe.is_empty() {
        format!("contrato_{}", stamp)
    } else {
        format!("contrato_{}_{}", safe, stamp)
    }
}
