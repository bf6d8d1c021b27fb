//! Utility functions for gathering addresses to probe.

use crate::error::MailProbeError;
use std::fs;
use std::path::Path;

/// Extract addresses from list-file content.
///
/// Takes the first whitespace-delimited token of each line, where whitespace
/// inside a quoted local part (`"john doe"@example.com`) does not end the
/// token. Blank lines and lines starting with `#` are skipped, as is anything
/// after the token, so trailing comments work while `#` stays legal inside an
/// address.
pub fn parse_address_list(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(first_entry)
        .filter(|entry| !entry.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn first_entry(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                return Some(&line[..i]).filter(|entry| !entry.is_empty());
            }
            _ => {}
        }
    }

    Some(line).filter(|entry| !entry.is_empty())
}

/// Read an address list file.
///
/// # Errors
///
/// Returns `MailProbeError::FileError` if the file is missing or unreadable.
/// An existing file with no entries is not an error.
pub fn read_address_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, MailProbeError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MailProbeError::file_error(
            path.to_string_lossy(),
            "File not found",
        ));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        MailProbeError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })?;

    let addresses = parse_address_list(&content);
    tracing::debug!(
        "Read {} addresses from {}",
        addresses.len(),
        path.display()
    );
    Ok(addresses)
}

/// Combine command-line addresses with those from an optional list file,
/// command-line entries first.
pub fn collect_addresses(
    positional: &[String],
    file: Option<&Path>,
) -> Result<Vec<String>, MailProbeError> {
    let mut addresses: Vec<String> = positional.to_vec();
    if let Some(path) = file {
        addresses.extend(read_address_file(path)?);
    }
    Ok(addresses)
}
