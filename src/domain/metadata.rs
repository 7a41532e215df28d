//! Marker-delimited metadata: parsing, default merging, and placeholder
//! substitution.
//!
//! Post sources carry metadata as lines of the form `@@key=value`, and
//! templates reference values through `@@key@@` tokens. Both sides share the
//! configured marker string.

use std::collections::HashMap;

/// String key/value metadata for one source file or for the whole site.
pub type Metadata = HashMap<String, String>;

/// Result of a metadata parse: the extracted values plus the number of lines
/// that carried the marker but no `=` and were ignored.
#[derive(Debug, Default)]
pub struct ParsedMetadata {
    pub values: Metadata,
    pub skipped: usize,
}

/// Parse marker-prefixed `key=value` lines into a metadata map.
///
/// The first occurrence of the marker is stripped, whitespace is compacted,
/// and the line splits on its first `=` only, so values may themselves
/// contain `=`. A repeated key keeps the last value. Lines without `=` are
/// counted and otherwise ignored; this never fails.
pub fn parse_metadata_lines<'a, I>(lines: I, marker: &str) -> ParsedMetadata
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = ParsedMetadata::default();

    for line in lines {
        let stripped = match line.find(marker) {
            Some(at) => format!("{}{}", &line[..at], &line[at + marker.len()..]),
            None => line.to_string(),
        };
        let compacted = compact_whitespace(&stripped);

        match compacted.split_once('=') {
            Some((key, value)) => {
                parsed
                    .values
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            None => parsed.skipped += 1,
        }
    }

    parsed
}

/// Merge file-local metadata with site-wide defaults. File-local keys always
/// win; defaults fill only the keys the file did not declare.
pub fn merge_with_defaults(file: Metadata, defaults: &Metadata) -> Metadata {
    let mut merged = file;
    for (key, value) in defaults {
        merged
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    merged
}

/// Replace every occurrence of `marker + key + marker` in `haystack` with the
/// key's value, for every key in the map.
///
/// Replacement is literal and global. Tokens with no matching key pass
/// through unchanged, and the map itself is never mutated. Key iteration
/// order does not affect the result as long as no key's token is a substring
/// of another's.
pub fn apply_replacements(replacements: &Metadata, haystack: &str, marker: &str) -> String {
    let mut output = haystack.to_string();
    for (key, value) in replacements {
        let token = format!("{marker}{key}{marker}");
        output = output.replace(&token, value);
    }
    output
}

fn compact_whitespace(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_gap = false;
    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            in_gap = true;
            continue;
        }
        if in_gap && !output.is_empty() {
            output.push(' ');
        }
        in_gap = false;
        output.push(ch);
    }
    output
}
