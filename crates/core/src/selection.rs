//! Parsing of "pick tickets by number" input, e.g. `1, 3,4`

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionWarning {
    OutOfRange(String),
    NotANumber(String),
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionWarning::OutOfRange(entry) => {
                write!(f, "{entry} is not a valid ticket number, skipping")
            }
            SelectionWarning::NotANumber(entry) => {
                write!(f, "'{entry}' is not a number, skipping")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Zero-based indices, in the order they were typed
    pub indices: Vec<usize>,
    pub warnings: Vec<SelectionWarning>,
}

/// Parse a comma separated list of 1-based ticket numbers out of `count` candidates.
///
/// Empty entries are ignored, repeated numbers are kept once, and invalid
/// entries produce a warning instead of failing the whole selection.
pub fn parse_selection(input: &str, count: usize) -> Selection {
    let mut selection = Selection::default();

    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.parse::<usize>() {
            Ok(number) if (1..=count).contains(&number) => {
                let index = number - 1;
                if !selection.indices.contains(&index) {
                    selection.indices.push(index);
                }
            }
            Ok(_) => selection
                .warnings
                .push(SelectionWarning::OutOfRange(entry.to_string())),
            Err(_) if entry.parse::<i64>().is_ok() => selection
                .warnings
                .push(SelectionWarning::OutOfRange(entry.to_string())),
            Err(_) => selection
                .warnings
                .push(SelectionWarning::NotANumber(entry.to_string())),
        }
    }

    selection
}
