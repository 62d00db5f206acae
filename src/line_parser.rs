use crate::errors::ParseError;

/// A configured, immutable parser turning one text line into one record.
///
/// Implementors hold no mutable state, so a single parser can be shared across
/// threads and called for any number of lines.
pub trait LineParser: Send + Sync {
    type Record: Send;

    fn parse_line(&self, line: &str) -> Result<Self::Record, ParseError>;
}

/// Remove the line terminator without touching empty trailing fields.
pub(crate) fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
