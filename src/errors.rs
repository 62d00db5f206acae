use thiserror::Error;

/// Contradictory or incomplete parser configuration, detected once when a parser is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Must specify either a marker column or chromosome and position columns")]
    MissingVariantColumns,

    #[error("Cannot specify a marker column together with chromosome/position columns")]
    MarkerAndPosition,

    #[error("Chromosome and position columns must be specified together")]
    IncompletePosition,

    #[error("A p-value column must be specified")]
    MissingPvalueColumn,

    #[error("Allele frequency and allele count are mutually exclusive")]
    FrequencyAndCount,

    #[error("Allele count requires the number of samples")]
    CountWithoutSamples,

    #[error("Number of samples is only meaningful together with allele count")]
    SamplesWithoutCount,

    #[error("Column numbers are 1-based; '{field}' cannot be 0")]
    ZeroColumn { field: &'static str },
}

/// A single input line that breaks a required-field or numeric-range contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Could not parse marker: '{value}'")]
    InvalidMarker { value: String },

    #[error("Invalid chromosome: '{value}'")]
    InvalidChromosome { value: String },

    #[error("Invalid chromosome specified: value '{value}' is an rsID")]
    RsidAsChromosome { value: String },

    #[error("Invalid position: '{value}'")]
    InvalidPosition { value: String },

    #[error("Invalid numeric value for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("p-value is not in the allowed range [0, 1]: '{value}'")]
    PvalueOutOfRange { value: String },

    #[error("Allele frequency is not in the allowed range [0, 1]: {value}")]
    FrequencyOutOfRange { value: f64 },

    #[error("Required field {field} is missing")]
    MissingField { field: &'static str },

    #[error("Column {column} ({field}) not present; line has {found} fields")]
    MissingColumn {
        field: &'static str,
        column: usize,
        found: usize,
    },

    #[error("Sample data must provide all required BED columns")]
    MissingBedColumns,

    #[error("Block sizes, block starts and block count disagree ({sizes}, {starts}, {count})")]
    BlockCountMismatch {
        sizes: usize,
        starts: usize,
        count: usize,
    },

    #[error("Expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Failed to parse line '{line}': {source}")]
    Line {
        line: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Attach the offending line to a field-level error.
    pub fn in_line(self, line: &str) -> Self {
        ParseError::Line {
            line: line.to_string(),
            source: Box::new(self),
        }
    }

    /// The field-level error, looking through any line wrapper.
    pub fn root(&self) -> &ParseError {
        match self {
            ParseError::Line { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors from operations that can fail for more than one reason.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid column mapping: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File is empty or contains no data lines")]
    EmptyFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_wrapper_keeps_root_cause() {
        let err = ParseError::PvalueOutOfRange {
            value: "1.5".to_string(),
        }
        .in_line("1\t100\t1.5");

        assert!(err.to_string().contains("1\t100\t1.5"));
        assert!(matches!(err.root(), ParseError::PvalueOutOfRange { .. }));
    }
}
