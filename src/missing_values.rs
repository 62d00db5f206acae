use crate::errors::ParseError;

/// Tokens that GWAS tools write in place of an absent value.
pub const MISSING_VALUES: [&str; 11] = [
    "", ".", "NA", "N/A", "nan", "-nan", "NaN", "-NaN", "null", "NULL", "None",
];

pub fn is_missing(value: &str) -> bool {
    MISSING_VALUES.contains(&value.trim())
}

/// Whether a (1-based) column was specified.
pub fn has(column: Option<usize>) -> bool {
    column.is_some()
}

/// Map every sentinel to `None`, passing other values through trimmed.
pub fn missing_to_null<'a>(values: &[&'a str]) -> Vec<Option<&'a str>> {
    values.iter().map(|value| present(value)).collect()
}

/// A single value, or `None` if it is a sentinel.
pub fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if is_missing(trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// Sentinel-aware float coercion.
pub fn parse_optional_float(value: &str, field: &'static str) -> Result<Option<f64>, ParseError> {
    match present(value) {
        None => Ok(None),
        Some(text) => text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParseError::InvalidNumber {
                field,
                value: text.to_string(),
            }),
    }
}

/// Sentinel-aware unsigned integer coercion.
pub fn parse_optional_u64(value: &str, field: &'static str) -> Result<Option<u64>, ParseError> {
    match present(value) {
        None => Ok(None),
        Some(text) => text
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ParseError::InvalidNumber {
                field,
                value: text.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_to_null() {
        let values = ["0.5", "NA", ".", "", "-nan", "rs123", "None"];
        assert_eq!(
            missing_to_null(&values),
            vec![Some("0.5"), None, None, None, None, Some("rs123"), None]
        );
    }

    #[test]
    fn test_has() {
        assert!(has(Some(1)));
        assert!(!has(None));
    }

    #[test]
    fn test_parse_optional_float() {
        assert_eq!(parse_optional_float(" 1.25 ", "beta").unwrap(), Some(1.25));
        assert_eq!(parse_optional_float("NA", "beta").unwrap(), None);
        assert!(matches!(
            parse_optional_float("abc", "beta"),
            Err(ParseError::InvalidNumber { field: "beta", .. })
        ));
    }

    #[test]
    fn test_case_matters_for_sentinels() {
        // "na" is not in the closed set
        assert!(!is_missing("na"));
        assert!(is_missing("N/A"));
    }
}
