use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ParseError;
use crate::missing_values::present;

static PVALUE_PARTS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?[\d.]+)(?:[eE]([+-]?\d+))?$").expect("p-value pattern is valid")
});

/// Convert a p-value (or an already -log10 transformed one) into -log10 scale.
///
/// Missing values propagate as `Ok(None)`. A regular p-value must lie in [0, 1].
///
/// Values so small that they underflow to `0.0` as `f64` are recovered from the
/// text itself by splitting off the exponent, e.g. `"1.93e-780"` gives ~779.71.
/// A literal `"0"` carries no precision to recover and maps to `+inf`.
pub fn parse_pval_to_log(raw: Option<&str>, is_already_log: bool) -> Result<Option<f64>, ParseError> {
    let Some(text) = raw.and_then(present) else {
        return Ok(None);
    };

    let value = text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        field: "pvalue",
        value: text.to_string(),
    })?;

    if is_already_log {
        return Ok(Some(value));
    }

    if !(0.0..=1.0).contains(&value) {
        return Err(ParseError::PvalueOutOfRange {
            value: text.to_string(),
        });
    }

    if value == 0.0 {
        if text == "0" {
            return Ok(Some(f64::INFINITY));
        }
        return Ok(Some(log_from_text(text)));
    }

    Ok(Some(-value.log10()))
}

// Slow path, only reached when the float conversion itself underflowed.
fn log_from_text(text: &str) -> f64 {
    let Some(captures) = PVALUE_PARTS_REGEX.captures(text) else {
        return f64::INFINITY;
    };

    let mantissa = captures
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let exponent = captures
        .get(2)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    if mantissa == 0.0 {
        return f64::INFINITY;
    }
    -(mantissa.log10() + exponent)
}
