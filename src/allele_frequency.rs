use crate::errors::{ConfigurationError, IngestError, ParseError};
use crate::missing_values::present;

/// Raw allele-frequency fields as read from one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlleleFrequencyInput<'a> {
    pub freq: Option<&'a str>,
    pub allele_count: Option<&'a str>,
    pub n_samples: Option<&'a str>,
    pub is_alt_effect: bool,
}

/// A validated frequency source: direct frequency, or allele count over samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencySource<'a> {
    Frequency(&'a str),
    Counts {
        allele_count: Option<&'a str>,
        n_samples: Option<&'a str>,
    },
}

/// Resolve the alt allele frequency.
///
/// Passing both a frequency and an allele count is a configuration error. Counts
/// are converted as `count / n_samples / 2` (diploid). When the effect is reported
/// for the ref allele (`is_alt_effect == false`) the result is flipped to `1 - f`.
pub fn parse_allele_frequency(input: &AlleleFrequencyInput<'_>) -> Result<Option<f64>, IngestError> {
    let source = match (input.freq, input.allele_count) {
        (Some(_), Some(_)) => return Err(ConfigurationError::FrequencyAndCount.into()),
        (Some(freq), None) => FrequencySource::Frequency(freq),
        (None, allele_count) => FrequencySource::Counts {
            allele_count,
            n_samples: input.n_samples,
        },
    };
    Ok(resolve_frequency(source, input.is_alt_effect)?)
}

pub(crate) fn resolve_frequency(
    source: FrequencySource<'_>,
    is_alt_effect: bool,
) -> Result<Option<f64>, ParseError> {
    let frequency = match source {
        FrequencySource::Frequency(raw) => match present(raw) {
            None => return Ok(None),
            Some(text) => parse_number(text, "allele_freq")?,
        },
        FrequencySource::Counts {
            allele_count,
            n_samples,
        } => match (allele_count.and_then(present), n_samples.and_then(present)) {
            (Some(count), Some(samples)) => {
                parse_number(count, "allele_count")? / parse_number(samples, "n_samples")? / 2.0
            }
            _ => return Ok(None),
        },
    };

    if !(0.0..=1.0).contains(&frequency) {
        return Err(ParseError::FrequencyOutOfRange { value: frequency });
    }

    Ok(Some(if is_alt_effect {
        frequency
    } else {
        1.0 - frequency
    }))
}

fn parse_number(text: &str, field: &'static str) -> Result<f64, ParseError> {
    text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}
