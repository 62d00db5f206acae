use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allele_frequency::{resolve_frequency, FrequencySource};
use crate::errors::{ConfigurationError, IngestError, ParseError};
use crate::line_parser::{strip_line_ending, LineParser};
use crate::missing_values::{has, parse_optional_float, present};
use crate::parse_marker::{check_chromosome, normalize_chromosome, parse_marker};
use crate::transform_pvalue::parse_pval_to_log;

/// Column layout of a GWAS file. Column numbers are 1-based.
///
/// Also used as the (partial) column mapping produced by the format sniffer,
/// which is why every column is optional here; completeness is checked by
/// [`GwasParser::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GwasParserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrom_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsid_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvalue_col: Option<usize>,
    pub is_neg_log_pvalue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_beta_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allele_freq_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allele_count_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_samples_col: Option<usize>,
    pub is_alt_effect: bool,
    pub delimiter: char,
}

impl Default for GwasParserConfig {
    fn default() -> Self {
        Self {
            marker_col: None,
            chrom_col: None,
            pos_col: None,
            ref_col: None,
            alt_col: None,
            rsid_col: None,
            pvalue_col: None,
            is_neg_log_pvalue: false,
            beta_col: None,
            stderr_beta_col: None,
            allele_freq_col: None,
            allele_count_col: None,
            n_samples_col: None,
            is_alt_effect: true,
            delimiter: '\t',
        }
    }
}

impl GwasParserConfig {
    /// Read a column mapping from a JSON file, e.g. `{"marker_col": 3, "pvalue_col": 12}`.
    ///
    /// A `delimiter` given here replaces the one in the file.
    pub fn from_json_file<P: AsRef<Path>>(
        path: P,
        delimiter: Option<char>,
    ) -> Result<Self, IngestError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut config: Self = serde_json::from_reader(reader)?;
        if let Some(delimiter) = delimiter {
            config.delimiter = delimiter;
        }
        debug!(path = %path.as_ref().display(), delimiter = ?config.delimiter, "Loaded column mapping");
        Ok(config)
    }
}

/// One parsed line of summary statistics.
///
/// Field names are the ones the plotting layer reads, so they are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GwasRecord {
    pub chromosome: String,
    pub position: u64,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub variant: String,
    pub rsid: Option<String>,
    pub log_pvalue: f64,
    pub beta: Option<f64>,
    pub stderr_beta: Option<f64>,
    pub alt_allele_freq: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariantColumns {
    Marker(usize),
    Discrete { chrom: usize, pos: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrequencyColumns {
    Frequency(usize),
    Counts { allele_count: usize, n_samples: usize },
}

/// A validated GWAS line parser. All column indices are stored 0-based.
#[derive(Debug, Clone)]
pub struct GwasParser {
    config: GwasParserConfig,
    variant: VariantColumns,
    ref_col: Option<usize>,
    alt_col: Option<usize>,
    rsid_col: Option<usize>,
    pvalue_col: usize,
    beta_col: Option<usize>,
    stderr_beta_col: Option<usize>,
    frequency: Option<FrequencyColumns>,
}

/// Build a GWAS line parser; free-function form of [`GwasParser::new`].
pub fn make_gwas_parser(config: GwasParserConfig) -> Result<GwasParser, ConfigurationError> {
    GwasParser::new(config)
}

fn zero_based(column: Option<usize>, field: &'static str) -> Result<Option<usize>, ConfigurationError> {
    match column {
        Some(0) => Err(ConfigurationError::ZeroColumn { field }),
        Some(column) => Ok(Some(column - 1)),
        None => Ok(None),
    }
}

impl GwasParser {
    /// Validate a configuration once and resolve it into a reusable parser.
    pub fn new(config: GwasParserConfig) -> Result<Self, ConfigurationError> {
        let marker = zero_based(config.marker_col, "marker_col")?;
        let chrom = zero_based(config.chrom_col, "chrom_col")?;
        let pos = zero_based(config.pos_col, "pos_col")?;

        let variant = match (marker, chrom, pos) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigurationError::MarkerAndPosition)
            }
            (Some(marker), None, None) => VariantColumns::Marker(marker),
            (None, Some(chrom), Some(pos)) => VariantColumns::Discrete { chrom, pos },
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(ConfigurationError::IncompletePosition)
            }
            (None, None, None) => return Err(ConfigurationError::MissingVariantColumns),
        };

        let pvalue_col = zero_based(config.pvalue_col, "pvalue_col")?
            .ok_or(ConfigurationError::MissingPvalueColumn)?;

        if has(config.allele_freq_col) && has(config.allele_count_col) {
            return Err(ConfigurationError::FrequencyAndCount);
        }
        let frequency = match (
            zero_based(config.allele_freq_col, "allele_freq_col")?,
            zero_based(config.allele_count_col, "allele_count_col")?,
            zero_based(config.n_samples_col, "n_samples_col")?,
        ) {
            (Some(freq), None, None) => Some(FrequencyColumns::Frequency(freq)),
            (None, Some(allele_count), Some(n_samples)) => Some(FrequencyColumns::Counts {
                allele_count,
                n_samples,
            }),
            (None, Some(_), None) => return Err(ConfigurationError::CountWithoutSamples),
            (_, None, Some(_)) => return Err(ConfigurationError::SamplesWithoutCount),
            (None, None, None) => None,
            (Some(_), Some(_), _) => return Err(ConfigurationError::FrequencyAndCount),
        };

        let parser = Self {
            variant,
            ref_col: zero_based(config.ref_col, "ref_col")?,
            alt_col: zero_based(config.alt_col, "alt_col")?,
            rsid_col: zero_based(config.rsid_col, "rsid_col")?,
            pvalue_col,
            beta_col: zero_based(config.beta_col, "beta_col")?,
            stderr_beta_col: zero_based(config.stderr_beta_col, "stderr_beta_col")?,
            frequency,
            config,
        };
        debug!(config = ?parser.config, "Built GWAS line parser");
        Ok(parser)
    }

    pub fn config(&self) -> &GwasParserConfig {
        &self.config
    }

    fn parse_fields(&self, fields: &[&str]) -> Result<GwasRecord, ParseError> {
        let (chrom, pos, mut ref_allele, mut alt_allele) = match self.variant {
            VariantColumns::Marker(column) => {
                let marker = field(fields, column, "marker")?;
                let parts = parse_marker(marker, false)?.ok_or_else(|| ParseError::InvalidMarker {
                    value: marker.to_string(),
                })?;
                (parts.chrom, parts.pos, parts.ref_allele, parts.alt_allele)
            }
            VariantColumns::Discrete { chrom, pos } => (
                field(fields, chrom, "chromosome")?,
                field(fields, pos, "position")?,
                None,
                None,
            ),
        };

        // Dedicated allele columns win over alleles embedded in a marker.
        if let Some(column) = self.ref_col {
            ref_allele = Some(field(fields, column, "ref_allele")?);
        }
        if let Some(column) = self.alt_col {
            alt_allele = Some(field(fields, column, "alt_allele")?);
        }

        let chromosome = normalize_chromosome(chrom);
        check_chromosome(&chromosome)?;
        let position = parse_position(pos)?;

        let ref_allele = normalize_allele(ref_allele);
        let alt_allele = normalize_allele(alt_allele);

        let rsid = match self.rsid_col {
            Some(column) => normalize_rsid(field(fields, column, "rsid")?),
            None => None,
        };

        let log_pvalue = parse_pval_to_log(
            Some(field(fields, self.pvalue_col, "pvalue")?),
            self.config.is_neg_log_pvalue,
        )?
        .ok_or(ParseError::MissingField { field: "pvalue" })?;

        let beta = match self.beta_col {
            Some(column) => parse_optional_float(field(fields, column, "beta")?, "beta")?,
            None => None,
        };
        let stderr_beta = match self.stderr_beta_col {
            Some(column) => parse_optional_float(field(fields, column, "stderr_beta")?, "stderr_beta")?,
            None => None,
        };

        let alt_allele_freq = match self.frequency {
            Some(FrequencyColumns::Frequency(column)) => resolve_frequency(
                FrequencySource::Frequency(field(fields, column, "allele_freq")?),
                self.config.is_alt_effect,
            )?,
            Some(FrequencyColumns::Counts {
                allele_count,
                n_samples,
            }) => resolve_frequency(
                FrequencySource::Counts {
                    allele_count: Some(field(fields, allele_count, "allele_count")?),
                    n_samples: Some(field(fields, n_samples, "n_samples")?),
                },
                self.config.is_alt_effect,
            )?,
            None => None,
        };

        let variant = match (&ref_allele, &alt_allele) {
            (Some(ref_allele), Some(alt_allele)) => {
                format!("{chromosome}:{position}_{ref_allele}/{alt_allele}")
            }
            _ => format!("{chromosome}:{position}"),
        };

        Ok(GwasRecord {
            chromosome,
            position,
            ref_allele,
            alt_allele,
            variant,
            rsid,
            log_pvalue,
            beta,
            stderr_beta,
            alt_allele_freq,
        })
    }
}

impl LineParser for GwasParser {
    type Record = GwasRecord;

    fn parse_line(&self, line: &str) -> Result<GwasRecord, ParseError> {
        let line = strip_line_ending(line);
        let fields: Vec<&str> = line.split(self.config.delimiter).collect();
        self.parse_fields(&fields).map_err(|e| e.in_line(line))
    }
}

fn field<'a>(fields: &[&'a str], column: usize, name: &'static str) -> Result<&'a str, ParseError> {
    fields
        .get(column)
        .map(|value| value.trim())
        .ok_or(ParseError::MissingColumn {
            field: name,
            column: column + 1,
            found: fields.len(),
        })
}

fn parse_position(value: &str) -> Result<u64, ParseError> {
    match value.parse::<u64>() {
        Ok(position) if position >= 1 => Ok(position),
        _ => Err(ParseError::InvalidPosition {
            value: value.to_string(),
        }),
    }
}

fn normalize_allele(value: Option<&str>) -> Option<String> {
    value.and_then(present).map(|allele| allele.to_uppercase())
}

fn normalize_rsid(value: &str) -> Option<String> {
    let rsid = present(value)?.to_lowercase();
    if rsid.starts_with("rs") {
        Some(rsid)
    } else {
        Some(format!("rs{rsid}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_config() -> GwasParserConfig {
        GwasParserConfig {
            marker_col: Some(1),
            pvalue_col: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_marker_and_position() {
        let config = GwasParserConfig {
            chrom_col: Some(3),
            pos_col: Some(4),
            ..marker_config()
        };
        assert_eq!(
            GwasParser::new(config).unwrap_err(),
            ConfigurationError::MarkerAndPosition
        );
    }

    #[test]
    fn test_rejects_missing_position() {
        let config = GwasParserConfig {
            pvalue_col: Some(2),
            ..Default::default()
        };
        assert_eq!(
            GwasParser::new(config).unwrap_err(),
            ConfigurationError::MissingVariantColumns
        );

        let config = GwasParserConfig {
            chrom_col: Some(1),
            pvalue_col: Some(2),
            ..Default::default()
        };
        assert_eq!(
            GwasParser::new(config).unwrap_err(),
            ConfigurationError::IncompletePosition
        );
    }

    #[test]
    fn test_frequency_configuration_rules() {
        let both = GwasParserConfig {
            allele_freq_col: Some(3),
            allele_count_col: Some(4),
            n_samples_col: Some(5),
            ..marker_config()
        };
        assert_eq!(
            GwasParser::new(both).unwrap_err(),
            ConfigurationError::FrequencyAndCount
        );

        let count_only = GwasParserConfig {
            allele_count_col: Some(4),
            ..marker_config()
        };
        assert_eq!(
            GwasParser::new(count_only).unwrap_err(),
            ConfigurationError::CountWithoutSamples
        );
    }

    #[test]
    fn test_rejects_zero_column() {
        let config = GwasParserConfig {
            beta_col: Some(0),
            ..marker_config()
        };
        assert_eq!(
            GwasParser::new(config).unwrap_err(),
            ConfigurationError::ZeroColumn { field: "beta_col" }
        );
    }

    #[test]
    fn test_discrete_columns_and_optional_fields() {
        let parser = GwasParser::new(GwasParserConfig {
            chrom_col: Some(1),
            pos_col: Some(2),
            ref_col: Some(3),
            alt_col: Some(4),
            rsid_col: Some(5),
            pvalue_col: Some(6),
            beta_col: Some(7),
            stderr_beta_col: Some(8),
            allele_freq_col: Some(9),
            is_alt_effect: false,
            ..Default::default()
        })
        .unwrap();

        let record = parser
            .parse_line("chrX\t1000\ta\tg\t12345\t0.01\t-0.5\tNA\t0.2\n")
            .unwrap();
        assert_eq!(record.chromosome, "X");
        assert_eq!(record.position, 1000);
        assert_eq!(record.ref_allele.as_deref(), Some("A"));
        assert_eq!(record.alt_allele.as_deref(), Some("G"));
        assert_eq!(record.variant, "X:1000_A/G");
        assert_eq!(record.rsid.as_deref(), Some("rs12345"));
        assert!((record.log_pvalue - 2.0).abs() < 1e-12);
        assert_eq!(record.beta, Some(-0.5));
        assert_eq!(record.stderr_beta, None);
        assert!((record.alt_allele_freq.unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_missing_allele_gives_short_variant() {
        let parser = GwasParser::new(GwasParserConfig {
            chrom_col: Some(1),
            pos_col: Some(2),
            ref_col: Some(3),
            alt_col: Some(4),
            pvalue_col: Some(5),
            ..Default::default()
        })
        .unwrap();

        let record = parser.parse_line("1\t500\tA\t.\t0.5").unwrap();
        assert_eq!(record.alt_allele, None);
        assert_eq!(record.variant, "1:500");
    }

    #[test]
    fn test_rsid_chromosome_is_rejected() {
        let parser = GwasParser::new(GwasParserConfig {
            chrom_col: Some(1),
            pos_col: Some(2),
            pvalue_col: Some(3),
            ..Default::default()
        })
        .unwrap();

        let err = parser.parse_line("rs123\t500\t0.5").unwrap_err();
        assert!(matches!(err.root(), ParseError::RsidAsChromosome { .. }));
        assert!(err.to_string().contains("rs123\t500\t0.5"));
    }

    #[test]
    fn test_field_errors_name_the_line() {
        let parser = GwasParser::new(marker_config()).unwrap();

        let err = parser.parse_line("1:100_A/C\t2.0").unwrap_err();
        assert!(matches!(err, ParseError::Line { .. }));
        assert!(matches!(err.root(), ParseError::PvalueOutOfRange { .. }));

        let err = parser.parse_line("1:100_A/C").unwrap_err();
        assert!(matches!(
            err.root(),
            ParseError::MissingColumn { column: 2, found: 1, .. }
        ));

        let err = parser.parse_line("1:100_A/C\tNA").unwrap_err();
        assert!(matches!(err.root(), ParseError::MissingField { field: "pvalue" }));

        let err = parser.parse_line("1:0_A/C\t0.5").unwrap_err();
        assert!(matches!(err.root(), ParseError::InvalidPosition { .. }));

        let err = parser.parse_line("rs123\t0.5").unwrap_err();
        assert!(matches!(err, ParseError::Line { ref line, .. } if line == "rs123\t0.5"));
        assert!(matches!(err.root(), ParseError::InvalidMarker { value } if value == "rs123"));

        let err = parser.parse_line("chr:100\t0.5").unwrap_err();
        assert!(matches!(err.root(), ParseError::InvalidChromosome { .. }));
    }

    #[test]
    fn test_bare_chr_in_chromosome_column() {
        let parser = GwasParser::new(GwasParserConfig {
            chrom_col: Some(1),
            pos_col: Some(2),
            pvalue_col: Some(3),
            ..Default::default()
        })
        .unwrap();

        let err = parser.parse_line("chr\t100\t0.5").unwrap_err();
        assert!(matches!(err.root(), ParseError::InvalidChromosome { .. }));
        assert_eq!(parser.parse_line("chrY\t100\t0.5").unwrap().variant, "Y:100");
    }

    #[test]
    fn test_allele_counts_and_custom_delimiter() {
        let parser = GwasParser::new(GwasParserConfig {
            marker_col: Some(1),
            pvalue_col: Some(2),
            allele_count_col: Some(3),
            n_samples_col: Some(4),
            delimiter: ',',
            ..Default::default()
        })
        .unwrap();

        let record = parser.parse_line("chr2:300_G/T,1e-8,25,100").unwrap();
        assert_eq!(record.variant, "2:300_G/T");
        assert_eq!(record.alt_allele_freq, Some(0.125));
        assert!((record.log_pvalue - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_json_defaults() {
        let config: GwasParserConfig =
            serde_json::from_str(r#"{"marker_col": 3, "pvalue_col": 12}"#).unwrap();
        assert_eq!(config.marker_col, Some(3));
        assert!(config.is_alt_effect);
        assert_eq!(config.delimiter, '\t');
        assert!(GwasParser::new(config).is_ok());
    }
}
