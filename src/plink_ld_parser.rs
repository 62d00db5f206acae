// PLINK `--r2` output:
//   CHR_A  BP_A  SNP_A  CHR_B  BP_B  SNP_B  R2
// Tab separated, or the whitespace-aligned table PLINK writes by default.

use serde::Serialize;

use crate::errors::ParseError;
use crate::line_parser::LineParser;
use crate::parse_marker::{check_chromosome, normalize_chromosome, normalize_marker};

const LD_FIELD_COUNT: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LdRecord {
    pub chromosome1: String,
    pub position1: u64,
    pub variant1: String,
    pub chromosome2: String,
    pub position2: u64,
    pub variant2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawLdRecord {
    pub chromosome1: String,
    pub position1: String,
    pub variant1: String,
    pub chromosome2: String,
    pub position2: String,
    pub variant2: String,
    pub correlation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LdLine {
    Normalized(LdRecord),
    Raw(RawLdRecord),
}

#[derive(Debug, Clone, Copy)]
pub struct PlinkLdParser {
    normalize: bool,
}

pub fn make_plink_ld_parser(normalize: bool) -> PlinkLdParser {
    PlinkLdParser::new(normalize)
}

impl PlinkLdParser {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl LineParser for PlinkLdParser {
    type Record = LdLine;

    fn parse_line(&self, line: &str) -> Result<LdLine, ParseError> {
        let trimmed = line.trim();
        let fields: Vec<&str> = if trimmed.contains('\t') {
            trimmed.split('\t').map(str::trim).collect()
        } else {
            trimmed.split_whitespace().collect()
        };

        let [chromosome1, position1, variant1, chromosome2, position2, variant2, correlation] =
            fields[..]
        else {
            return Err(ParseError::FieldCount {
                expected: LD_FIELD_COUNT,
                found: fields.len(),
            }
            .in_line(trimmed));
        };

        if !self.normalize {
            return Ok(LdLine::Raw(RawLdRecord {
                chromosome1: chromosome1.to_string(),
                position1: position1.to_string(),
                variant1: variant1.to_string(),
                chromosome2: chromosome2.to_string(),
                position2: position2.to_string(),
                variant2: variant2.to_string(),
                correlation: correlation.to_string(),
            }));
        }

        let record = (|| {
            Ok(LdRecord {
                chromosome1: parse_chromosome(chromosome1)?,
                position1: parse_position(position1)?,
                variant1: normalize_marker(variant1)?,
                chromosome2: parse_chromosome(chromosome2)?,
                position2: parse_position(position2)?,
                variant2: normalize_marker(variant2)?,
                correlation: correlation.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                    field: "correlation",
                    value: correlation.to_string(),
                })?,
            })
        })();

        record
            .map(LdLine::Normalized)
            .map_err(|e: ParseError| e.in_line(trimmed))
    }
}

fn parse_chromosome(value: &str) -> Result<String, ParseError> {
    let chromosome = normalize_chromosome(value);
    check_chromosome(&chromosome)?;
    Ok(chromosome)
}

fn parse_position(value: &str) -> Result<u64, ParseError> {
    value.parse::<u64>().map_err(|_| ParseError::InvalidPosition {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "22\t37470224\t22:37470224_T/C\tchr22\t37370297\tchr22:37370297:T:C\t0.000178";

    #[test]
    fn test_normalized() {
        let LdLine::Normalized(record) = PlinkLdParser::new(true).parse_line(LINE).unwrap() else {
            panic!("expected a normalized record");
        };
        assert_eq!(record.chromosome1, "22");
        assert_eq!(record.position1, 37470224);
        assert_eq!(record.variant1, "22:37470224_T/C");
        assert_eq!(record.chromosome2, "22");
        assert_eq!(record.position2, 37370297);
        assert_eq!(record.variant2, "22:37370297_T/C");
        assert!((record.correlation - 0.000178).abs() < 1e-12);
    }

    #[test]
    fn test_raw() {
        let LdLine::Raw(record) = PlinkLdParser::new(false).parse_line(LINE).unwrap() else {
            panic!("expected a raw record");
        };
        assert_eq!(record.chromosome2, "chr22");
        assert_eq!(record.variant2, "chr22:37370297:T:C");
        assert_eq!(record.correlation, "0.000178");
    }

    #[test]
    fn test_whitespace_aligned() {
        let line = "  22   37470224   22:37470224_T/C   22   37370297   22:37370297_T/C     0.5 ";
        let LdLine::Normalized(record) = PlinkLdParser::new(true).parse_line(line).unwrap() else {
            panic!("expected a normalized record");
        };
        assert_eq!(record.position2, 37370297);
        assert_eq!(record.correlation, 0.5);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = PlinkLdParser::new(true).parse_line("22\t100\t22:100").unwrap_err();
        assert!(matches!(
            err.root(),
            ParseError::FieldCount { expected: 7, found: 3 }
        ));
    }

    #[test]
    fn test_rsid_variant_is_rejected_when_normalizing() {
        let line = "1\t100\trs1\t1\t200\trs2\t0.9";
        let err = PlinkLdParser::new(true).parse_line(line).unwrap_err();
        assert!(matches!(err.root(), ParseError::InvalidMarker { .. }));
        assert!(PlinkLdParser::new(false).parse_line(line).is_ok());
    }

    #[test]
    fn test_bare_chr_chromosome_is_rejected() {
        let line = "chr\t100\t1:100\t1\t200\t1:200\t0.9";
        let err = PlinkLdParser::new(true).parse_line(line).unwrap_err();
        assert!(matches!(err.root(), ParseError::InvalidChromosome { .. }));
    }
}
