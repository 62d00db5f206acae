// UCSC BED (up to 12 columns). Coordinates in the file are 0-based, half-open.
// Normalized records use 1-based, fully closed coordinates.
//
//   chrom  chromStart  chromEnd  name  score  strand  thickStart  thickEnd  itemRgb  blockCount  blockSizes  blockStarts

use serde::Serialize;

use crate::errors::ParseError;
use crate::line_parser::LineParser;
use crate::missing_values::{parse_optional_float, parse_optional_u64, present};

/// A BED line with coordinates converted and numeric fields coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedRecord {
    pub chrom: String,
    pub chrom_start: u64,
    pub chrom_end: u64,
    pub name: Option<String>,
    pub score: Option<f64>,
    pub strand: Option<String>,
    pub thick_start: Option<u64>,
    pub thick_end: Option<u64>,
    pub item_rgb: Option<String>,
    pub block_count: Option<usize>,
    pub block_sizes: Option<Vec<u64>>,
    pub block_starts: Option<Vec<u64>>,
}

/// A BED line split into columns, text left as written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBedRecord {
    pub chrom: String,
    pub chrom_start: String,
    pub chrom_end: String,
    pub name: Option<String>,
    pub score: Option<String>,
    pub strand: Option<String>,
    pub thick_start: Option<String>,
    pub thick_end: Option<String>,
    pub item_rgb: Option<String>,
    pub block_count: Option<String>,
    pub block_sizes: Option<String>,
    pub block_starts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BedLine {
    Normalized(BedRecord),
    Raw(RawBedRecord),
}

#[derive(Debug, Clone, Copy)]
pub struct BedParser {
    normalize: bool,
}

pub fn make_ucsc_bed_parser(normalize: bool) -> BedParser {
    BedParser::new(normalize)
}

impl BedParser {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl LineParser for BedParser {
    type Record = BedLine;

    fn parse_line(&self, line: &str) -> Result<BedLine, ParseError> {
        // Leading whitespace is kept: an empty first field means a missing chrom.
        let trimmed = line.trim_end();
        let tokens: Vec<&str> = trimmed.split('\t').collect();
        let column = |index: usize| tokens.get(index).copied();

        let (chrom, chrom_start, chrom_end) = match (column(0), column(1), column(2)) {
            (Some(chrom), Some(start), Some(end))
                if !chrom.trim().is_empty() && !start.trim().is_empty() && !end.trim().is_empty() =>
            {
                (chrom.trim(), start.trim(), end.trim())
            }
            _ => return Err(ParseError::MissingBedColumns.in_line(trimmed)),
        };

        if !self.normalize {
            let text = |index: usize| column(index).map(str::to_string);
            return Ok(BedLine::Raw(RawBedRecord {
                chrom: chrom.to_string(),
                chrom_start: chrom_start.to_string(),
                chrom_end: chrom_end.to_string(),
                name: text(3),
                score: text(4),
                strand: column(5).and_then(present).map(str::to_string),
                thick_start: text(6),
                thick_end: text(7),
                item_rgb: text(8),
                block_count: text(9),
                block_sizes: text(10),
                block_starts: text(11),
            }));
        }

        normalize_bed(chrom, chrom_start, chrom_end, &tokens)
            .map(BedLine::Normalized)
            .map_err(|e| e.in_line(trimmed))
    }
}

fn normalize_bed(chrom: &str, start: &str, end: &str, tokens: &[&str]) -> Result<BedRecord, ParseError> {
    let optional = |index: usize| tokens.get(index).copied().unwrap_or("");
    let text = |index: usize| present(optional(index)).map(str::to_string);

    let chrom_start = parse_optional_u64(start, "chromStart")?.ok_or(ParseError::MissingBedColumns)?;
    let chrom_end = parse_optional_u64(end, "chromEnd")?.ok_or(ParseError::MissingBedColumns)?;

    let block_count = parse_optional_u64(optional(9), "blockCount")?.map(|count| count as usize);
    let block_sizes = parse_block_list(optional(10), "blockSizes")?;
    let block_starts = parse_block_list(optional(11), "blockStarts")?;

    if let (Some(count), Some(sizes), Some(starts)) = (block_count, &block_sizes, &block_starts) {
        if sizes.len() != count || starts.len() != count {
            return Err(ParseError::BlockCountMismatch {
                sizes: sizes.len(),
                starts: starts.len(),
                count,
            });
        }
    }

    let chrom_start = chrom_start.checked_add(1).ok_or_else(|| ParseError::InvalidNumber {
        field: "chromStart",
        value: start.to_string(),
    })?;

    Ok(BedRecord {
        chrom: chrom.to_string(),
        chrom_start,
        chrom_end,
        name: text(3),
        score: parse_optional_float(optional(4), "score")?,
        strand: text(5),
        thick_start: parse_optional_u64(optional(6), "thickStart")?,
        thick_end: parse_optional_u64(optional(7), "thickEnd")?,
        item_rgb: text(8),
        block_count,
        block_sizes,
        block_starts,
    })
}

// "567,488," -> [567, 488]
fn parse_block_list(value: &str, field: &'static str) -> Result<Option<Vec<u64>>, ParseError> {
    let Some(list) = present(value) else {
        return Ok(None);
    };
    list.trim_end_matches(',')
        .split(',')
        .map(|item| {
            item.trim().parse::<u64>().map_err(|_| ParseError::InvalidNumber {
                field,
                value: list.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NINE_COLUMNS: &str = "chr7\t127471196\t127472363\tPos1\t0\t+\t127471196\t127472363\t255,0,0";

    fn normalized(line: &str) -> BedRecord {
        match BedParser::new(true).parse_line(line).unwrap() {
            BedLine::Normalized(record) => record,
            BedLine::Raw(_) => panic!("expected a normalized record"),
        }
    }

    #[test]
    fn test_start_becomes_one_based() {
        let record = normalized(NINE_COLUMNS);
        assert_eq!(record.chrom, "chr7");
        assert_eq!(record.chrom_start, 127471197);
        assert_eq!(record.chrom_end, 127472363);
        assert_eq!(record.name.as_deref(), Some("Pos1"));
        assert_eq!(record.score, Some(0.0));
        assert_eq!(record.strand.as_deref(), Some("+"));
        assert_eq!(record.thick_start, Some(127471196));
        assert_eq!(record.item_rgb.as_deref(), Some("255,0,0"));
        assert_eq!(record.block_count, None);
    }

    #[test]
    fn test_raw_keeps_text() {
        let BedLine::Raw(record) = BedParser::new(false).parse_line(NINE_COLUMNS).unwrap() else {
            panic!("expected a raw record");
        };
        assert_eq!(record.chrom_start, "127471196");
        assert_eq!(record.score.as_deref(), Some("0"));
        assert_eq!(record.block_sizes, None);
    }

    #[test]
    fn test_missing_required_column() {
        let err = BedParser::new(true)
            .parse_line("\t127471196\t127472363\tPos1\t0\t+")
            .unwrap_err();
        assert!(matches!(err.root(), ParseError::MissingBedColumns));

        let err = BedParser::new(true)
            .parse_line("chr7\t127471196\t\tPos1\t0\t+")
            .unwrap_err();
        assert!(matches!(err.root(), ParseError::MissingBedColumns));

        assert!(BedParser::new(false).parse_line("chr7\t127471196").is_err());
    }

    #[test]
    fn test_start_at_u64_max_is_an_error() {
        let err = BedParser::new(true)
            .parse_line("chr1\t18446744073709551615\t18446744073709551615")
            .unwrap_err();
        assert!(matches!(
            err.root(),
            ParseError::InvalidNumber { field: "chromStart", .. }
        ));
        assert!(BedParser::new(false)
            .parse_line("chr1\t18446744073709551615\t18446744073709551615")
            .is_ok());
    }

    #[test]
    fn test_blocks() {
        let record = normalized("chr1\t100\t900\tgene\t.\t-\t100\t900\t.\t2\t100,200,\t0,600,");
        assert_eq!(record.score, None);
        assert_eq!(record.item_rgb, None);
        assert_eq!(record.block_count, Some(2));
        assert_eq!(record.block_sizes, Some(vec![100, 200]));
        assert_eq!(record.block_starts, Some(vec![0, 600]));
    }

    #[test]
    fn test_block_count_mismatch() {
        let err = BedParser::new(true)
            .parse_line("chr1\t100\t900\tgene\t0\t-\t100\t900\t0\t3\t100,200\t0,600")
            .unwrap_err();
        assert!(matches!(
            err.root(),
            ParseError::BlockCountMismatch { sizes: 2, starts: 2, count: 3 }
        ));
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(normalized(NINE_COLUMNS)).unwrap();
        assert_eq!(value["chromStart"], 127471197);
        assert_eq!(value["itemRgb"], "255,0,0");
    }
}
