use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::bed_parser::BedLine;
use crate::errors::ParseError;
use crate::gwas_parser::GwasRecord;
use crate::line_parser::LineParser;
use crate::plink_ld_parser::LdLine;

/// A data line that failed to parse and was left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based position among the data lines.
    pub line_number: usize,
    pub error: ParseError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLines<R> {
    pub records: Vec<R>,
    pub skipped: Vec<SkippedLine>,
}

pub fn parse_lines<P: LineParser>(
    parser: &P,
    lines: &[String],
    strict: bool,
) -> Result<ParsedLines<P::Record>, ParseError> {
    let results = lines.iter().map(|line| parser.parse_line(line));
    gather(results, strict)
}

/// Same as [`parse_lines`], fanned out over the rayon pool. Output order
/// follows input order.
pub fn parse_lines_parallel<P: LineParser>(
    parser: &P,
    lines: &[String],
    strict: bool,
) -> Result<ParsedLines<P::Record>, ParseError> {
    let results: Vec<Result<P::Record, ParseError>> =
        lines.par_iter().map(|line| parser.parse_line(line)).collect();
    gather(results, strict)
}

fn gather<R, I>(results: I, strict: bool) -> Result<ParsedLines<R>, ParseError>
where
    I: IntoIterator<Item = Result<R, ParseError>>,
{
    let mut parsed = ParsedLines {
        records: Vec::new(),
        skipped: Vec::new(),
    };

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(record) => parsed.records.push(record),
            Err(error) if strict => return Err(error),
            Err(error) => {
                warn!(line_number = index + 1, %error, "Skipping line");
                parsed.skipped.push(SkippedLine {
                    line_number: index + 1,
                    error,
                });
            }
        }
    }

    debug!(
        records = parsed.records.len(),
        skipped = parsed.skipped.len(),
        "Parsed data lines"
    );
    Ok(parsed)
}

/// A record that can be written as one TSV row. Absent values are written as `.`.
pub trait TsvRecord {
    fn tsv_headers() -> &'static [&'static str];
    fn tsv_fields(&self) -> Vec<String>;
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| ".".to_string())
}

fn number<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| ".".to_string())
}

fn number_list(value: &Option<Vec<u64>>) -> String {
    match value {
        Some(list) => list
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(","),
        None => ".".to_string(),
    }
}

impl TsvRecord for GwasRecord {
    fn tsv_headers() -> &'static [&'static str] {
        &[
            "chromosome",
            "position",
            "ref_allele",
            "alt_allele",
            "variant",
            "rsid",
            "log_pvalue",
            "beta",
            "stderr_beta",
            "alt_allele_freq",
        ]
    }

    fn tsv_fields(&self) -> Vec<String> {
        vec![
            self.chromosome.clone(),
            self.position.to_string(),
            text(&self.ref_allele),
            text(&self.alt_allele),
            self.variant.clone(),
            text(&self.rsid),
            self.log_pvalue.to_string(),
            number(&self.beta),
            number(&self.stderr_beta),
            number(&self.alt_allele_freq),
        ]
    }
}

impl TsvRecord for BedLine {
    fn tsv_headers() -> &'static [&'static str] {
        &[
            "chrom",
            "chromStart",
            "chromEnd",
            "name",
            "score",
            "strand",
            "thickStart",
            "thickEnd",
            "itemRgb",
            "blockCount",
            "blockSizes",
            "blockStarts",
        ]
    }

    fn tsv_fields(&self) -> Vec<String> {
        match self {
            BedLine::Normalized(record) => vec![
                record.chrom.clone(),
                record.chrom_start.to_string(),
                record.chrom_end.to_string(),
                text(&record.name),
                number(&record.score),
                text(&record.strand),
                number(&record.thick_start),
                number(&record.thick_end),
                text(&record.item_rgb),
                number(&record.block_count),
                number_list(&record.block_sizes),
                number_list(&record.block_starts),
            ],
            BedLine::Raw(record) => vec![
                record.chrom.clone(),
                record.chrom_start.clone(),
                record.chrom_end.clone(),
                text(&record.name),
                text(&record.score),
                text(&record.strand),
                text(&record.thick_start),
                text(&record.thick_end),
                text(&record.item_rgb),
                text(&record.block_count),
                text(&record.block_sizes),
                text(&record.block_starts),
            ],
        }
    }
}

impl TsvRecord for LdLine {
    fn tsv_headers() -> &'static [&'static str] {
        &[
            "chromosome1",
            "position1",
            "variant1",
            "chromosome2",
            "position2",
            "variant2",
            "correlation",
        ]
    }

    fn tsv_fields(&self) -> Vec<String> {
        match self {
            LdLine::Normalized(record) => vec![
                record.chromosome1.clone(),
                record.position1.to_string(),
                record.variant1.clone(),
                record.chromosome2.clone(),
                record.position2.to_string(),
                record.variant2.clone(),
                record.correlation.to_string(),
            ],
            LdLine::Raw(record) => vec![
                record.chromosome1.clone(),
                record.position1.clone(),
                record.variant1.clone(),
                record.chromosome2.clone(),
                record.position2.clone(),
                record.variant2.clone(),
                record.correlation.clone(),
            ],
        }
    }
}

pub fn write_records<R: TsvRecord>(
    filename: &str,
    records: &[R],
    compress: bool,
) -> std::io::Result<()> {
    if let Some(parent) = Path::new(filename).parent() {
        create_dir_all(parent)?;
    }

    let file = File::create(filename)?;

    if compress {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_tsv_content(&mut writer, records)?;
        writer.into_inner()?.finish()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_tsv_content(&mut writer, records)?;
        writer.flush()?;
    }

    Ok(())
}

fn write_tsv_content<W: Write, R: TsvRecord>(writer: &mut W, records: &[R]) -> std::io::Result<()> {
    writeln!(writer, "{}", R::tsv_headers().join("\t"))?;
    for record in records {
        writeln!(writer, "{}", record.tsv_fields().join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed_parser::BedParser;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn test_skips_bad_lines_unless_strict() {
        let input = lines(&["chr1\t10\t20", "chr1\t10", "chr2\t30\t40"]);
        let parser = BedParser::new(true);

        let parsed = parse_lines(&parser, &input, false).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line_number, 2);
        assert!(matches!(parsed.skipped[0].error.root(), ParseError::MissingBedColumns));

        assert!(parse_lines(&parser, &input, true).is_err());
    }

    #[test]
    fn test_bed_tsv_fields() {
        let record = BedParser::new(true)
            .parse_line("chr1\t100\t900\tgene\t.\t-\t100\t900\t.\t2\t100,200,\t0,600,")
            .unwrap();
        assert_eq!(
            record.tsv_fields(),
            vec!["chr1", "101", "900", "gene", ".", "-", "100", "900", ".", "2", "100,200", "0,600"]
        );
        assert_eq!(BedLine::tsv_headers().len(), record.tsv_fields().len());
    }
}
