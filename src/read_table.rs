use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::errors::IngestError;
use crate::sniff_gwas_format::is_header;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A delimited text file split into its parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextTable {
    /// `##` comments, UCSC `track` / `browser` lines and later `#` lines.
    pub meta_lines: Vec<String>,
    /// Column header with any leading `#` removed.
    pub header: Option<String>,
    pub data_lines: Vec<String>,
}

impl TextTable {
    pub fn header_fields(&self, delimiter: char) -> Vec<String> {
        self.header
            .as_deref()
            .map(|header| split_fields(header, delimiter))
            .unwrap_or_default()
    }

    /// Up to `n` data lines split into fields, for format sniffing.
    pub fn sample_rows(&self, n: usize, delimiter: char) -> Vec<Vec<String>> {
        self.data_lines
            .iter()
            .take(n)
            .map(|line| split_fields(line, delimiter))
            .collect()
    }
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|field| field.trim().to_string()).collect()
}

fn is_meta_line(line: &str) -> bool {
    line.starts_with("##") || line.starts_with("track ") || line.starts_with("browser ")
}

/// Open a plain or gzip-compressed file; compression is detected from the magic bytes.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, IngestError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    debug!(path = %path.as_ref().display(), is_gzip, "Opened input");

    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Read a whole table, keeping lines in memory for bulk parsing.
///
/// Blank lines are dropped. The first line that is neither blank nor meta is
/// the header if it looks like one (see [`is_header`]), otherwise it is data.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: char) -> Result<TextTable, IngestError> {
    read_lines(open_text(path)?, delimiter)
}

pub fn read_lines<R: BufRead>(reader: R, delimiter: char) -> Result<TextTable, IngestError> {
    let mut table = TextTable::default();
    let mut seen_first_row = false;
    let mut line_count = 0usize;

    for line in reader.lines() {
        let line = line?;
        line_count += 1;
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }
        if is_meta_line(line) {
            table.meta_lines.push(line.to_string());
            continue;
        }

        if !seen_first_row {
            seen_first_row = true;
            if is_header(line, '#', delimiter) {
                table.header = Some(line.trim_start_matches('#').to_string());
                continue;
            }
        }

        if line.starts_with('#') {
            table.meta_lines.push(line.to_string());
        } else {
            table.data_lines.push(line.to_string());
        }
    }

    info!(
        lines = line_count,
        meta = table.meta_lines.len(),
        data = table.data_lines.len(),
        has_header = table.header.is_some(),
        "Read input table"
    );

    if table.data_lines.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_and_meta_lines() {
        let text = "##source=saige\n#CHR\tPOS\tp.value\n\n1\t100\t0.5\n# trailing note\n2\t200\t0.1\n";
        let table = read_lines(Cursor::new(text), '\t').unwrap();
        assert_eq!(table.meta_lines, vec!["##source=saige", "# trailing note"]);
        assert_eq!(table.header.as_deref(), Some("CHR\tPOS\tp.value"));
        assert_eq!(table.data_lines, vec!["1\t100\t0.5", "2\t200\t0.1"]);
        assert_eq!(table.header_fields('\t'), vec!["CHR", "POS", "p.value"]);
        assert_eq!(table.sample_rows(1, '\t'), vec![vec!["1", "100", "0.5"]]);
    }

    #[test]
    fn test_headerless_bed() {
        let text = "track name=pairedReads\r\nchr7\t127471196\t127472363\r\n";
        let table = read_lines(Cursor::new(text), '\t').unwrap();
        assert_eq!(table.header, None);
        assert_eq!(table.meta_lines.len(), 1);
        assert_eq!(table.data_lines, vec!["chr7\t127471196\t127472363"]);
    }

    #[test]
    fn test_empty_input() {
        let err = read_lines(Cursor::new("##only\nchr\tpos\n"), '\t').unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile));
    }
}
