//! Infer the column layout of a GWAS file from its header and a few data rows.
//!
//! Each detection step looks only at the columns still unclaimed in an
//! [`AvailableColumns`] mask, so steps can run (and be tested) on their own.
//! Failing to recognise a layout is an ordinary outcome reported as `None`.

use tracing::debug;

use crate::find_column::{find_column, DEFAULT_THRESHOLD};
use crate::gwas_parser::GwasParserConfig;
use crate::missing_values::present;
use crate::parse_marker::parse_marker;
use crate::transform_pvalue::parse_pval_to_log;

const LOG_PVALUE_SYNONYMS: [&str; 4] = ["neg_log_pvalue", "log_pvalue", "log_pval", "logpvalue"];
const PVALUE_SYNONYMS: [&str; 7] = ["pvalue", "p.value", "p-value", "pval", "p_score", "p", "p_value"];
const MARKER_SYNONYMS: [&str; 8] = [
    "marker",
    "chromosome:position",
    "snp",
    "snpid",
    "variant",
    "variant_id",
    "markername",
    "id",
];
const CHROM_SYNONYMS: [&str; 3] = ["chrom", "chr", "chromosome"];
const POS_SYNONYMS: [&str; 8] = ["position", "pos", "begin", "beg", "bp", "end", "ps", "base_pair_location"];
// Ref/alt versus effect/other allele naming is tool specific; these lists are a
// heuristic and the orientation can always be overridden with `is_alt_effect`.
const REF_SYNONYMS: [&str; 5] = ["a1", "ref", "reference", "allele0", "allele1"];
const ALT_SYNONYMS: [&str; 5] = ["a2", "alt", "alternate", "allele1", "allele2"];
const BETA_SYNONYMS: [&str; 4] = ["beta", "effect_size", "alt_effsize", "effect"];
const STDERR_SYNONYMS: [&str; 6] = ["stderr_beta", "stderr", "sebeta", "effect_size_sd", "se", "standard_error"];

/// Lower-cased header names; a claimed column is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableColumns {
    names: Vec<Option<String>>,
}

impl AvailableColumns {
    pub fn from_header<H: AsRef<str>>(header_row: &[H]) -> Self {
        let names = header_row
            .iter()
            .map(|name| Some(name.as_ref().trim().trim_start_matches('#').to_lowercase()))
            .collect();
        Self { names }
    }

    pub fn claim(&mut self, index: usize) {
        if let Some(slot) = self.names.get_mut(index) {
            *slot = None;
        }
    }

    #[cfg(test)]
    fn is_available(&self, index: usize) -> bool {
        matches!(self.names.get(index), Some(Some(_)))
    }

    pub fn find(&self, synonyms: &[&str], threshold: usize) -> Option<usize> {
        find_column(synonyms, &self.names, threshold)
    }
}

/// The p-value column, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvalueColumn {
    pub pvalue_col: usize,
    pub is_neg_log_pvalue: bool,
}

/// Where the variant position lives, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionColumns {
    Marker {
        marker_col: usize,
    },
    Discrete {
        chrom_col: usize,
        pos_col: usize,
        ref_col: Option<usize>,
        alt_col: Option<usize>,
    },
}

impl PositionColumns {
    fn claimed(&self) -> Vec<usize> {
        match *self {
            PositionColumns::Marker { marker_col } => vec![marker_col],
            PositionColumns::Discrete {
                chrom_col,
                pos_col,
                ref_col,
                alt_col,
            } => [Some(chrom_col), Some(pos_col), ref_col, alt_col]
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}

/// Optional effect size columns, 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectColumns {
    pub beta_col: Option<usize>,
    pub stderr_beta_col: Option<usize>,
}

fn cell<S: AsRef<str>>(row: &[S], index: usize) -> Option<&str> {
    row.get(index).map(|value| value.as_ref())
}

fn validates_as_pvalue<S: AsRef<str>>(rows: &[Vec<S>], index: usize, is_log: bool) -> bool {
    rows.iter().all(|row| match cell(row, index) {
        Some(value) => match parse_pval_to_log(Some(value), is_log) {
            Ok(Some(log_p)) => !log_p.is_nan(),
            Ok(None) => true,
            Err(_) => false,
        },
        None => false,
    })
}

fn validates_as_number<S: AsRef<str>>(rows: &[Vec<S>], index: usize) -> bool {
    rows.iter().all(|row| match cell(row, index) {
        Some(value) => match present(value) {
            Some(text) => text.parse::<f64>().is_ok_and(f64::is_finite),
            None => true,
        },
        None => false,
    })
}

/// Locate a p-value column, preferring one that is already on the -log10 scale.
pub fn find_pvalue_column<S: AsRef<str>>(
    columns: &AvailableColumns,
    data_rows: &[Vec<S>],
) -> Option<PvalueColumn> {
    if let Some(index) = columns.find(&LOG_PVALUE_SYNONYMS, DEFAULT_THRESHOLD) {
        if validates_as_pvalue(data_rows, index, true) {
            return Some(PvalueColumn {
                pvalue_col: index + 1,
                is_neg_log_pvalue: true,
            });
        }
    }

    if let Some(index) = columns.find(&PVALUE_SYNONYMS, DEFAULT_THRESHOLD) {
        if validates_as_pvalue(data_rows, index, false) {
            return Some(PvalueColumn {
                pvalue_col: index + 1,
                is_neg_log_pvalue: false,
            });
        }
    }

    None
}

/// Locate a single marker column, or else separate chromosome/position/allele columns.
pub fn find_position_columns<S: AsRef<str>>(
    columns: &AvailableColumns,
    data_rows: &[Vec<S>],
) -> Option<PositionColumns> {
    if let Some(index) = columns.find(&MARKER_SYNONYMS, DEFAULT_THRESHOLD) {
        let all_markers = data_rows.iter().all(|row| {
            cell(row, index).is_some_and(|value| matches!(parse_marker(value, true), Ok(Some(_))))
        });
        if all_markers {
            return Some(PositionColumns::Marker {
                marker_col: index + 1,
            });
        }
    }

    let mut working = columns.clone();
    let mut claim = |synonyms: &[&str]| {
        let index = working.find(synonyms, DEFAULT_THRESHOLD)?;
        working.claim(index);
        Some(index + 1)
    };

    let chrom_col = claim(&CHROM_SYNONYMS[..])?;
    let pos_col = claim(&POS_SYNONYMS[..])?;
    let ref_col = claim(&REF_SYNONYMS[..]);
    let alt_col = claim(&ALT_SYNONYMS[..]);

    Some(PositionColumns::Discrete {
        chrom_col,
        pos_col,
        ref_col,
        alt_col,
    })
}

/// Locate beta and its standard error. Only exact header names count, since
/// short names like "se" sit within a couple of edits of almost anything.
pub fn find_effect_columns<S: AsRef<str>>(columns: &AvailableColumns, data_rows: &[Vec<S>]) -> EffectColumns {
    let mut working = columns.clone();
    let mut effect = EffectColumns::default();

    if let Some(index) = working.find(&BETA_SYNONYMS, 0) {
        if validates_as_number(data_rows, index) {
            effect.beta_col = Some(index + 1);
            working.claim(index);
        }
    }
    if let Some(index) = working.find(&STDERR_SYNONYMS, 0) {
        if validates_as_number(data_rows, index) {
            effect.stderr_beta_col = Some(index + 1);
        }
    }

    effect
}

/// Guess a column mapping for a GWAS file.
///
/// Returns `None` unless both a p-value column and a position (marker or
/// chromosome + position) could be identified.
pub fn guess_gwas<H: AsRef<str>, S: AsRef<str>>(
    header_row: &[H],
    data_rows: &[Vec<S>],
) -> Option<GwasParserConfig> {
    if header_row.is_empty() || data_rows.is_empty() {
        return None;
    }

    let mut columns = AvailableColumns::from_header(header_row);

    let Some(pvalue) = find_pvalue_column(&columns, data_rows) else {
        debug!("No p-value column detected");
        return None;
    };
    columns.claim(pvalue.pvalue_col - 1);

    let Some(position) = find_position_columns(&columns, data_rows) else {
        debug!("No marker or chromosome/position columns detected");
        return None;
    };
    for column in position.claimed() {
        columns.claim(column - 1);
    }

    let effect = find_effect_columns(&columns, data_rows);

    let mut config = GwasParserConfig {
        pvalue_col: Some(pvalue.pvalue_col),
        is_neg_log_pvalue: pvalue.is_neg_log_pvalue,
        beta_col: effect.beta_col,
        stderr_beta_col: effect.stderr_beta_col,
        ..Default::default()
    };
    match position {
        PositionColumns::Marker { marker_col } => config.marker_col = Some(marker_col),
        PositionColumns::Discrete {
            chrom_col,
            pos_col,
            ref_col,
            alt_col,
        } => {
            config.chrom_col = Some(chrom_col);
            config.pos_col = Some(pos_col);
            config.ref_col = ref_col;
            config.alt_col = alt_col;
        }
    }

    debug!(?config, "Detected GWAS column layout");
    Some(config)
}

pub fn is_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(|v| !v.is_nan())
}

/// Whether a raw line looks like a header: a comment, or a row with no numeric field.
pub fn is_header(row: &str, comment_char: char, delimiter: char) -> bool {
    row.starts_with(comment_char) || row.split(delimiter).all(|item| !is_numeric(item))
}
