use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ParseError;

// chrom, pos, ref, alt, trailer. Alleles may be split by any of / _ : | -,
// the alt allele stops at "_" so that EPACTS-style suffixes land in the trailer.
static MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:chr)?([A-Za-z0-9]+?)[_:-](\d+)[_:|-]?([A-Za-z0-9]+)?[/_:|-]?([^_]+)?_?(.*)$")
        .expect("marker pattern is valid")
});

/// The pieces of a `chrom:pos_ref/alt` style variant identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerParts<'a> {
    pub chrom: &'a str,
    pub pos: &'a str,
    pub ref_allele: Option<&'a str>,
    pub alt_allele: Option<&'a str>,
    pub trailer: Option<&'a str>,
}

/// Split a marker into its components.
///
/// In permissive mode a value that does not look like a marker yields `Ok(None)`;
/// otherwise it is an error naming the value.
pub fn parse_marker(value: &str, permissive: bool) -> Result<Option<MarkerParts<'_>>, ParseError> {
    let captures = match MARKER_REGEX.captures(value.trim()) {
        Some(captures) => captures,
        None if permissive => return Ok(None),
        None => {
            return Err(ParseError::InvalidMarker {
                value: value.to_string(),
            })
        }
    };

    let non_empty = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    };

    // Groups 1 and 2 are mandatory in the pattern.
    match (non_empty(1), non_empty(2)) {
        (Some(chrom), Some(pos)) => Ok(Some(MarkerParts {
            chrom,
            pos,
            ref_allele: non_empty(3),
            alt_allele: non_empty(4),
            trailer: non_empty(5),
        })),
        _ if permissive => Ok(None),
        _ => Err(ParseError::InvalidMarker {
            value: value.to_string(),
        }),
    }
}

/// Re-serialize a marker as `chrom:pos`, or `chrom:pos_ref/alt` when both alleles are known.
pub fn normalize_marker(value: &str) -> Result<String, ParseError> {
    let parts = parse_marker(value, false)?.ok_or_else(|| ParseError::InvalidMarker {
        value: value.to_string(),
    })?;

    let chrom = normalize_chromosome(parts.chrom);
    if chrom.is_empty() {
        return Err(ParseError::InvalidMarker {
            value: value.to_string(),
        });
    }
    Ok(match (parts.ref_allele, parts.alt_allele) {
        (Some(ref_allele), Some(alt_allele)) => {
            format!("{}:{}_{}/{}", chrom, parts.pos, ref_allele, alt_allele)
        }
        _ => format!("{}:{}", chrom, parts.pos),
    })
}

/// Strip a leading "chr" (any case) and uppercase the rest.
pub fn normalize_chromosome(value: &str) -> String {
    let trimmed = value.trim();
    let without_prefix = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };
    without_prefix.to_uppercase()
}

/// Reject a normalized chromosome that is empty (a bare "chr") or is really an
/// rsID in the wrong column.
pub fn check_chromosome(chromosome: &str) -> Result<(), ParseError> {
    if chromosome.is_empty() {
        return Err(ParseError::InvalidChromosome {
            value: chromosome.to_string(),
        });
    }
    if chromosome.starts_with("RS") {
        return Err(ParseError::RsidAsChromosome {
            value: chromosome.to_string(),
        });
    }
    Ok(())
}
