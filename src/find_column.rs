/// Maximum edit distance at which a header still counts as a synonym.
pub const DEFAULT_THRESHOLD: usize = 2;

/// Edit distance between two strings, by characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Find the header that best matches any of the synonyms.
///
/// `None` entries mark columns already claimed and are skipped. Matching is
/// case-sensitive, so callers lower-case headers first. On equal scores the
/// first header wins. Returns the 0-based index, or `None` if the best score is
/// above `threshold`.
pub fn find_column<S: AsRef<str>>(
    synonyms: &[&str],
    headers: &[Option<S>],
    threshold: usize,
) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for (index, header) in headers.iter().enumerate() {
        let Some(header) = header else {
            continue;
        };
        let Some(score) = synonyms
            .iter()
            .map(|synonym| levenshtein(header.as_ref(), synonym))
            .min()
        else {
            continue;
        };

        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((index, score)),
        }
    }

    best.filter(|&(_, score)| score <= threshold)
        .map(|(index, _)| index)
}
