//! Tolerant parsing of a peer ranking "ballot" (§9 "Ballot parsing").
//!
//! Model output is free text, not a machine-generated structure, so parsing
//! accepts several shapes a model commonly emits and rejects anything that
//! is not a full permutation of the expected label set. It never "guesses"
//! a missing label.

use std::collections::HashSet;

/// Generates blinded response labels `A, B, C, ...` for `n` drafts (§4.6).
pub fn generate_labels(n: usize) -> Vec<String> {
    (0..n).map(label_for_index).collect()
}

fn label_for_index(index: usize) -> String {
    // A..Z, then AA, AB, ... matching spreadsheet-style column naming, so
    // boards larger than 26 (never true here, max 6 members) still produce
    // distinct labels.
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// One member's parsed ranking, best to worst, excluding their own label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub member_id: String,
    pub ranking: Vec<String>,
}

/// Parses `raw` into an ordered ranking, requiring it be an exact
/// permutation of `expected` (the labels minus the ballot author's own).
///
/// Accepts, in order of attempt:
/// 1. A bare comma-separated list: `"B, C, A"`.
/// 2. Labeled lines: `"1. B\n2. C\n3. A"` or `"B\nC\nA"`.
/// 3. The first maximal run of label tokens found anywhere in the text.
///
/// Any of these is accepted only if the resulting sequence is exactly a
/// permutation of `expected`; otherwise the ballot is discarded.
pub fn parse_ballot(member_id: &str, raw: &str, expected: &[String]) -> Option<Ballot> {
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let candidates = [parse_comma_separated(raw), parse_lines(raw), parse_token_scan(raw)];

    for candidate in candidates.into_iter().flatten() {
        if is_permutation(&candidate, &expected_set) {
            return Some(Ballot {
                member_id: member_id.to_string(),
                ranking: candidate,
            });
        }
    }

    None
}

fn is_permutation(candidate: &[String], expected: &HashSet<&str>) -> bool {
    if candidate.len() != expected.len() {
        return false;
    }
    let candidate_set: HashSet<&str> = candidate.iter().map(String::as_str).collect();
    candidate_set.len() == candidate.len() && candidate_set == *expected
}

fn parse_comma_separated(raw: &str) -> Option<Vec<String>> {
    if !raw.contains(',') {
        return None;
    }
    let labels = raw
        .split(',')
        .map(|part| extract_label(part))
        .collect::<Option<Vec<_>>>()?;
    Some(labels)
}

fn parse_lines(raw: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    lines.into_iter().map(extract_label).collect()
}

/// Pulls the label token out of one line/segment, tolerating a leading
/// ordinal (`"1."`, `"2)"`) and surrounding punctuation.
fn extract_label(segment: &str) -> Option<String> {
    let trimmed = segment.trim();
    let without_ordinal = trimmed.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c == ' ');
    let token: String = without_ordinal
        .chars()
        .take_while(|c| c.is_ascii_uppercase())
        .collect();

    if token.is_empty() { None } else { Some(token) }
}

/// Last-resort scan: collect every maximal run of uppercase ASCII letters
/// in order of first appearance, deduplicated.
fn parse_token_scan(raw: &str) -> Option<Vec<String>> {
    let mut labels = Vec::new();
    let mut seen = HashSet::new();
    let mut current = String::new();

    let mut flush = |current: &mut String, labels: &mut Vec<String>, seen: &mut HashSet<String>| {
        if !current.is_empty() && seen.insert(current.clone()) {
            labels.push(current.clone());
        }
        current.clear();
    };

    for c in raw.chars() {
        if c.is_ascii_uppercase() {
            current.push(c);
        } else {
            flush(&mut current, &mut labels, &mut seen);
        }
    }
    flush(&mut current, &mut labels, &mut seen);

    if labels.is_empty() { None } else { Some(labels) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_spreadsheet_style_labels() {
        assert_eq!(generate_labels(3), vec!["A", "B", "C"]);
    }

    #[test]
    fn parses_comma_separated_ranking() {
        let expected = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ballot = parse_ballot("m1", "B, C, A", &expected).unwrap();
        assert_eq!(ballot.ranking, vec!["B", "C", "A"]);
    }

    #[test]
    fn parses_numbered_lines() {
        let expected = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ballot = parse_ballot("m1", "1. B\n2. C\n3. A", &expected).unwrap();
        assert_eq!(ballot.ranking, vec!["B", "C", "A"]);
    }

    #[test]
    fn rejects_partial_permutation() {
        let expected = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert!(parse_ballot("m1", "A, B", &expected).is_none());
    }

    #[test]
    fn rejects_ballot_naming_its_own_label() {
        // expected excludes the author's own label; a ballot reusing it twice
        // or substituting a foreign label never forms a valid permutation.
        let expected = vec!["B".to_string(), "C".to_string()];
        assert!(parse_ballot("m1", "A, B", &expected).is_none());
        assert!(parse_ballot("m1", "B, C", &expected).is_some());
    }
}
