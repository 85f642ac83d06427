//! Substitution matrices and word scoring
//!
//! A [`SubstitutionMatrix`] is loaded once and shared read-only by every
//! scoring call. Named protein schemes come from the score tables of the
//! `bio` crate, `nuc` is a simple nucleotide scheme, and any other scheme
//! name is read as a matrix file in NCBI text layout.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{AnchorError, AnchorResult};

/// Symbol skipped when scoring two words
pub const GAP: u8 = b'-';

/// Symbols covered by the protein score tables
const PROTEIN_ALPHABET: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX*";

const NUC_MATCH: i32 = 5;
const NUC_MISMATCH: i32 = -4;
const NUC_AMBIGUOUS: i32 = -2;
const NUC_AMBIGUOUS_SELF: i32 = -1;

/// Pairwise residue scores as a full byte-indexed lookup table
#[derive(Clone)]
pub struct SubstitutionMatrix {
    name: String,
    table: Vec<i32>,
}

impl fmt::Debug for SubstitutionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionMatrix")
            .field("name", &self.name)
            .finish()
    }
}

impl SubstitutionMatrix {
    /// Resolve a scheme name (`blosum62`, `pam250`, `nuc`, ...) or matrix file
    pub fn from_scheme(scheme: &str) -> AnchorResult<Self> {
        let key = scheme.trim().to_ascii_lowercase();
        let score_fn: Option<fn(u8, u8) -> i32> = match key.as_str() {
            "blosum62" => Some(bio::scores::blosum62),
            "pam40" => Some(bio::scores::pam40),
            "pam120" => Some(bio::scores::pam120),
            "pam200" => Some(bio::scores::pam200),
            "pam250" => Some(bio::scores::pam250),
            _ => None,
        };
        if let Some(score_fn) = score_fn {
            return Ok(Self::from_score_fn(&key, PROTEIN_ALPHABET, score_fn));
        }
        if key == "nuc" || key == "dna" {
            return Ok(Self::nucleotide());
        }
        let path = Path::new(scheme.trim());
        if path.is_file() {
            return Self::from_file(path);
        }
        Err(AnchorError::config(format!(
            "unknown scoring scheme {}, use blosum62, pam40, pam120, pam200, pam250, nuc or a matrix file",
            scheme
        )))
    }

    /// Build a table from a score function defined over `alphabet`
    pub fn from_score_fn(name: &str, alphabet: &[u8], score_fn: fn(u8, u8) -> i32) -> Self {
        let mut entries = Vec::with_capacity(alphabet.len() * alphabet.len());
        for &a in alphabet {
            for &b in alphabet {
                entries.push((a, b, score_fn(a, b)));
            }
        }
        Self::from_entries(name, &entries)
    }

    /// Nucleotide scheme: match 5, mismatch -4, N scores -2 (-1 against N)
    pub fn nucleotide() -> Self {
        let alphabet = b"ACGTN";
        let mut entries = Vec::new();
        for &a in alphabet.iter() {
            for &b in alphabet.iter() {
                let score = match (a, b) {
                    (b'N', b'N') => NUC_AMBIGUOUS_SELF,
                    (b'N', _) | (_, b'N') => NUC_AMBIGUOUS,
                    _ if a == b => NUC_MATCH,
                    _ => NUC_MISMATCH,
                };
                entries.push((a, b, score));
            }
        }
        let mut matrix = Self::from_entries("nuc", &entries);
        // U scores like T
        for &other in alphabet.iter() {
            for (x, y) in [(b'U', other), (other, b'U')] {
                let tx = if x == b'U' { b'T' } else { x };
                let ty = if y == b'U' { b'T' } else { y };
                let score = matrix.score(tx, ty);
                matrix.set_case_insensitive(x, y, score);
            }
        }
        let score = matrix.score(b'T', b'T');
        matrix.set_case_insensitive(b'U', b'U', score);
        matrix
    }

    /// Parse a matrix in NCBI text layout
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnchorResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnchorError::config(format!("cannot read matrix file {}: {}", path.display(), e))
        })?;
        Self::parse_ncbi(&path.display().to_string(), &content)
    }

    /// Parse the NCBI layout: a header row of symbols, then one row per symbol
    pub fn parse_ncbi(name: &str, content: &str) -> AnchorResult<Self> {
        let mut lines = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let header: Vec<u8> = lines
            .next()
            .ok_or_else(|| AnchorError::config(format!("matrix {} is empty", name)))?
            .split_whitespace()
            .map(|s| parse_symbol(name, s))
            .collect::<AnchorResult<_>>()?;

        let mut entries = Vec::new();
        for line in lines {
            let mut fields = line.split_whitespace();
            let row = match fields.next() {
                Some(s) => parse_symbol(name, s)?,
                None => continue,
            };
            let values: Vec<&str> = fields.collect();
            if values.len() != header.len() {
                return Err(AnchorError::config(format!(
                    "matrix {}: row {} has {} values, expected {}",
                    name,
                    row as char,
                    values.len(),
                    header.len()
                )));
            }
            for (&col, value) in header.iter().zip(values) {
                let score = value.parse::<i32>().map_err(|_| {
                    AnchorError::config(format!("matrix {}: invalid score {}", name, value))
                })?;
                entries.push((row, col, score));
            }
        }
        if entries.is_empty() {
            return Err(AnchorError::config(format!("matrix {} has no rows", name)));
        }
        Ok(Self::from_entries(name, &entries))
    }

    /// Unknown pairs score the minimum of the given entries
    fn from_entries(name: &str, entries: &[(u8, u8, i32)]) -> Self {
        let fill = entries.iter().map(|&(_, _, s)| s).min().unwrap_or(0);
        let mut matrix = Self {
            name: name.to_string(),
            table: vec![fill; 256 * 256],
        };
        for &(a, b, score) in entries {
            matrix.set_case_insensitive(a, b, score);
        }
        matrix
    }

    fn set_case_insensitive(&mut self, a: u8, b: u8, score: i32) {
        for x in [a.to_ascii_uppercase(), a.to_ascii_lowercase()] {
            for y in [b.to_ascii_uppercase(), b.to_ascii_lowercase()] {
                self.table[x as usize * 256 + y as usize] = score;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.table[a as usize * 256 + b as usize]
    }

    /// Score of two words of equal length; no length check
    #[inline]
    pub(crate) fn score_words(&self, word1: &[u8], word2: &[u8], gap: u8) -> i32 {
        word1
            .iter()
            .zip(word2)
            .filter(|&(&a, &b)| a != gap && b != gap)
            .map(|(&a, &b)| self.score(a, b))
            .sum()
    }
}

fn parse_symbol(name: &str, s: &str) -> AnchorResult<u8> {
    match s.as_bytes() {
        [c] => Ok(*c),
        _ => Err(AnchorError::config(format!(
            "matrix {}: symbol {} is not a single character",
            name, s
        ))),
    }
}

/// Column-additive similarity of two equal-length words
///
/// Positions where either word carries `gap` do not contribute.
pub fn corrscore(word1: &[u8], word2: &[u8], matrix: &SubstitutionMatrix, gap: u8) -> AnchorResult<i32> {
    if word1.len() != word2.len() {
        return Err(AnchorError::InvalidInput(format!(
            "cannot score words of different length ({} and {})",
            word1.len(),
            word2.len()
        )));
    }
    Ok(matrix.score_words(word1, word2, gap))
}

/// Maximum and median of a word's scores against a word set
///
/// Returns `None` for an empty word set.
pub fn max_and_median<'a, I>(word: &[u8], words: I, matrix: &SubstitutionMatrix) -> Option<(i32, f64)>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut scores: Vec<i32> = words
        .into_iter()
        .map(|w| matrix.score_words(word, w, GAP))
        .collect();
    if scores.is_empty() {
        return None;
    }
    scores.sort_unstable();
    let n = scores.len();
    let median = if n % 2 == 1 {
        scores[n / 2] as f64
    } else {
        (scores[n / 2 - 1] as f64 + scores[n / 2] as f64) / 2.0
    };
    Some((scores[n - 1], median))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_score_is_diagonal_sum() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let word = b"MKLVI";
        let diagonal: i32 = word.iter().map(|&c| m.score(c, c)).sum();
        assert_eq!(corrscore(word, word, &m, GAP).unwrap(), diagonal);
        // M=5 K=5 L=4 V=4 I=4
        assert_eq!(diagonal, 22);
    }

    #[test]
    fn test_gap_positions_are_skipped() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        assert_eq!(corrscore(b"M-K", b"MAK", &m, GAP).unwrap(), 10);
        assert_eq!(corrscore(b"---", b"MAK", &m, GAP).unwrap(), 0);
    }

    #[test]
    fn test_unequal_length_is_invalid_input() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        assert!(matches!(
            corrscore(b"MK", b"MKL", &m, GAP),
            Err(AnchorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_lowercase_matches_uppercase() {
        let m = SubstitutionMatrix::from_scheme("BLOSUM62").unwrap();
        assert_eq!(m.score(b'w', b'W'), 11);
        assert_eq!(m.score(b'H', b'a'), -2);
    }

    #[test]
    fn test_nucleotide_scheme() {
        let m = SubstitutionMatrix::from_scheme("nuc").unwrap();
        assert_eq!(m.score(b'A', b'A'), 5);
        assert_eq!(m.score(b'A', b'G'), -4);
        assert_eq!(m.score(b'U', b't'), 5);
        assert_eq!(m.score(b'N', b'C'), -2);
        assert_eq!(m.score(b'N', b'N'), -1);
    }

    #[test]
    fn test_unknown_scheme() {
        assert!(matches!(
            SubstitutionMatrix::from_scheme("no-such-matrix"),
            Err(AnchorError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_ncbi_matrix() {
        let text = "# toy matrix\n   A  B\nA  2 -1\nB -1  3\n";
        let m = SubstitutionMatrix::parse_ncbi("toy", text).unwrap();
        assert_eq!(m.score(b'A', b'A'), 2);
        assert_eq!(m.score(b'b', b'B'), 3);
        // unknown symbols fall back to the minimum
        assert_eq!(m.score(b'Z', b'A'), -1);

        let broken = "A B\nA 1\n";
        assert!(SubstitutionMatrix::parse_ncbi("broken", broken).is_err());
    }

    #[test]
    fn test_max_and_median() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let words: Vec<&[u8]> = vec![b"MKLVI", b"MKLVI", b"MKLVA"];
        let (max, median) = max_and_median(b"MKLVI", words, &m).unwrap();
        assert_eq!(max, 22);
        assert_eq!(median, 22.0);

        let words: Vec<&[u8]> = vec![b"MKLVI", b"MKLVA"];
        let (max, median) = max_and_median(b"MKLVI", words, &m).unwrap();
        assert_eq!(max, 22);
        // 22 and 22 - 4 - 1 = 17
        assert_eq!(median, 19.5);
        assert!(max_and_median(b"MK", Vec::<&[u8]>::new(), &m).is_none());
    }
}
