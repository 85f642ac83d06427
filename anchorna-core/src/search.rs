//! Best-match search of a word inside a bounded shift window
//!
//! Every window of the query's length between `expected - shift_back` and
//! `expected + shift_ahead` (both inclusive, clipped to the sequence) is
//! scored. Among windows reaching the maximum score the one closest to the
//! expected index wins; remaining ties go to the lowest index.

use log::debug;

use crate::error::{AnchorError, AnchorResult};
use crate::scoring::{SubstitutionMatrix, GAP};

/// Best window for a single query word
///
/// Returns `Ok(None)` when the clipped search range is empty. A sequence
/// shorter than `w` is malformed input and reported as an error.
pub fn find_best_match(
    sequence: &[u8],
    word: &[u8],
    expected: usize,
    w: usize,
    matrix: &SubstitutionMatrix,
    shift_ahead: usize,
    shift_back: usize,
) -> AnchorResult<Option<(i32, usize)>> {
    if word.len() != w {
        return Err(AnchorError::InvalidInput(format!(
            "query word has length {}, expected {}",
            word.len(),
            w
        )));
    }
    best_window(sequence, expected, w, shift_ahead, shift_back, |window| {
        matrix.score_words(window, word, GAP)
    })
}

/// Best window against a consensus word set, each window scoring its maximum
pub fn find_best_match_set(
    sequence: &[u8],
    words: &[&[u8]],
    expected: usize,
    w: usize,
    matrix: &SubstitutionMatrix,
    shift_ahead: usize,
    shift_back: usize,
) -> AnchorResult<Option<(i32, usize)>> {
    if words.is_empty() {
        return Err(AnchorError::InvalidInput("empty word set".to_string()));
    }
    if let Some(bad) = words.iter().find(|word| word.len() != w) {
        return Err(AnchorError::InvalidInput(format!(
            "query word has length {}, expected {}",
            bad.len(),
            w
        )));
    }
    best_window(sequence, expected, w, shift_ahead, shift_back, |window| {
        words
            .iter()
            .map(|word| matrix.score_words(window, word, GAP))
            .max()
            .unwrap_or(i32::MIN)
    })
}

fn best_window<F>(
    sequence: &[u8],
    expected: usize,
    w: usize,
    shift_ahead: usize,
    shift_back: usize,
    score: F,
) -> AnchorResult<Option<(i32, usize)>>
where
    F: Fn(&[u8]) -> i32,
{
    if w == 0 || sequence.len() < w {
        return Err(AnchorError::input(format!(
            "sequence of length {} is too short for words of length {}",
            sequence.len(),
            w
        )));
    }
    let lo = expected.saturating_sub(shift_back);
    let hi = (sequence.len() - w).min(expected.saturating_add(shift_ahead));
    if lo > hi {
        return Ok(None);
    }

    let mut best_score = i32::MIN;
    let mut maxima: Vec<usize> = Vec::new();
    for (idx, window) in sequence[lo..hi + w].windows(w).enumerate() {
        let s = score(window);
        if s > best_score {
            best_score = s;
            maxima.clear();
            maxima.push(lo + idx);
        } else if s == best_score {
            maxima.push(lo + idx);
        }
    }

    // maxima are ascending, so min_by_key keeps the lowest index on equal distance
    let Some(&best) = maxima.iter().min_by_key(|&&idx| idx.abs_diff(expected)) else {
        return Ok(None);
    };
    if maxima.len() > 1 {
        let nearest = best.abs_diff(expected);
        let equally_near = maxima
            .iter()
            .filter(|&&idx| idx.abs_diff(expected) == nearest)
            .count();
        if equally_near > 1 {
            debug!(
                "{} windows share score {} at shift {} around index {}, select index {}",
                equally_near, best_score, nearest, expected, best
            );
        }
    }
    Ok(Some((best_score, best)))
}
