//! Anchor assembly at a single guide position
//!
//! Starting from the guide word, every other sequence is searched for its
//! best window. Candidates are accepted best first; whenever an accepted word
//! is new and scores at least `score_add_word` it joins the consensus word set
//! and the remaining sequences are searched again with that word.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use crate::anchor::{Anchor, Fluke};
use crate::error::{AnchorError, AnchorResult};
use crate::scoring::{SubstitutionMatrix, GAP};
use crate::search::find_best_match;
use crate::types::Sequence;

/// Slack for the quota comparison on fractional thresholds
const QUOTA_EPS: f64 = 1e-9;

/// Parameters of an anchor search
#[derive(Debug, Clone)]
pub struct AnchorOptions {
    /// Word length
    pub w: usize,
    /// Guide sequence id, `None` takes the first sequence
    pub gseqid: Option<String>,
    /// Letters searched left and right of the guide position
    pub search_range: usize,
    /// Scoring scheme name or matrix file
    pub scoring: String,
    /// Minimum score for a word to join the consensus set
    pub score_add_word: f64,
    /// Fraction of sequences that must reach `thr_score_add_anchor`
    pub thr_quota_add_anchor: f64,
    pub thr_score_add_anchor: f64,
    pub aggressive_remove: bool,
    /// Remove contradicting anchors after merging
    pub remove: bool,
    /// Use sequences as given instead of translating them
    pub no_cds: bool,
    /// Worker threads for the scan, `None` uses the global pool
    pub njobs: Option<usize>,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            w: 5,
            gseqid: None,
            search_range: 100,
            scoring: "blosum62".to_string(),
            score_add_word: 22.0,
            thr_quota_add_anchor: 1.0,
            thr_score_add_anchor: 22.0,
            aggressive_remove: true,
            remove: true,
            no_cds: false,
            njobs: None,
        }
    }
}

impl AnchorOptions {
    pub fn validate(&self) -> AnchorResult<()> {
        if self.w == 0 {
            return Err(AnchorError::config("word length w must be positive"));
        }
        if self.thr_score_add_anchor < self.score_add_word {
            return Err(AnchorError::config(format!(
                "thr_score_add_anchor ({}) must not be lower than score_add_word ({})",
                self.thr_score_add_anchor, self.score_add_word
            )));
        }
        if !(0.0..=1.0).contains(&self.thr_quota_add_anchor) {
            return Err(AnchorError::config(format!(
                "thr_quota_add_anchor must be within [0, 1], got {}",
                self.thr_quota_add_anchor
            )));
        }
        if self.njobs == Some(0) {
            return Err(AnchorError::config("njobs must be at least 1"));
        }
        Ok(())
    }

    /// Guide id after mapping the `none`/`null` spellings to `None`
    pub fn guide_id(&self) -> Option<&str> {
        self.gseqid
            .as_deref()
            .filter(|id| !matches!(id.to_ascii_lowercase().as_str(), "none" | "null" | ""))
    }
}

/// Search result for one pending sequence
///
/// Orders by score, then by smaller shift, lower index and sequence order,
/// so the heap pops the best candidate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    score: i32,
    shift: usize,
    index: usize,
    seq: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.shift.cmp(&self.shift))
            .then_with(|| other.index.cmp(&self.index))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Assemble the anchor for guide position `i`
///
/// `seqs[0]` is the guide. `Ok(None)` means no anchor at this position: the
/// guide word scores too low against itself or the quota cannot be met.
pub fn anchor_at_pos(
    i: usize,
    seqs: &[Sequence],
    options: &AnchorOptions,
    matrix: &SubstitutionMatrix,
) -> AnchorResult<Option<Anchor>> {
    options.validate()?;
    let w = options.w;
    let Some(guide) = seqs.first() else {
        return Err(AnchorError::input("no sequences given"));
    };
    let Some(gword) = guide.word(i, w) else {
        return Ok(None);
    };
    let gscore = matrix.score_words(gword, gword, GAP);
    if f64::from(gscore) < options.thr_score_add_anchor {
        return Ok(None);
    }

    let n_total = seqs.len();
    let max_fails = (1.0 - options.thr_quota_add_anchor) * n_total as f64 + QUOTA_EPS;
    let mut words: Vec<&[u8]> = vec![gword];
    let mut template = gword;
    let mut pending: BTreeSet<usize> = (1..n_total).collect();
    let mut accepted: Vec<Option<(i32, usize)>> = vec![None; n_total];
    accepted[0] = Some((gscore, i));
    let mut nfails = 0usize;

    while !pending.is_empty() {
        let mut heap = BinaryHeap::with_capacity(pending.len());
        for &k in &pending {
            let seq = &seqs[k];
            let shift_ahead = options.search_range + seq.len().saturating_sub(guide.len());
            let shift_back = options.search_range + guide.len().saturating_sub(seq.len());
            let (score, index) = find_best_match(&seq.data, template, i, w, matrix, shift_ahead, shift_back)?
                .ok_or_else(|| {
                    AnchorError::input(format!("empty search range in sequence {} for index {}", seq.id, i))
                })?;
            heap.push(Candidate {
                score,
                shift: index.abs_diff(i),
                index,
                seq: k,
            });
        }

        while let Some(c) = heap.pop() {
            if !pending.contains(&c.seq) {
                continue;
            }
            if f64::from(c.score) < options.thr_score_add_anchor {
                nfails += 1;
                if nfails as f64 > max_fails {
                    return Ok(None);
                }
            }
            pending.remove(&c.seq);
            accepted[c.seq] = Some((c.score, c.index));
            let word = &seqs[c.seq].data[c.index..c.index + w];
            if f64::from(c.score) >= options.score_add_word && !words.contains(&word) {
                words.push(word);
                template = word;
                break;
            }
        }
    }

    let mut flukes = Vec::with_capacity(n_total);
    for (seq, acc) in seqs.iter().zip(&accepted) {
        let Some((score, start)) = *acc else {
            return Err(AnchorError::input(format!("sequence {} was never matched", seq.id)));
        };
        flukes.push(Fluke {
            seqid: seq.id.clone(),
            start,
            stop: start + w,
            offset: seq.offset,
            strand: seq.strand,
            word: String::from_utf8_lossy(&seq.data[start..start + w]).into_owned(),
            score,
            median_score: 0.0,
            poor: f64::from(score) < options.score_add_word,
        });
    }
    let mut anchor = Anchor::from_parts(flukes, guide.id.clone());
    anchor.recalculate_scores_with(words.iter().copied(), matrix);
    Ok(Some(anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(core: &str) -> Vec<u8> {
        let mut data = b"GGGGGGGGGG".to_vec();
        data.extend_from_slice(core.as_bytes());
        data.extend_from_slice(b"GGGGGGGGGGGGGGG");
        data
    }

    fn three_seqs(third: &str) -> Vec<Sequence> {
        vec![
            Sequence::new("S1", pad("MKLVI")),
            Sequence::new("S2", pad("MKLVI")),
            Sequence::new("S3", pad(third)),
        ]
    }

    fn options() -> AnchorOptions {
        AnchorOptions {
            search_range: 5,
            score_add_word: 15.0,
            thr_score_add_anchor: 15.0,
            thr_quota_add_anchor: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_substitution_anchor() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let seqs = three_seqs("MKLVA");
        assert_eq!(seqs[0].len(), 30);
        let anchor = anchor_at_pos(10, &seqs, &options(), &m).unwrap().unwrap();
        assert_eq!(anchor.guide().start, 10);
        assert_eq!(anchor.len(), 3);
        let s3 = anchor.fluke("S3").unwrap();
        assert_eq!(s3.start, 10);
        assert_eq!(s3.word, "MKLVA");
        // 22 - 4 - 1 = 17 against MKLVI
        assert!(!s3.poor);
        // consensus {MKLVI, MKLVA}
        assert_eq!(s3.score, 22);
        assert_eq!(s3.median_score, 19.5);
        let s1 = anchor.fluke("S1").unwrap();
        assert_eq!(s1.median_score, 19.5);
        assert!(anchor.iter().all(|f| f.len() == 5));
    }

    #[test]
    fn test_poor_fluke_with_relaxed_quota() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let seqs = three_seqs("MKLVA");
        let opts = AnchorOptions {
            score_add_word: 20.0,
            thr_score_add_anchor: 20.0,
            thr_quota_add_anchor: 0.6,
            ..options()
        };
        let anchor = anchor_at_pos(10, &seqs, &opts, &m).unwrap().unwrap();
        let s3 = anchor.fluke("S3").unwrap();
        assert!(s3.poor);
        // only MKLVI is in the consensus set
        assert_eq!(s3.median_score, 17.0);
        assert_eq!(anchor.poor_flukes().count(), 1);
    }

    #[test]
    fn test_quota_abort() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let seqs = three_seqs("GGGGG");
        let opts = AnchorOptions {
            score_add_word: 20.0,
            thr_score_add_anchor: 20.0,
            ..options()
        };
        assert!(anchor_at_pos(10, &seqs, &opts, &m).unwrap().is_none());
    }

    #[test]
    fn test_low_guide_self_score() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let seqs = three_seqs("MKLVI");
        // GGGGG scores 30 against itself
        let opts = AnchorOptions {
            score_add_word: 31.0,
            thr_score_add_anchor: 31.0,
            ..options()
        };
        assert!(anchor_at_pos(0, &seqs, &opts, &m).unwrap().is_none());
    }

    #[test]
    fn test_inconsistent_thresholds() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let opts = AnchorOptions {
            score_add_word: 25.0,
            thr_score_add_anchor: 20.0,
            ..options()
        };
        assert!(matches!(
            anchor_at_pos(10, &three_seqs("MKLVI"), &opts, &m),
            Err(AnchorError::Configuration(_))
        ));
    }

    #[test]
    fn test_shifted_match_in_longer_sequence() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let mut seqs = three_seqs("MKLVI");
        let mut longer = b"GGG".to_vec();
        longer.extend(pad("MKLVI"));
        seqs[2] = Sequence::new("S3", longer);
        let anchor = anchor_at_pos(10, &seqs, &options(), &m).unwrap().unwrap();
        assert_eq!(anchor.fluke("S3").unwrap().start, 13);
    }

    #[test]
    fn test_candidate_order() {
        let a = Candidate { score: 10, shift: 3, index: 7, seq: 1 };
        let b = Candidate { score: 10, shift: 1, index: 9, seq: 2 };
        let c = Candidate { score: 11, shift: 9, index: 0, seq: 3 };
        let mut heap: BinaryHeap<_> = [a, b, c].into_iter().collect();
        assert_eq!(heap.pop(), Some(c));
        assert_eq!(heap.pop(), Some(b));
        assert_eq!(heap.pop(), Some(a));
    }
}
