//! Merging of anchors that describe the same rigid alignment shift
//!
//! Two anchors overlap nicely when their guide intervals intersect (touching
//! intervals included), they agree on which sequences have poor flukes, and
//! every good fluke is shifted by the same amount as the guide fluke.

use log::debug;

use crate::anchor::{Anchor, AnchorList, Fluke};
use crate::error::{AnchorError, AnchorResult};
use crate::scoring::SubstitutionMatrix;

impl Anchor {
    /// Whether `other` is a rigid shift of this anchor with intersecting guides
    pub fn overlaps_with(&self, other: &Anchor) -> bool {
        let (g1, g2) = (self.guide(), other.guide());
        if g1.start.max(g2.start) > g1.stop.min(g2.stop) {
            return false;
        }
        if self.len() != other.len() {
            return false;
        }
        let shift = g1.start as i64 - g2.start as i64;
        self.iter().all(|f1| match other.fluke(&f1.seqid) {
            Some(f2) => {
                f1.poor == f2.poor && (f1.poor || f1.start as i64 - f2.start as i64 == shift)
            }
            None => false,
        })
    }

    /// Join two nicely overlapping anchors into one
    ///
    /// A containing guide interval wins unchanged. Otherwise every fluke
    /// becomes the union of both flukes and scores are recomputed against
    /// the good words of the result.
    pub fn join_with(&self, other: &Anchor, matrix: &SubstitutionMatrix) -> AnchorResult<Anchor> {
        if !self.overlaps_with(other) {
            return Err(AnchorError::MergeIncompatibility(format!(
                "{} and {} do not overlap",
                self.id(),
                other.id()
            )));
        }
        let (g1, g2) = (self.guide(), other.guide());
        if g1.start <= g2.start && g1.stop >= g2.stop {
            return Ok(self.clone());
        }
        if g2.start <= g1.start && g2.stop >= g1.stop {
            return Ok(other.clone());
        }

        let mut pairs = Vec::with_capacity(self.len());
        for f1 in self.iter() {
            let f2 = other.fluke(&f1.seqid).ok_or_else(|| {
                AnchorError::MergeIncompatibility(format!("no fluke for {} in {}", f1.seqid, other.id()))
            })?;
            if f1.offset != f2.offset || f1.strand != f2.strand {
                return Err(AnchorError::MergeIncompatibility(format!(
                    "flukes of sequence {} differ in offset or strand",
                    f1.seqid
                )));
            }
            pairs.push((f1, f2));
        }

        let mut good_len = None;
        for (f1, f2) in pairs.iter().filter(|(f1, _)| !f1.poor) {
            let union = f1.stop.max(f2.stop) - f1.start.min(f2.start);
            match good_len {
                None => good_len = Some(union),
                Some(len) if len != union => {
                    return Err(AnchorError::MergeIncompatibility(format!(
                        "good flukes of {} and {} span different lengths",
                        self.id(),
                        other.id()
                    )))
                }
                _ => {}
            }
        }
        let len = good_len.ok_or_else(|| {
            AnchorError::MergeIncompatibility(format!("{} has no good flukes", self.id()))
        })?;

        let flukes = pairs
            .into_iter()
            .map(|(f1, f2)| join_flukes(f1, f2, len))
            .collect::<AnchorResult<Vec<_>>>()?;
        let mut anchor = Anchor::from_parts(flukes, self.gseqid().to_string());
        anchor.recalculate_scores(matrix);
        Ok(anchor)
    }
}

/// Union of two flukes of one sequence, clipped to `len`
fn join_flukes(f1: &Fluke, f2: &Fluke, len: usize) -> AnchorResult<Fluke> {
    let start = f1.start.min(f2.start);
    let union = f1.stop.max(f2.stop) - start;
    let incompatible = || {
        AnchorError::MergeIncompatibility(format!("cannot join words of sequence {}", f1.seqid))
    };

    let (start, word) = if union == len {
        let (first, second) = if f1.start <= f2.start { (f1, f2) } else { (f2, f1) };
        let overlap = first.len() + second.len() - len;
        let tail = second.word.as_bytes().get(overlap..).ok_or_else(incompatible)?;
        let mut word = first.word.as_bytes().to_vec();
        word.extend_from_slice(tail);
        (start, word)
    } else {
        // poor flukes only; keep the stronger fluke and fill up from the other one
        let (dom, rest) = if f2.score > f1.score { (f2, f1) } else { (f1, f2) };
        let missing = len.checked_sub(dom.len()).ok_or_else(incompatible)?;
        let rest_word = rest.word.as_bytes();
        if dom.start <= rest.start {
            let tail = rest_word.get(rest_word.len().saturating_sub(missing)..).ok_or_else(incompatible)?;
            let mut word = dom.word.as_bytes().to_vec();
            word.extend_from_slice(tail);
            (dom.start, word)
        } else {
            let head = rest_word.get(..missing).ok_or_else(incompatible)?;
            let mut word = head.to_vec();
            word.extend_from_slice(dom.word.as_bytes());
            (dom.stop.saturating_sub(len), word)
        }
    };
    if word.len() != len {
        return Err(incompatible());
    }
    debug!("joined fluke {} at {}+{}", f1.seqid, start, len);
    Ok(Fluke {
        seqid: f1.seqid.clone(),
        start,
        stop: start + len,
        offset: f1.offset,
        strand: f1.strand,
        word: String::from_utf8_lossy(&word).into_owned(),
        score: 0,
        median_score: 0.0,
        poor: f1.poor,
    })
}

/// Merge nicely overlapping anchors in one left-to-right sweep
///
/// Anchors are sorted by guide start first. Each anchor absorbs the later
/// anchors it overlaps with until a guide start lies beyond its guide stop.
pub fn merge_overlapping_anchors(list: AnchorList, matrix: &SubstitutionMatrix) -> AnchorResult<AnchorList> {
    let no_cds = list.no_cds;
    let anchors = list.sorted().anchors;
    let mut consumed = vec![false; anchors.len()];
    let mut merged = Vec::with_capacity(anchors.len());

    for i in 0..anchors.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let mut current = anchors[i].clone();
        for j in i + 1..anchors.len() {
            if consumed[j] {
                continue;
            }
            if anchors[j].guide().start > current.guide().stop {
                break;
            }
            if current.overlaps_with(&anchors[j]) {
                current = current.join_with(&anchors[j], matrix)?;
                consumed[j] = true;
            }
        }
        merged.push(current);
    }
    Ok(AnchorList { anchors: merged, no_cds }.sorted())
}
