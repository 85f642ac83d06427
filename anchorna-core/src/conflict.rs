//! Removal of anchors with contradicting fluke order

use log::debug;

use crate::anchor::{Anchor, AnchorList, Fluke};

impl Anchor {
    /// Whether the good flukes of both anchors disagree on their order
    ///
    /// The anchor with the smaller guide start is expected to come first in
    /// every shared sequence. In aggressive mode its fluke must also end
    /// before the other fluke starts. Anchors with equal guide starts
    /// contradict only if neither order is consistent.
    pub fn contradicts(&self, other: &Anchor, aggressive: bool) -> bool {
        let (s1, s2) = (self.guide().start, other.guide().start);
        if s1 == s2 {
            return !in_order(self, other, aggressive) && !in_order(other, self, aggressive);
        }
        let (first, second) = if s1 < s2 { (self, other) } else { (other, self) };
        !in_order(first, second, aggressive)
    }
}

fn in_order(first: &Anchor, second: &Anchor, aggressive: bool) -> bool {
    let precedes = |f1: &Fluke, f2: &Fluke| {
        if aggressive {
            f1.stop <= f2.start
        } else {
            f1.start <= f2.start
        }
    };
    first.good_flukes().all(|f1| match second.fluke(&f1.seqid) {
        Some(f2) if !f2.poor => precedes(f1, f2),
        _ => true,
    })
}

/// Remove the weaker anchor of every contradicting pair
///
/// Anchors are ranked by `minscore`, highest first, ties keeping guide
/// order. Each surviving anchor removes all lower ranked anchors it
/// contradicts. `list` keeps the survivors sorted by guide start; the removed
/// anchors are returned, sorted the same way.
pub fn remove_contradicting_anchors(list: &mut AnchorList, aggressive: bool) -> AnchorList {
    list.sort();
    let anchors = std::mem::take(&mut list.anchors);
    let mut rank: Vec<usize> = (0..anchors.len()).collect();
    rank.sort_by(|&a, &b| anchors[b].minscore().total_cmp(&anchors[a].minscore()));

    let mut removed = vec![false; anchors.len()];
    for (r, &i) in rank.iter().enumerate() {
        if removed[i] {
            continue;
        }
        for &j in &rank[r + 1..] {
            if !removed[j] && anchors[i].contradicts(&anchors[j], aggressive) {
                debug!(
                    "Remove anchor {} with min score {}, keep anchor {} with min score {}",
                    anchors[j].id(),
                    anchors[j].minscore(),
                    anchors[i].id(),
                    anchors[i].minscore()
                );
                removed[j] = true;
            }
        }
    }

    let mut dropped = Vec::new();
    for (anchor, gone) in anchors.into_iter().zip(removed) {
        if gone {
            dropped.push(anchor);
        } else {
            list.anchors.push(anchor);
        }
    }
    AnchorList {
        anchors: dropped,
        no_cds: list.no_cds,
    }
}
