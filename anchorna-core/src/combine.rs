//! Combining anchor lists from independent runs
//!
//! Runs on cut out sequences carry different offsets. Flukes are moved onto
//! the offsets of the first list, or with `convert_to_nt` onto absolute
//! nucleotide coordinates with offset 0.
//!
//! The nucleotides themselves are not known here, so a converted word spells
//! every residue three times in nucleotide order, e.g. `MK` on the forward
//! strand becomes `MMMKKK` and on the reverse strand `KKKMMM`.

use log::{info, warn};
use std::collections::{HashMap, HashSet};

use crate::anchor::{Anchor, AnchorList};
use crate::error::{AnchorError, AnchorResult};
use crate::types::{Mode, Offset, Strand};

/// Combine several anchor lists into one sorted list
pub fn combine(lists: Vec<AnchorList>, convert_to_nt: bool) -> AnchorResult<AnchorList> {
    let Some(first) = lists.first() else {
        return Ok(AnchorList::default());
    };
    let no_cds = first.no_cds;
    if lists.iter().any(|l| l.no_cds != no_cds) {
        return Err(AnchorError::CombineConflict(
            "cannot combine anchor lists with and without no_cds".to_string(),
        ));
    }

    let converted: Vec<Vec<Anchor>> = if convert_to_nt {
        lists.into_iter().map(to_nucleotides).collect::<AnchorResult<_>>()?
    } else {
        let mut reference: HashMap<String, (Offset, Strand)> = HashMap::new();
        for f in first.iter().flat_map(|a| a.iter()) {
            reference
                .entry(f.seqid.clone())
                .or_insert((f.offset.unwrap_or(0), f.strand));
        }
        lists
            .into_iter()
            .map(|list| shift_to_reference(list, &mut reference))
            .collect::<AnchorResult<_>>()?
    };

    let mut seen: HashSet<Anchor> = HashSet::new();
    let mut combined = Vec::new();
    let mut duplicates = Vec::new();
    for anchors in converted {
        let mut batch = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            if seen.contains(&anchor) {
                duplicates.push(anchor.id());
            } else {
                batch.push(anchor);
            }
        }
        for anchor in &batch {
            seen.insert(anchor.clone());
        }
        combined.extend(batch);
    }
    if !duplicates.is_empty() {
        return Err(AnchorError::CombineConflict(format!(
            "anchors {} exist in multiple lists",
            duplicates.join(", ")
        )));
    }
    info!("Combined {} anchors", combined.len());
    Ok(AnchorList {
        anchors: combined,
        no_cds: no_cds || convert_to_nt,
    }
    .sorted())
}

/// Shift every fluke onto the reference offset of its sequence
fn shift_to_reference(
    list: AnchorList,
    reference: &mut HashMap<String, (Offset, Strand)>,
) -> AnchorResult<Vec<Anchor>> {
    let unit: i64 = if list.no_cds { 1 } else { 3 };
    let mut anchors = list.anchors;
    for anchor in &mut anchors {
        let id = anchor.id();
        for f in anchor.flukes_mut() {
            let offset = f.offset.unwrap_or(0);
            let (ref_offset, ref_strand) = *reference
                .entry(f.seqid.clone())
                .or_insert_with(|| {
                    warn!("Sequence {} is missing in the first anchor list", f.seqid);
                    (offset, f.strand)
                });
            if f.strand != ref_strand {
                return Err(AnchorError::CombineConflict(format!(
                    "fluke {} of anchor {} is on strand {}, expected {}",
                    f.seqid, id, f.strand, ref_strand
                )));
            }
            let doff = offset - ref_offset;
            if doff % unit != 0 {
                return Err(AnchorError::CombineConflict(format!(
                    "offsets of sequence {} differ by {}, not a multiple of {}",
                    f.seqid, doff, unit
                )));
            }
            let shift = match f.strand {
                Strand::Forward => doff / unit,
                Strand::Reverse => -doff / unit,
            };
            let start = f.start as i64 + shift;
            if start < 0 {
                return Err(AnchorError::CombineConflict(format!(
                    "fluke {} of anchor {} moves before the sequence start",
                    f.seqid, id
                )));
            }
            f.start = start as usize;
            f.stop = (f.stop as i64 + shift) as usize;
            f.offset = Some(ref_offset);
        }
    }
    Ok(anchors)
}

/// Placeholder nucleotide word of a residue word, see the module docs
fn residues_to_codons(word: &str, strand: Strand) -> String {
    let expand = |c: char| [c; 3];
    match strand {
        Strand::Forward => word.chars().flat_map(expand).collect(),
        Strand::Reverse => word.chars().rev().flat_map(expand).collect(),
    }
}

/// Move every fluke to absolute nucleotide coordinates with offset 0
fn to_nucleotides(list: AnchorList) -> AnchorResult<Vec<Anchor>> {
    let mode = list.effective_mode(Mode::Seq);
    let mut anchors = list.anchors;
    for anchor in &mut anchors {
        let id = anchor.id();
        for f in anchor.flukes_mut() {
            let (start, stop) = f.interval(mode);
            if start < 0 {
                return Err(AnchorError::CombineConflict(format!(
                    "fluke {} of anchor {} has negative nucleotide index",
                    f.seqid, id
                )));
            }
            f.start = start as usize;
            f.stop = stop as usize;
            f.offset = Some(0);
            if mode == Mode::Seq {
                f.word = residues_to_codons(&f.word, f.strand);
            }
        }
    }
    Ok(anchors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Fluke;
    use crate::merge::merge_overlapping_anchors;
    use crate::scoring::SubstitutionMatrix;

    fn anchor(start: usize, offsets: [i64; 2], strand: Strand) -> Anchor {
        let flukes = ["s1", "s2"]
            .iter()
            .zip(offsets)
            .map(|(id, o)| {
                let mut f = Fluke::new(*id, start, "MKL");
                f.offset = Some(o);
                f.strand = strand;
                f
            })
            .collect();
        Anchor::new(flukes, "s1").unwrap()
    }

    #[test]
    fn test_shift_onto_first_offsets() {
        let l1 = AnchorList::new(vec![anchor(10, [0, 3], Strand::Forward)]);
        // second run on sequences cut out 30 nt later
        let l2 = AnchorList::new(vec![anchor(2, [30, 33], Strand::Forward)]);
        let combined = combine(vec![l1, l2], false).unwrap();
        assert_eq!(combined.len(), 2);
        let a = &combined[1];
        assert_eq!(a.guide().start, 12);
        assert_eq!(a.guide().offset, Some(0));
        assert_eq!(a.fluke("s2").unwrap().offset, Some(3));
        assert!(!combined.no_cds);
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let l1 = AnchorList::new(vec![anchor(10, [0, 0], Strand::Forward)]);
        let l2 = AnchorList::new(vec![anchor(7, [9, 9], Strand::Forward)]);
        let err = combine(vec![l1, l2], false).unwrap_err();
        assert!(matches!(err, AnchorError::CombineConflict(ref m) if m.contains("A 10+3")));
    }

    #[test]
    fn test_strand_and_frame_conflicts() {
        let l1 = AnchorList::new(vec![anchor(10, [0, 0], Strand::Forward)]);
        let l2 = AnchorList::new(vec![anchor(20, [0, 0], Strand::Reverse)]);
        assert!(matches!(combine(vec![l1.clone(), l2], false), Err(AnchorError::CombineConflict(_))));
        let l3 = AnchorList::new(vec![anchor(20, [1, 1], Strand::Forward)]);
        assert!(matches!(combine(vec![l1, l3], false), Err(AnchorError::CombineConflict(_))));
    }

    #[test]
    fn test_convert_to_nucleotides() {
        let l1 = AnchorList::new(vec![anchor(10, [0, 0], Strand::Forward)]);
        let l2 = AnchorList::new(vec![anchor(2, [100, 100], Strand::Reverse)]);
        let combined = combine(vec![l1, l2], true).unwrap();
        assert!(combined.no_cds);
        let starts: Vec<usize> = combined.iter().map(|a| a.guide().start).collect();
        // reverse: 100 - 3 * 5 = 85
        assert_eq!(starts, vec![30, 85]);
        assert!(combined.iter().flat_map(|a| a.iter()).all(|f| f.len() == 9 && f.word.len() == f.len()));
        assert_eq!(combined[0].guide().word, "MMMKKKLLL");
        assert_eq!(combined[1].guide().word, "LLLKKKMMM");
    }

    #[test]
    fn test_converted_anchors_still_merge() {
        let list = AnchorList::new(vec![
            anchor(10, [0, 0], Strand::Forward),
            anchor(12, [0, 0], Strand::Forward),
        ]);
        let combined = combine(vec![list], true).unwrap();
        let matrix = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let merged = merge_overlapping_anchors(combined, &matrix).unwrap();
        assert_eq!(merged.len(), 1);
        let f = merged[0].fluke("s2").unwrap();
        assert_eq!((f.start, f.stop), (30, 45));
        assert_eq!(f.word, "MMMKKKLLLKKKLLL");
    }

    #[test]
    fn test_nucleotide_lists_keep_their_words() {
        let list = AnchorList::new(vec![anchor(10, [5, 5], Strand::Forward)]).with_no_cds(true);
        let combined = combine(vec![list], true).unwrap();
        let f = combined[0].guide();
        assert_eq!((f.start, f.stop, f.offset), (10, 13, Some(0)));
        assert_eq!(f.word, "MKL");
    }
}
