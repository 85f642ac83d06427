//! Parallel scan over all guide positions and the full search pipeline

use log::info;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::anchor::{Anchor, AnchorList};
use crate::assemble::{anchor_at_pos, AnchorOptions};
use crate::conflict::remove_contradicting_anchors;
use crate::error::{AnchorError, AnchorResult};
use crate::merge::merge_overlapping_anchors;
use crate::scoring::SubstitutionMatrix;
use crate::translate::prepare_sequences;
use crate::types::Sequence;

/// Progress callback receiving `(positions_done, anchors_found)`
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Sequences reordered so the guide comes first
pub fn order_by_guide(seqs: &[Sequence], gseqid: Option<&str>) -> AnchorResult<Vec<Sequence>> {
    let Some(first) = seqs.first() else {
        return Err(AnchorError::input("no sequences given"));
    };
    let gseqid = gseqid.unwrap_or(first.id.as_str());
    let pos = seqs
        .iter()
        .position(|s| s.id == gseqid)
        .ok_or_else(|| AnchorError::config(format!("no guiding sequence with id {}", gseqid)))?;
    let mut ordered = seqs.to_vec();
    let guide = ordered.remove(pos);
    ordered.insert(0, guide);
    Ok(ordered)
}

/// Assemble anchors for every guide position `0..=len - w`
///
/// Positions are processed independently; the result is sorted by guide
/// start and does not depend on the number of workers.
pub fn find_anchors_winlen(
    seqs: &[Sequence],
    options: &AnchorOptions,
    matrix: &SubstitutionMatrix,
    progress: Option<Progress<'_>>,
) -> AnchorResult<AnchorList> {
    options.validate()?;
    let ordered = order_by_guide(seqs, options.guide_id())?;
    let guide = &ordered[0];
    if guide.len() < options.w {
        return Err(AnchorError::input(format!(
            "guide sequence {} is shorter than word length {}",
            guide.id, options.w
        )));
    }
    let positions: Vec<usize> = (0..=guide.len() - options.w).collect();
    info!(
        "Scan {} positions of guide {} against {} sequences",
        positions.len(),
        guide.id,
        ordered.len() - 1
    );

    let done = AtomicUsize::new(0);
    let found = AtomicUsize::new(0);
    let task = |i: usize| -> AnchorResult<Option<Anchor>> {
        let anchor = anchor_at_pos(i, &ordered, options, matrix)?;
        let nfound = if anchor.is_some() {
            found.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            found.load(Ordering::Relaxed)
        };
        let ndone = done.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = progress {
            callback(ndone, nfound);
        }
        Ok(anchor)
    };

    let results: Vec<Option<Anchor>> = match options.njobs {
        Some(1) => {
            info!("sequential processing");
            positions.into_iter().map(&task).collect::<AnchorResult<_>>()?
        }
        Some(n) => {
            info!("use {} threads in parallel", n);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| AnchorError::config(format!("cannot build thread pool: {}", e)))?;
            pool.install(|| positions.into_par_iter().map(&task).collect::<AnchorResult<_>>())?
        }
        None => positions.into_par_iter().map(&task).collect::<AnchorResult<_>>()?,
    };

    Ok(AnchorList::new(results.into_iter().flatten().collect()).sorted())
}

/// Find anchors, merge them and optionally remove contradicting ones
///
/// With `continue_with` the search and merge are skipped and only the
/// removal runs on the given list. Returns the anchors and, if removal ran,
/// the removed anchors.
pub fn find_anchors(
    seqs: &[Sequence],
    options: &AnchorOptions,
    continue_with: Option<AnchorList>,
    progress: Option<Progress<'_>>,
) -> AnchorResult<(AnchorList, Option<AnchorList>)> {
    options.validate()?;
    let mut anchors = match continue_with {
        Some(anchors) => anchors,
        None => {
            let matrix = SubstitutionMatrix::from_scheme(&options.scoring)?;
            let prepared = prepare_sequences(seqs, options.no_cds)?;
            info!("Find anchors for word length {}", options.w);
            let anchors = find_anchors_winlen(&prepared, options, &matrix, progress)?;
            info!("Found {} anchors", anchors.len());
            let anchors = merge_overlapping_anchors(anchors, &matrix)?;
            info!("Merged into {} anchors", anchors.len());
            anchors.with_no_cds(options.no_cds)
        }
    };
    let removed = if options.remove {
        let removed = remove_contradicting_anchors(&mut anchors, options.aggressive_remove);
        info!(
            "After removal of {} contradicting anchors {} anchors left",
            removed.len(),
            anchors.len()
        );
        Some(removed)
    } else {
        None
    };
    anchors.sort();
    Ok((anchors, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn seqs() -> Vec<Sequence> {
        let make = |id: &str, lead: usize, core: &str| {
            let mut data = "A".repeat(lead) + core + &"A".repeat(28 - lead);
            data.push_str("RRNDCQAAAAA");
            Sequence::new(id, data.into_bytes())
        };
        vec![
            make("S1", 10, "MKLVIWHE"),
            make("S2", 11, "MKLVIWHE"),
            make("S3", 10, "MKLVAWHE"),
        ]
    }

    fn options() -> AnchorOptions {
        AnchorOptions {
            search_range: 4,
            score_add_word: 15.0,
            thr_score_add_anchor: 21.0,
            no_cds: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_guide() {
        let opts = AnchorOptions {
            gseqid: Some("S9".to_string()),
            ..options()
        };
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        assert!(matches!(
            find_anchors_winlen(&seqs(), &opts, &m, None),
            Err(AnchorError::Configuration(_))
        ));
    }

    #[test]
    fn test_guide_is_moved_first() {
        let ordered = order_by_guide(&seqs(), Some("S3")).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S1", "S2"]);
        assert_eq!(order_by_guide(&seqs(), None).unwrap()[0].id, "S1");
    }

    #[test]
    fn test_scan_is_independent_of_workers() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let run = |njobs| {
            let opts = AnchorOptions { njobs, ..options() };
            find_anchors_winlen(&seqs(), &opts, &m, None).unwrap()
        };
        let sequential = run(Some(1));
        assert!(!sequential.is_empty());
        for njobs in [Some(2), Some(4), None] {
            let parallel = run(njobs);
            assert_eq!(
                serde_json::to_string(&sequential).unwrap(),
                serde_json::to_string(&parallel).unwrap()
            );
        }
        let starts: Vec<usize> = sequential.iter().map(|a| a.guide().start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_progress_reports_every_position() {
        let m = SubstitutionMatrix::from_scheme("blosum62").unwrap();
        let calls = Mutex::new(Vec::new());
        let callback = |done: usize, found: usize| calls.lock().unwrap().push((done, found));
        let progress: Progress<'_> = &callback;
        let list = find_anchors_winlen(&seqs(), &options(), &m, Some(progress)).unwrap();
        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.len(), seqs()[0].len() - 5 + 1);
        assert_eq!(calls.iter().map(|c| c.0).max(), Some(calls.len()));
        assert_eq!(calls.iter().map(|c| c.1).max(), Some(list.len()));
    }

    #[test]
    fn test_full_pipeline() {
        let (anchors, removed) = find_anchors(&seqs(), &options(), None, None).unwrap();
        assert!(anchors.no_cds);
        assert!(removed.is_some());
        assert_eq!(anchors.len(), 2);
        // MKLVI alone fails the quota, the merged anchor spans its flanks
        let first = &anchors[0];
        assert_eq!(first.guide().start, 6);
        assert_eq!(first.word_len(), 16);
        assert_eq!(first.guide().word, "AAAAMKLVIWHEAAAA");
        assert_eq!(first.fluke("S2").unwrap().start, 7);
        assert_eq!(first.fluke("S3").unwrap().word, "AAAAMKLVAWHEAAAA");
        assert_eq!(anchors[1].guide().start, 32);
        assert_eq!(anchors[1].word_len(), 14);
        for (i, a) in anchors.iter().enumerate() {
            for b in anchors.iter().skip(i + 1) {
                assert!(!a.overlaps_with(b));
                assert!(!a.contradicts(b, true));
            }
        }

        let (again, removed) = find_anchors(
            &seqs(),
            &AnchorOptions { remove: false, ..options() },
            Some(anchors.clone()),
            None,
        )
        .unwrap();
        assert!(removed.is_none());
        assert_eq!(again.len(), anchors.len());
    }
}
