//! Translation and preparation of the working sequences
//!
//! Anchors are searched in amino-acid space unless `no_cds` is set. The
//! nucleotide offset of residue 0 is kept on every prepared sequence so fluke
//! coordinates can be mapped back to the original sequence.

use bio::alphabets::dna;
use log::{debug, info, warn};

use crate::error::{AnchorError, AnchorResult};
use crate::types::{Sequence, Strand};

/// Standard genetic code, codons ordered TCAG x TCAG x TCAG
const STANDARD_CODE: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

fn base_index(b: u8) -> Option<usize> {
    match b.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// Bases encoded by an IUPAC symbol
fn expand_iupac(b: u8) -> &'static [u8] {
    match b.to_ascii_uppercase() {
        b'A' => b"A",
        b'C' => b"C",
        b'G' => b"G",
        b'T' | b'U' => b"T",
        b'R' => b"AG",
        b'Y' => b"CT",
        b'S' => b"CG",
        b'W' => b"AT",
        b'K' => b"GT",
        b'M' => b"AC",
        b'B' => b"CGT",
        b'D' => b"AGT",
        b'H' => b"ACT",
        b'V' => b"ACG",
        b'N' => b"ACGT",
        _ => b"",
    }
}

/// Translate one codon; ambiguous codons resolve when every reading agrees
pub fn translate_codon(codon: &[u8]) -> u8 {
    if let [a, b, c] = codon {
        if let (Some(i), Some(j), Some(k)) = (base_index(*a), base_index(*b), base_index(*c)) {
            return STANDARD_CODE[16 * i + 4 * j + k];
        }
        let mut aa = None;
        for &x in expand_iupac(*a) {
            for &y in expand_iupac(*b) {
                for &z in expand_iupac(*c) {
                    let t = translate_codon(&[x, y, z]);
                    match aa {
                        None => aa = Some(t),
                        Some(prev) if prev != t => return b'X',
                        _ => {}
                    }
                }
            }
        }
        return aa.unwrap_or(b'X');
    }
    b'X'
}

/// Translate a nucleotide sequence, dropping an incomplete trailing codon
pub fn translate(nt: &[u8]) -> Vec<u8> {
    nt.chunks_exact(3).map(translate_codon).collect()
}

/// Translate the coding region of `seq` or, without annotation, the whole sequence
///
/// A reverse-strand coding region, or a reverse-strand sequence without
/// annotation, is reverse complemented first. A final stop codon is dropped
/// when `final_stop` is false.
pub fn translate_sequence(seq: &Sequence, final_stop: bool) -> AnchorResult<Sequence> {
    let (data, offset, strand) = match seq.cds {
        Some(cds) => {
            if cds.stop > seq.len() || cds.start >= cds.stop {
                return Err(AnchorError::input(format!(
                    "CDS {}..{} does not fit sequence {} of length {}",
                    cds.start,
                    cds.stop,
                    seq.id,
                    seq.len()
                )));
            }
            let region = &seq.data[cds.start..cds.stop];
            match cds.strand {
                Strand::Forward => (translate(region), cds.start as i64, Strand::Forward),
                Strand::Reverse => (translate(&dna::revcomp(region)), cds.stop as i64, Strand::Reverse),
            }
        }
        None => {
            let offset = seq.offset.unwrap_or(0);
            match seq.strand {
                Strand::Forward => (translate(&seq.data), offset, Strand::Forward),
                Strand::Reverse => (translate(&dna::revcomp(&seq.data)), offset, Strand::Reverse),
            }
        }
    };
    let mut data = data;
    if !final_stop && data.last() == Some(&b'*') {
        data.pop();
    }
    Ok(Sequence {
        id: seq.id.clone(),
        data,
        offset: Some(offset),
        cds: None,
        strand,
    })
}

/// Build the working sequences an anchor search runs on
///
/// With `no_cds` residues are used as given. Otherwise every sequence needs
/// an offset (whole sequences are translated) or every sequence needs a CDS
/// (the CDS is translated); mixed annotation is rejected.
pub fn prepare_sequences(seqs: &[Sequence], no_cds: bool) -> AnchorResult<Vec<Sequence>> {
    if let Some(empty) = seqs.iter().find(|s| s.is_empty()) {
        return Err(AnchorError::input(format!("sequence {} is empty", empty.id)));
    }
    let all_offset = seqs.iter().all(|s| s.offset.is_some());
    if no_cds {
        let mut prepared = seqs.to_vec();
        if !all_offset {
            for seq in &mut prepared {
                seq.offset = Some(0);
            }
        }
        return Ok(prepared);
    }

    let all_cds = seqs.iter().all(|s| s.cds.is_some());
    let prepared = if all_offset {
        info!("Found offsets in sequence file, translate full sequences");
        seqs.iter()
            .map(|s| {
                let plain = Sequence { cds: None, ..s.clone() };
                translate_sequence(&plain, true)
            })
            .collect::<AnchorResult<Vec<_>>>()?
    } else if all_cds {
        info!("Found CDS annotation in sequence file, translate CDS");
        seqs.iter()
            .map(|s| translate_sequence(s, false))
            .collect::<AnchorResult<Vec<_>>>()?
    } else {
        return Err(AnchorError::input(
            "did not find CDS annotation or offset for at least one sequence",
        ));
    };
    for aa in &prepared {
        debug!("translated {}: {}", aa.id, aa.as_str());
        if aa.data.contains(&b'*') {
            warn!("Stop codon in the middle of sequence {}", aa.id);
        }
    }
    Ok(prepared)
}
