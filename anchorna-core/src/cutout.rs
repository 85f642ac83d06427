//! Cutting out subsequences between anchors
//!
//! A position has up to three parts `ABC`:
//!
//! * `A` anchor number (optionally prefixed with `a`), `start`, `end`, or in
//!   mode `seq` the start codon `atg` and the stop codon `*`
//! * `B` `<`, `>` or `^` for the left edge, right edge or middle of `A`
//! * `C` signed offset like `+5` or `-3`
//!
//! Examples: `a11<`, `a12>+10`, `start+10`, `*>`.

use log::warn;
use std::fmt;

use crate::anchor::{parse_anchor_index, AnchorList};
use crate::error::{AnchorError, AnchorResult};
use crate::types::{Mode, Sequence, Strand};

/// Part `A` of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRef {
    Start,
    End,
    StartCodon,
    StopCodon,
    Anchor(usize),
}

/// Part `B` of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Middle,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Middle),
            _ => None,
        }
    }
}

/// Parsed cutout position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSpec {
    pub anchor: AnchorRef,
    pub align: Align,
    pub offset: i64,
}

impl fmt::Display for PositionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.anchor {
            AnchorRef::Start => write!(f, "start")?,
            AnchorRef::End => write!(f, "end")?,
            AnchorRef::StartCodon => write!(f, "atg")?,
            AnchorRef::StopCodon => write!(f, "*")?,
            AnchorRef::Anchor(i) => write!(f, "a{}", i)?,
        }
        if !matches!(self.anchor, AnchorRef::Start | AnchorRef::End) {
            let c = match self.align {
                Align::Left => '<',
                Align::Right => '>',
                Align::Middle => '^',
            };
            write!(f, "{}", c)?;
        }
        if self.offset != 0 {
            write!(f, "{:+}", self.offset)?;
        }
        Ok(())
    }
}

impl PositionSpec {
    /// Parse a position, using `default_align` when `B` is omitted
    pub fn parse(pos: &str, mode: Mode, default_align: Align) -> AnchorResult<Self> {
        let pos = pos.trim().to_ascii_lowercase();
        let (head, offset) = match pos.find(|c: char| c == '+' || c == '-') {
            Some(k) => {
                let offset = pos[k..]
                    .parse::<i64>()
                    .map_err(|_| AnchorError::config(format!("invalid offset in position {}", pos)))?;
                (&pos[..k], offset)
            }
            None => (pos.as_str(), 0),
        };

        let (name, align) = match head.chars().last().and_then(Align::from_char) {
            Some(align) => (&head[..head.len() - 1], Some(align)),
            None => (head, None),
        };
        let anchor = match name {
            "start" => AnchorRef::Start,
            "end" => AnchorRef::End,
            "atg" => AnchorRef::StartCodon,
            "*" => AnchorRef::StopCodon,
            other => AnchorRef::Anchor(parse_anchor_index(other)?),
        };

        match anchor {
            AnchorRef::Start | AnchorRef::End if align.is_some() => {
                return Err(AnchorError::config(
                    "alignment characters <>^ not allowed for start and end",
                ));
            }
            AnchorRef::Start if offset < 0 => {
                return Err(AnchorError::config("negative offset not allowed for start"));
            }
            AnchorRef::End if offset > 0 => {
                return Err(AnchorError::config("positive offset not allowed for end"));
            }
            AnchorRef::StartCodon | AnchorRef::StopCodon if mode != Mode::Seq => {
                return Err(AnchorError::config(format!("{} only allowed in mode seq", name)));
            }
            _ => {}
        }
        Ok(Self {
            anchor,
            align: align.unwrap_or(default_align),
            offset,
        })
    }

    fn anchor_index(&self) -> Option<usize> {
        match self.anchor {
            AnchorRef::Anchor(i) => Some(i),
            _ => None,
        }
    }

    /// Interval referenced by `A` in sequence `seq`
    fn interval(&self, seq: &Sequence, anchors: &AnchorList, mode: Mode) -> AnchorResult<(i64, i64)> {
        let len = seq.len() as i64;
        let codon = |at_start: bool| -> AnchorResult<(i64, i64)> {
            let cds = seq
                .cds
                .ok_or_else(|| AnchorError::cutout(&seq.id, "no CDS annotation"))?;
            let (start, stop) = (cds.start as i64, cds.stop as i64);
            // the start codon of a reverse strand CDS is at its stop
            let left = matches!(cds.strand, Strand::Forward) == at_start;
            Ok(if left { (start, start + 3) } else { (stop - 3, stop) })
        };
        match self.anchor {
            AnchorRef::Start => Ok((0, 0)),
            AnchorRef::End => Ok((len, len)),
            AnchorRef::StartCodon => codon(true),
            AnchorRef::StopCodon => codon(false),
            AnchorRef::Anchor(i) => {
                let anchor = anchors
                    .get(i)
                    .ok_or_else(|| AnchorError::config(format!("anchor a{} does not exist", i)))?;
                anchor
                    .interval(&seq.id, mode)
                    .ok_or_else(|| AnchorError::cutout(&seq.id, format!("no fluke in anchor a{}", i)))
            }
        }
    }

    /// Absolute index of this position in `seq`
    pub fn resolve(&self, seq: &Sequence, anchors: &AnchorList, mode: Mode) -> AnchorResult<i64> {
        let (i1, i2) = self.interval(seq, anchors, mode)?;
        let i = match self.align {
            Align::Left => i1,
            Align::Right => i2,
            Align::Middle => (i1 + i2).div_euclid(2),
        };
        Ok(i + self.offset)
    }
}

/// Cut every sequence between the positions `pos1` and `pos2`
///
/// In mode `seq` the result can be searched again: it carries the strand of
/// the coding region and an offset of `index1`, or `index2` on the reverse
/// strand where residue 0 starts at the right edge. Sequences without a required fluke, or whose fluke scores below
/// `score_use_fluke`, are skipped with a warning.
pub fn cutout(
    seqs: &[Sequence],
    anchors: &AnchorList,
    pos1: &str,
    pos2: &str,
    mode: Mode,
    score_use_fluke: Option<f64>,
) -> AnchorResult<Vec<Sequence>> {
    let mode = anchors.effective_mode(mode);
    let left = PositionSpec::parse(pos1, mode, Align::Left)?;
    let right = PositionSpec::parse(pos2, mode, Align::Right)?;
    let used: Vec<usize> = [left, right].iter().filter_map(PositionSpec::anchor_index).collect();
    for &i in &used {
        let anchor = anchors
            .get(i)
            .ok_or_else(|| AnchorError::config(format!("anchor a{} does not exist", i)))?;
        let missing: Vec<&str> = anchor
            .iter()
            .map(|f| f.seqid.as_str())
            .filter(|id| !seqs.iter().any(|s| s.id == *id))
            .collect();
        if !missing.is_empty() {
            warn!("Anchor a{} has flukes for sequences not present: {}", i, missing.join(", "));
        }
    }

    let mut out = Vec::with_capacity(seqs.len());
    'seqs: for seq in seqs {
        if let Some(threshold) = score_use_fluke {
            for &i in &used {
                if let Some(f) = anchors.get(i).and_then(|a| a.fluke(&seq.id)) {
                    if f64::from(f.score) < threshold {
                        warn!(
                            "Do not use sequence {}, score of fluke in a{} is below {}",
                            seq.id, i, threshold
                        );
                        continue 'seqs;
                    }
                }
            }
        }
        let bounds = left
            .resolve(seq, anchors, mode)
            .and_then(|i| right.resolve(seq, anchors, mode).map(|j| (i, j)));
        let (i, j) = match bounds {
            Ok(b) => b,
            Err(AnchorError::CutoutResolution { seqid, reason }) => {
                warn!("Skip sequence {}: {}", seqid, reason);
                continue;
            }
            Err(e) => return Err(e),
        };
        let len = seq.len() as i64;
        let i = i.clamp(0, len) as usize;
        let j = (j.clamp(0, len) as usize).max(i);
        let strand = match mode {
            Mode::Seq => seq.cds.map_or(seq.strand, |cds| cds.strand),
            _ => Strand::Forward,
        };
        let offset = match strand {
            Strand::Forward => i,
            Strand::Reverse => j,
        };
        out.push(Sequence {
            id: seq.id.clone(),
            data: seq.data[i..j].to_vec(),
            offset: (mode == Mode::Seq).then_some(offset as i64),
            cds: None,
            strand,
        });
    }
    Ok(out)
}
