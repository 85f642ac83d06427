//! Anchor data model
//!
//! A [`Fluke`] is one sequence's matched word, an [`Anchor`] groups exactly one
//! fluke per sequence around a guide fluke, and an [`AnchorList`] is the
//! ordered result of a search together with its `no_cds` flag.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use crate::error::{AnchorError, AnchorResult};
use crate::scoring::{max_and_median, SubstitutionMatrix};
use crate::types::{Mode, Offset, Strand};

/// Match of one anchor in one sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fluke {
    pub seqid: String,
    /// Half-open interval in working coordinates (residue index)
    pub start: usize,
    pub stop: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    #[serde(default)]
    pub strand: Strand,
    pub word: String,
    /// Best score against the consensus word set
    pub score: i32,
    /// Median score against the consensus word set
    pub median_score: f64,
    #[serde(default)]
    pub poor: bool,
}

impl Fluke {
    pub fn new<S: Into<String>, W: Into<String>>(seqid: S, start: usize, word: W) -> Self {
        let word = word.into();
        Self {
            seqid: seqid.into(),
            start,
            stop: start + word.len(),
            offset: None,
            strand: Strand::Forward,
            word,
            score: 0,
            median_score: 0.0,
            poor: false,
        }
    }

    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    /// Interval converted to the coordinate frame `mode`
    ///
    /// `seq` is `3 * i + offset` on the forward strand and `offset - 3 * i`
    /// with swapped bounds on the reverse strand. A missing offset counts as 0.
    pub fn interval(&self, mode: Mode) -> (i64, i64) {
        let start = self.start as i64;
        let stop = self.stop as i64;
        let offset = self.offset.unwrap_or(0);
        match mode {
            Mode::Aa => (start, stop),
            Mode::Cds => (3 * start, 3 * stop),
            Mode::Seq => match self.strand {
                Strand::Forward => (3 * start + offset, 3 * stop + offset),
                Strand::Reverse => (offset - 3 * stop, offset - 3 * start),
            },
        }
    }

    /// Start of [`Fluke::interval`] and its length in the frame `mode`
    pub fn start_and_len(&self, mode: Mode) -> (i64, i64) {
        let (i, j) = self.interval(mode);
        (i, j - i)
    }
}

/// One fluke per participating sequence, referencing a guide sequence
///
/// The guide fluke is always kept first. Equality and hashing only look at
/// the guide's `(start, len, offset)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AnchorRepr")]
pub struct Anchor {
    flukes: Vec<Fluke>,
    gseqid: String,
}

#[derive(Deserialize)]
struct AnchorRepr {
    flukes: Vec<Fluke>,
    gseqid: String,
}

impl TryFrom<AnchorRepr> for Anchor {
    type Error = AnchorError;

    fn try_from(repr: AnchorRepr) -> Result<Self, Self::Error> {
        Anchor::new(repr.flukes, repr.gseqid)
    }
}

impl Anchor {
    /// Validate the fluke set and move the guide fluke to the front
    pub fn new<S: Into<String>>(mut flukes: Vec<Fluke>, gseqid: S) -> AnchorResult<Self> {
        let gseqid = gseqid.into();
        let pos = flukes
            .iter()
            .position(|f| f.seqid == gseqid)
            .ok_or_else(|| AnchorError::input(format!("anchor has no fluke for guide {}", gseqid)))?;
        let guide = flukes.remove(pos);
        flukes.insert(0, guide);

        let len = flukes[0].len();
        let mut seen = HashSet::with_capacity(flukes.len());
        for f in &flukes {
            if f.stop <= f.start {
                return Err(AnchorError::input(format!(
                    "fluke {} has empty interval {}..{}",
                    f.seqid, f.start, f.stop
                )));
            }
            if f.len() != len {
                return Err(AnchorError::input(format!(
                    "fluke {} has length {}, guide has length {}",
                    f.seqid,
                    f.len(),
                    len
                )));
            }
            if !seen.insert(f.seqid.as_str()) {
                return Err(AnchorError::input(format!(
                    "anchor contains two flukes for sequence {}",
                    f.seqid
                )));
            }
        }
        Ok(Self { flukes, gseqid })
    }

    /// Anchor without the structural checks of [`Anchor::new`]
    ///
    /// Callers must put the guide fluke first.
    pub(crate) fn from_parts(flukes: Vec<Fluke>, gseqid: String) -> Self {
        debug_assert!(flukes.first().map(|f| f.seqid == gseqid).unwrap_or(false));
        Self { flukes, gseqid }
    }

    pub fn id(&self) -> String {
        let g = self.guide();
        format!("A {}+{}", g.start, g.len())
    }

    pub fn gseqid(&self) -> &str {
        &self.gseqid
    }

    pub fn guide(&self) -> &Fluke {
        &self.flukes[0]
    }

    pub fn flukes(&self) -> &[Fluke] {
        &self.flukes
    }

    /// Mutable access for coordinate conversion; seqids must not change
    pub fn flukes_mut(&mut self) -> &mut [Fluke] {
        &mut self.flukes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fluke> {
        self.flukes.iter()
    }

    pub fn len(&self) -> usize {
        self.flukes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flukes.is_empty()
    }

    /// Common word length of all flukes
    pub fn word_len(&self) -> usize {
        self.guide().len()
    }

    pub fn fluke(&self, seqid: &str) -> Option<&Fluke> {
        self.flukes.iter().find(|f| f.seqid == seqid)
    }

    pub fn good_flukes(&self) -> impl Iterator<Item = &Fluke> {
        self.flukes.iter().filter(|f| !f.poor)
    }

    pub fn poor_flukes(&self) -> impl Iterator<Item = &Fluke> {
        self.flukes.iter().filter(|f| f.poor)
    }

    pub fn minscore(&self) -> f64 {
        self.flukes
            .iter()
            .map(|f| f.median_score)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn maxscore(&self) -> f64 {
        self.flukes
            .iter()
            .map(|f| f.median_score)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn medscore(&self) -> f64 {
        let mut scores: Vec<f64> = self.flukes.iter().map(|f| f.median_score).collect();
        scores.sort_by(f64::total_cmp);
        let n = scores.len();
        match n {
            0 => 0.0,
            _ if n % 2 == 1 => scores[n / 2],
            _ => (scores[n / 2 - 1] + scores[n / 2]) / 2.0,
        }
    }

    /// Interval of the fluke for `seqid` in the frame `mode`
    pub fn interval(&self, seqid: &str, mode: Mode) -> Option<(i64, i64)> {
        self.fluke(seqid).map(|f| f.interval(mode))
    }

    pub fn set_strand(&mut self, strand: Strand) {
        for f in &mut self.flukes {
            f.strand = strand;
        }
    }

    /// Recompute max and median score of every fluke against the good words
    pub fn recalculate_scores(&mut self, matrix: &SubstitutionMatrix) {
        let mut words: Vec<&str> = Vec::new();
        for f in self.flukes.iter().filter(|f| !f.poor) {
            if !words.contains(&f.word.as_str()) {
                words.push(f.word.as_str());
            }
        }
        let words: Vec<String> = words.into_iter().map(str::to_string).collect();
        self.recalculate_scores_with(words.iter().map(String::as_bytes), matrix);
    }

    /// Recompute max and median score of every fluke against `words`
    pub(crate) fn recalculate_scores_with<'a, I>(&mut self, words: I, matrix: &SubstitutionMatrix)
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let words: Vec<&[u8]> = words.into_iter().collect();
        for f in &mut self.flukes {
            if let Some((max, median)) = max_and_median(f.word.as_bytes(), words.iter().copied(), matrix) {
                f.score = max;
                f.median_score = median;
            }
        }
    }

    fn sort_key(&self) -> (usize, usize) {
        let g = self.guide();
        (g.start, g.len())
    }

    /// Human readable summary, one line or one line per fluke with `verbose`
    pub fn to_text(&self, index: Option<usize>, verbose: bool, mode: Mode) -> String {
        let g = self.guide();
        let (start, len) = g.start_and_len(mode);
        let mut out = format!(
            "A{} {}+{}  minscore {}  poor {}  {}",
            index.map(|i| i.to_string()).unwrap_or_default(),
            start,
            len,
            self.minscore(),
            self.poor_flukes().count(),
            g.word
        );
        if verbose {
            for (j, f) in self.flukes.iter().enumerate() {
                let (fstart, _) = f.start_and_len(mode);
                let _ = write!(
                    out,
                    "\n  F{} {}  score {}  {}  {}{}",
                    j,
                    fstart,
                    f.median_score,
                    f.word,
                    f.seqid,
                    if f.poor { "  (poor)" } else { "" }
                );
            }
        }
        out
    }
}

impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.guide(), other.guide());
        a.start == b.start && a.len() == b.len() && a.offset == b.offset
    }
}

impl Eq for Anchor {}

impl Hash for Anchor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let g = self.guide();
        g.start.hash(state);
        g.len().hash(state);
        g.offset.hash(state);
    }
}

impl<'a> IntoIterator for &'a Anchor {
    type Item = &'a Fluke;
    type IntoIter = std::slice::Iter<'a, Fluke>;

    fn into_iter(self) -> Self::IntoIter {
        self.flukes.iter()
    }
}

/// Ordered collection of anchors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnchorList {
    pub anchors: Vec<Anchor>,
    /// Sequences were used as given, without translating a coding region
    #[serde(default)]
    pub no_cds: bool,
}

impl AnchorList {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self { anchors, no_cds: false }
    }

    pub fn with_no_cds(mut self, no_cds: bool) -> Self {
        self.no_cds = no_cds;
        self
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Anchor> {
        self.anchors.get(index)
    }

    /// Sort by guide start, then guide length
    pub fn sort(&mut self) -> &mut Self {
        self.anchors.sort_by_key(Anchor::sort_key);
        self
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// Coordinate frame actually applied for `mode`
    pub fn effective_mode(&self, mode: Mode) -> Mode {
        if self.no_cds {
            Mode::Aa
        } else {
            mode
        }
    }

    /// Anchors picked by a selection like `4:10,12` or `a3:a5,a7`
    ///
    /// Ranges are half-open; open ends (`:5`, `3:`) are allowed.
    pub fn select(&self, selection: &str) -> AnchorResult<AnchorList> {
        let indices = parse_selection(selection, self.len())?;
        Ok(AnchorList {
            anchors: indices.into_iter().map(|i| self.anchors[i].clone()).collect(),
            no_cds: self.no_cds,
        })
    }

    /// Drop the anchors picked by `selection`
    pub fn remove_selection(&mut self, selection: &str) -> AnchorResult<()> {
        let indices: HashSet<usize> = parse_selection(selection, self.len())?.into_iter().collect();
        let mut i = 0;
        self.anchors.retain(|_| {
            let keep = !indices.contains(&i);
            i += 1;
            keep
        });
        Ok(())
    }

    pub fn to_text(&self, verbose: bool, mode: Mode) -> String {
        let mode = self.effective_mode(mode);
        self.anchors
            .iter()
            .enumerate()
            .map(|(i, a)| a.to_text(Some(i), verbose, mode))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Index<usize> for AnchorList {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.anchors[index]
    }
}

impl IntoIterator for AnchorList {
    type Item = Anchor;
    type IntoIter = std::vec::IntoIter<Anchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.anchors.into_iter()
    }
}

impl<'a> IntoIterator for &'a AnchorList {
    type Item = &'a Anchor;
    type IntoIter = std::slice::Iter<'a, Anchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.anchors.iter()
    }
}

impl FromIterator<Anchor> for AnchorList {
    fn from_iter<T: IntoIterator<Item = Anchor>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parse an anchor index, optionally prefixed with `a`
pub fn parse_anchor_index(s: &str) -> AnchorResult<usize> {
    let s = s.trim();
    let digits = s.strip_prefix('a').or_else(|| s.strip_prefix('A')).unwrap_or(s);
    digits
        .parse::<usize>()
        .map_err(|_| AnchorError::config(format!("invalid anchor index {}", s)))
}

fn parse_selection(selection: &str, n: usize) -> AnchorResult<Vec<usize>> {
    let mut indices = Vec::new();
    for part in selection.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (i, j) = match part.split_once(':') {
            Some((i, j)) => {
                let i = if i.trim().is_empty() { 0 } else { parse_anchor_index(i)? };
                let j = if j.trim().is_empty() { n } else { parse_anchor_index(j)? };
                (i, j)
            }
            None => {
                let i = parse_anchor_index(part)?;
                (i, i + 1)
            }
        };
        indices.extend(i.min(n)..j.min(n));
    }
    Ok(indices)
}
