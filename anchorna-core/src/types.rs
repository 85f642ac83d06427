use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnchorError;

/// Nucleotide offset of residue index 0 from the start of the original sequence
pub type Offset = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl From<bool> for Strand {
    fn from(forward: bool) -> Self {
        if forward {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }
}

impl From<Strand> for bool {
    fn from(strand: Strand) -> Self {
        matches!(strand, Strand::Forward)
    }
}

impl TryFrom<char> for Strand {
    type Error = AnchorError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '+' => Ok(Strand::Forward),
            '-' => Ok(Strand::Reverse),
            other => Err(AnchorError::input(format!("invalid strand {}", other))),
        }
    }
}

impl From<Strand> for char {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(*self))
    }
}

/// Coding sequence annotation in 0-based half-open nucleotide coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cds {
    pub start: usize,
    pub stop: usize,
    pub strand: Strand,
}

impl Cds {
    pub fn new(start: usize, stop: usize, strand: Strand) -> Self {
        Self { start, stop, strand }
    }

    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named sequence together with the metadata the anchor engine needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub data: Vec<u8>,
    /// Present for translated or cut out sequences
    pub offset: Option<Offset>,
    pub cds: Option<Cds>,
    /// Strand of the residues relative to the original sequence
    #[serde(default)]
    pub strand: Strand,
}

impl Sequence {
    pub fn new<S: Into<String>>(id: S, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            data,
            offset: None,
            cds: None,
            strand: Strand::Forward,
        }
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_cds(mut self, cds: Cds) -> Self {
        self.cds = Some(cds);
        self
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Residues as text; sequences are ASCII by construction
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn word(&self, start: usize, len: usize) -> Option<&[u8]> {
        self.data.get(start..start + len)
    }
}

/// Coordinate frame used when reporting or resolving fluke positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Residue index in the translated (or untranslated) working sequence
    #[default]
    Aa,
    /// Nucleotide index relative to the start of the coding region
    Cds,
    /// Nucleotide index in the original sequence
    Seq,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Aa => "aa",
            Mode::Cds => "cds",
            Mode::Seq => "seq",
        }
    }
}

impl FromStr for Mode {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aa" => Ok(Mode::Aa),
            "cds" => Ok(Mode::Cds),
            "seq" | "nt" => Ok(Mode::Seq),
            other => Err(AnchorError::config(format!(
                "mode {} not allowed, use one of aa, cds, seq",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_conversions() {
        assert_eq!(Strand::try_from('-').unwrap(), Strand::Reverse);
        assert_eq!(Strand::try_from('+').unwrap(), Strand::Forward);
        assert!(matches!(Strand::try_from('x'), Err(AnchorError::InputData(_))));
        assert_eq!(char::from(Strand::Reverse), '-');
        assert_eq!(Strand::Forward.to_string(), "+");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("AA".parse::<Mode>().unwrap(), Mode::Aa);
        assert_eq!("nt".parse::<Mode>().unwrap(), Mode::Seq);
        assert!(matches!("dna".parse::<Mode>(), Err(AnchorError::Configuration(_))));
    }

    #[test]
    fn test_sequence_word() {
        let seq = Sequence::new("s", b"MKLVIAG".to_vec()).with_offset(30);
        assert_eq!(seq.word(1, 3), Some(&b"KLV"[..]));
        assert_eq!(seq.word(6, 3), None);
        assert_eq!(seq.offset, Some(30));
    }
}
