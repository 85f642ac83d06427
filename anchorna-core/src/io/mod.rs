//! File format I/O modules for AnchoRNA
//!
//! Anchor files (GFF3 with per-fluke offset attributes, JSON), sequence files (FASTA with
//! `offset=`/`cds=`/`strand=` header tokens) and viewer exports.

#[cfg(feature = "io-gff")] pub mod gff;
#[cfg(feature = "io-json")] pub mod json;
#[cfg(feature = "io-fasta")] pub mod fasta;
#[cfg(feature = "export")] pub mod export;

#[cfg(feature = "io-gff")] pub use gff::{load_selected_anchors, read_anchors, read_anchors_file, write_anchors, write_anchors_file};
#[cfg(feature = "io-json")] pub use json::{read_json, read_json_file, write_json, write_json_file};
#[cfg(feature = "io-fasta")] pub use fasta::{read_sequences, read_sequences_file, write_sequences, write_sequences_file, SequenceFileError};
#[cfg(feature = "export")] pub use export::{export_dialign, export_jalview};

use thiserror::Error;

use crate::error::AnchorError;

/// Errors reading or writing anchor files
#[derive(Debug, Error)]
pub enum AnchorFileError {
    #[error("{0} is not a valid GFF file")]
    NotGff(String),
    #[error("{0} is not a valid anchor file")]
    NotAnchorFile(String),
    #[error("Invalid GFF line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Fluke with name {name} is not part of anchor {anchor}")]
    ForeignFluke { name: String, anchor: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

impl AnchorFileError {
    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Parse { line, message: message.into() }
    }
}

pub type AnchorFileResult<T> = Result<T, AnchorFileError>;

/// Anchor file format chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorFormat {
    Gff,
    Json,
}

impl AnchorFormat {
    /// `.json` selects JSON, everything else GFF
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        let path_str = path.as_ref().to_string_lossy().to_lowercase();
        if path_str.ends_with(".json") {
            AnchorFormat::Json
        } else {
            AnchorFormat::Gff
        }
    }
}
