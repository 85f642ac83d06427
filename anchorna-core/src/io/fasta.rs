//! FASTA/FASTQ sequence files
//!
//! Parsing goes through needletail. Header tokens after the id carry the
//! sequence metadata: `offset=N`, `cds=START-STOP` (1-based inclusive) and
//! `strand=+|-` for the coding region, or without `cds` for the residues of
//! a cut out sequence. Written files emit the same tokens so
//! cut out sequences can be searched again.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use needletail::{parse_fastx_file, parse_fastx_reader};
use thiserror::Error;

use crate::types::{Cds, Offset, Sequence, Strand};

const LINE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum SequenceFileError {
    #[error("Invalid header token {token} for sequence {id}")]
    InvalidHeader { id: String, token: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty file or no sequences found")]
    EmptyFile,
}

pub type SequenceFileResult<T> = Result<T, SequenceFileError>;

/// Read all sequences of a FASTA/FASTQ file
pub fn read_sequences_file<P: AsRef<Path>>(path: P) -> SequenceFileResult<Vec<Sequence>> {
    let mut reader = parse_fastx_file(&path).map_err(|e| SequenceFileError::Parse(e.to_string()))?;
    let mut sequences = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| SequenceFileError::Parse(e.to_string()))?;
        sequences.push(record_to_sequence(&record.id(), &record.seq())?);
    }
    finish(sequences)
}

/// Read all sequences from any readable source
pub fn read_sequences<R: std::io::Read + Send>(reader: R) -> SequenceFileResult<Vec<Sequence>> {
    let mut fastx_reader = parse_fastx_reader(reader).map_err(|e| SequenceFileError::Parse(e.to_string()))?;
    let mut sequences = Vec::new();
    while let Some(record) = fastx_reader.next() {
        let record = record.map_err(|e| SequenceFileError::Parse(e.to_string()))?;
        sequences.push(record_to_sequence(&record.id(), &record.seq())?);
    }
    finish(sequences)
}

fn finish(sequences: Vec<Sequence>) -> SequenceFileResult<Vec<Sequence>> {
    if sequences.is_empty() {
        Err(SequenceFileError::EmptyFile)
    } else {
        debug!("Read {} sequences", sequences.len());
        Ok(sequences)
    }
}

/// Build a sequence from the full header line and the residues
fn record_to_sequence(header: &[u8], data: &[u8]) -> SequenceFileResult<Sequence> {
    let header = String::from_utf8_lossy(header);
    let mut tokens = header.split_whitespace();
    let id = tokens.next().unwrap_or_default().to_string();
    let invalid = |token: &str| SequenceFileError::InvalidHeader {
        id: id.clone(),
        token: token.to_string(),
    };

    let mut offset: Option<Offset> = None;
    let mut cds_range: Option<(usize, usize)> = None;
    let mut strand = Strand::Forward;
    for token in tokens {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "offset" => offset = Some(value.parse().map_err(|_| invalid(token))?),
            "cds" => {
                let (start, stop) = value.split_once('-').ok_or_else(|| invalid(token))?;
                let start: usize = start.parse().map_err(|_| invalid(token))?;
                let stop: usize = stop.parse().map_err(|_| invalid(token))?;
                if start == 0 || stop < start {
                    return Err(invalid(token));
                }
                cds_range = Some((start - 1, stop));
            }
            "strand" => {
                strand = match value {
                    "+" => Strand::Forward,
                    "-" => Strand::Reverse,
                    _ => return Err(invalid(token)),
                }
            }
            _ => {}
        }
    }

    let mut sequence = Sequence::new(id.clone(), data.to_vec());
    sequence.offset = offset;
    match cds_range {
        Some((start, stop)) => {
            if stop > sequence.len() {
                return Err(invalid(&format!("cds={}-{}", start + 1, stop)));
            }
            sequence.cds = Some(Cds::new(start, stop, strand));
        }
        None => sequence.strand = strand,
    }
    Ok(sequence)
}

/// Write sequences as FASTA with metadata tokens in the header
pub fn write_sequences<W: Write>(sequences: &[Sequence], mut writer: W) -> SequenceFileResult<()> {
    for seq in sequences {
        write!(writer, ">{}", seq.id)?;
        if let Some(offset) = seq.offset {
            write!(writer, " offset={}", offset)?;
        }
        match seq.cds {
            Some(cds) => write!(writer, " cds={}-{} strand={}", cds.start + 1, cds.stop, cds.strand)?,
            None if seq.strand == Strand::Reverse => write!(writer, " strand={}", seq.strand)?,
            None => {}
        }
        writeln!(writer)?;
        for chunk in seq.data.chunks(LINE_WIDTH) {
            writer.write_all(chunk)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

pub fn write_sequences_file<P: AsRef<Path>>(sequences: &[Sequence], path: P) -> SequenceFileResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_sequences(sequences, &mut writer)?;
    writer.flush()?;
    Ok(())
}
