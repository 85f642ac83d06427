//! `anchorna cutout`: write the sequence regions between two positions

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use anchorna_core::io::{read_sequences_file, write_sequences};
use anchorna_core::{cutout, Mode};

use super::{load_anchors, open_output, sequence_file};
use crate::config::Config;
use crate::error::CliError;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    fname_anchor: &str,
    pos1: &str,
    pos2: &str,
    out: Option<&Path>,
    mode: Mode,
    fname: Option<PathBuf>,
    score_use_fluke: Option<f64>,
    no_cds: bool,
) -> Result<()> {
    let anchors = load_anchors(fname_anchor)?;
    let no_cds = no_cds || config.no_cds;
    if anchors.no_cds != no_cds {
        log::warn!(
            "Anchor file has no_cds={}, configuration has no_cds={}",
            anchors.no_cds,
            no_cds
        );
    }
    let path = sequence_file(fname, config.fname.as_deref())?;
    let seqs = read_sequences_file(&path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read sequences: {}", path.display()))?;

    let score_use_fluke = score_use_fluke.or(config.score_use_fluke);
    let parts = cutout(&seqs, &anchors, pos1, pos2, mode, score_use_fluke).map_err(CliError::from)?;
    log::info!("Cut out {} of {} sequences between {} and {}", parts.len(), seqs.len(), pos1, pos2);

    let mut writer = open_output(out)?;
    write_sequences(&parts, &mut writer).map_err(CliError::from)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_anchors;
    use crate::commands::write_anchor_list;
    use tempfile::tempdir;

    #[test]
    fn test_cutout_between_anchors() {
        let dir = tempdir().unwrap();
        let anchor_path = dir.path().join("anchors.gff");
        write_anchor_list(&sample_anchors(), Some(&anchor_path)).unwrap();

        // offset 3 matches the anchors, residue i starts at nucleotide 3 + 3 * i
        let nt: String = "ACG".to_string() + &"GCT".repeat(40);
        let seq_path = dir.path().join("seqs.fasta");
        std::fs::write(
            &seq_path,
            format!(">S1 cds=4-123 strand=+\n{}\n>S2 cds=4-123 strand=+\n{}\n", nt, nt),
        )
        .unwrap();

        let out = dir.path().join("cut.fasta");
        let config = Config::default();
        execute(
            &config,
            &anchor_path.display().to_string(),
            "a0>",
            "a1<",
            Some(&out),
            Mode::Seq,
            Some(seq_path),
            None,
            false,
        )
        .unwrap();

        let parts = read_sequences_file(&out).unwrap();
        assert_eq!(parts.len(), 2);
        // a0 ends at residue 7 (nt 24), a1 starts at residue 10 (nt 33)
        assert_eq!(parts[0].offset, Some(24));
        assert_eq!(parts[0].data.len(), 9);
    }
}
