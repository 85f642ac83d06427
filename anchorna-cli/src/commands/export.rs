//! `anchorna export`: anchors in GFF, Jalview or Dialign format

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use anchorna_core::io::{export_dialign, export_jalview, read_sequences_file, write_anchors};
use anchorna_core::{AnchorList, Mode};

use super::{load_anchors, open_output};
use crate::config::Config;
use crate::error::CliError;
use crate::ExportFormat;

/// Sequence ids in the order of the sequence file, or by first appearance
fn dialign_seqids(anchors: &AnchorList, fname: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = fname {
        let seqs = read_sequences_file(path).map_err(CliError::from)?;
        return Ok(seqs.into_iter().map(|s| s.id).collect());
    }
    let mut seqids: Vec<String> = Vec::new();
    for f in anchors.iter().flat_map(|a| a.iter()) {
        if !seqids.contains(&f.seqid) {
            seqids.push(f.seqid.clone());
        }
    }
    Ok(seqids)
}

pub fn execute(
    config: &Config,
    fname_anchor: &str,
    out: Option<&Path>,
    mode: Mode,
    fmt: ExportFormat,
    score_use_fluke: Option<f64>,
    fname: Option<PathBuf>,
) -> Result<()> {
    let anchors = load_anchors(fname_anchor)?;
    let score_use_fluke = score_use_fluke.or(config.score_use_fluke);
    let mut writer = open_output(out)?;

    match fmt {
        ExportFormat::Gff => {
            // residue coordinates stay a readable anchor file
            let mode = (anchors.effective_mode(mode) != Mode::Aa).then_some(mode);
            write_anchors(&anchors, &mut writer, mode).map_err(CliError::from)?;
        }
        ExportFormat::Jalview => {
            writer.write_all(export_jalview(&anchors, mode, score_use_fluke).as_bytes())?;
        }
        ExportFormat::Dialign => {
            let fname = fname.or_else(|| config.fname.clone()).filter(|p| p.exists());
            let seqids = dialign_seqids(&anchors, fname.as_deref())?;
            let seqids: Vec<&str> = seqids.iter().map(String::as_str).collect();
            writer.write_all(export_dialign(&anchors, &seqids, mode, score_use_fluke).as_bytes())?;
        }
    }
    writer.flush()?;
    if let Some(path) = out {
        log::info!("Exported {} anchors to {}", anchors.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_anchors;
    use crate::commands::write_anchor_list;
    use tempfile::tempdir;

    #[test]
    fn test_dialign_seqids_by_appearance() {
        let seqids = dialign_seqids(&sample_anchors(), None).unwrap();
        assert_eq!(seqids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_export_formats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anchors.gff");
        write_anchor_list(&sample_anchors(), Some(&path)).unwrap();
        let expr = path.display().to_string();
        let config = Config::default();

        let out = dir.path().join("anchors.jalview");
        execute(&config, &expr, Some(&out), Mode::Aa, ExportFormat::Jalview, None, None).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("STARTFILTERS"));
        assert!(text.contains("anchor2_s25"));

        let out = dir.path().join("anchors.dialign");
        execute(&config, &expr, Some(&out), Mode::Aa, ExportFormat::Dialign, None, None).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 3);

        let out = dir.path().join("anchors_seq.gff");
        execute(&config, &expr, Some(&out), Mode::Seq, ExportFormat::Gff, None, None).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("with mode seq"));
    }
}
