//! Command implementations for the AnchoRNA CLI

pub mod combine;
pub mod create;
pub mod cutout;
pub mod export;
pub mod go;
pub mod print;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anchorna_core::io::{load_selected_anchors, read_json_file, write_anchors, write_json, AnchorFormat};
use anchorna_core::AnchorList;

use crate::error::CliError;

/// Load anchors given as `fname`, `fname|select` or `fname|select|remove`
///
/// JSON files support the selection part only.
pub fn load_anchors(expr: &str) -> Result<AnchorList> {
    let fname = expr.split('|').next().unwrap_or_default().trim();
    if fname != "-" && !Path::new(fname).exists() {
        return Err(CliError::file_not_found(PathBuf::from(fname)).into());
    }
    let anchors = match AnchorFormat::from_path(fname) {
        AnchorFormat::Json => {
            let anchors = read_json_file(fname).map_err(CliError::from)?;
            match expr.split('|').nth(1) {
                Some(select) => anchors.select(&select.to_lowercase()).map_err(CliError::from)?,
                None => anchors,
            }
        }
        AnchorFormat::Gff => load_selected_anchors(expr, true).map_err(CliError::from)?,
    };
    log::debug!("Loaded {} anchors from {}", anchors.len(), fname);
    Ok(anchors)
}

/// Writer for `out`, stdout when no path is given
pub fn open_output(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    })
}

/// Write anchors as JSON or GFF depending on the extension of `out`
pub fn write_anchor_list(anchors: &AnchorList, out: Option<&Path>) -> Result<()> {
    let mut writer = open_output(out)?;
    let format = out.map(AnchorFormat::from_path).unwrap_or(AnchorFormat::Gff);
    match format {
        AnchorFormat::Json => write_json(anchors, &mut writer).map_err(CliError::from)?,
        AnchorFormat::Gff => write_anchors(anchors, &mut writer, None).map_err(CliError::from)?,
    }
    writer.flush()?;
    if let Some(path) = out {
        log::info!("Write {} anchors to {}", anchors.len(), path.display());
    }
    Ok(())
}

/// Sequence file given on the command line or in the configuration
pub fn sequence_file(fname: Option<PathBuf>, config_fname: Option<&Path>) -> Result<PathBuf> {
    let path = fname
        .or_else(|| config_fname.map(Path::to_path_buf))
        .ok_or_else(|| CliError::config("no sequence file given, set fname or pass --fname"))?;
    if !path.exists() {
        return Err(CliError::file_not_found(path).into());
    }
    Ok(path)
}
