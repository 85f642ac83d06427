//! `anchorna go`: find anchors in the sequence file

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use anchorna_core::io::read_sequences_file;
use anchorna_core::scan::order_by_guide;
use anchorna_core::{find_anchors, prepare_sequences, AnchorOptions, Progress, Sequence};

use super::{load_anchors, sequence_file, write_anchor_list};
use crate::config::Config;
use crate::error::CliError;
use crate::GoArgs;

/// Command line flags take precedence over the configuration file
fn apply_overrides(mut config: Config, args: &GoArgs) -> Config {
    if let Some(fname) = &args.fname {
        config.fname = Some(fname.clone());
    }
    if let Some(w) = args.w {
        config.w = w;
    }
    if let Some(gseqid) = &args.gseqid {
        config.gseqid = Some(gseqid.clone());
    }
    if let Some(search_range) = args.search_range {
        config.search_range = search_range;
    }
    if let Some(scoring) = &args.scoring {
        config.scoring = scoring.clone();
    }
    if let Some(score) = args.score_add_word {
        config.score_add_word = score;
    }
    if let Some(quota) = args.thr_quota_add_anchor {
        config.thr_quota_add_anchor = quota;
    }
    if let Some(score) = args.thr_score_add_anchor {
        config.thr_score_add_anchor = score;
    }
    if args.aggressive_remove {
        config.aggressive_remove = true;
    }
    if args.no_aggressive_remove {
        config.aggressive_remove = false;
    }
    if let Some(path) = &args.removed_anchors_path {
        config.removed_anchors_path = Some(path.clone());
    }
    if let Some(logfile) = &args.logfile {
        config.logfile = Some(logfile.clone());
    }
    if args.no_cds {
        config.no_cds = true;
    }
    if args.njobs.is_some() {
        config.njobs = args.njobs;
    }
    config
}

/// Number of guide positions the scan visits
fn scan_length(seqs: &[Sequence], options: &AnchorOptions) -> Result<u64> {
    let prepared = prepare_sequences(seqs, options.no_cds).map_err(CliError::from)?;
    let ordered = order_by_guide(&prepared, options.guide_id()).map_err(CliError::from)?;
    let len = ordered.first().map_or(0, |guide| guide.len());
    Ok((len + 1).saturating_sub(options.w) as u64)
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

pub fn execute(config: Config, args: GoArgs) -> Result<()> {
    log::info!("anchorna go {:?}", args);
    let config = apply_overrides(config, &args);
    let mut options = config.anchor_options();
    options.remove = !args.no_remove;
    options.validate().map_err(CliError::from)?;
    if options.njobs.is_none() {
        log::info!("Use all {} available cores", num_cpus::get());
    }

    let path = sequence_file(None, config.fname.as_deref())?;
    let seqs = read_sequences_file(&path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read sequences: {}", path.display()))?;
    log::info!("Read {} sequences from {}", seqs.len(), path.display());

    let continue_with = match &args.continue_with {
        Some(expr) => Some(load_anchors(expr)?),
        None => None,
    };

    let pb = if args.no_pbar || continue_with.is_some() {
        None
    } else {
        Some(create_progress_bar(scan_length(&seqs, &options)?))
    };
    let callback = |done: usize, found: usize| {
        if let Some(pb) = &pb {
            pb.set_position(done as u64);
            pb.set_message(format!("{} anchors", found));
        }
    };
    let progress: Progress<'_> = &callback;

    let (anchors, removed) =
        find_anchors(&seqs, &options, continue_with, Some(progress)).map_err(CliError::from)?;
    if let Some(pb) = &pb {
        pb.finish_with_message(format!("{} anchors", anchors.len()));
    }

    write_anchor_list(&anchors, Some(&args.fname_anchor))?;

    let timestamp = chrono::Local::now().format("%Y_%m_%d-%H_%M_%S").to_string();
    if let (Some(removed), Some(rap)) = (removed, config.removed_anchors_path(&timestamp)) {
        write_anchor_list(&removed, Some(rap.as_path()))
            .with_context(|| format!("Failed to write removed anchors: {}", rap.display()))?;
    }
    Ok(())
}
