//! `anchorna print`: show anchors on stdout

use anyhow::Result;

use anchorna_core::Mode;

use super::load_anchors;

pub fn execute(fname_anchor: &str, verbose: bool, mode: Mode) -> Result<()> {
    let anchors = load_anchors(fname_anchor)?;
    if anchors.no_cds && mode != Mode::Aa {
        log::warn!("Anchors were found without coding region, print residue indices");
    }
    println!("{}", anchors.to_text(verbose, mode));
    Ok(())
}
