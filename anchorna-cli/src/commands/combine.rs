//! `anchorna combine`: join anchors of several files into one list

use anyhow::Result;
use std::path::Path;

use anchorna_core::combine;

use super::{load_anchors, write_anchor_list};
use crate::error::CliError;

pub fn execute(fname_anchors: &[String], out: Option<&Path>, convert_nt: bool) -> Result<()> {
    let lists = fname_anchors
        .iter()
        .map(|expr| load_anchors(expr))
        .collect::<Result<Vec<_>>>()?;
    log::info!(
        "Combine {} anchors of {} files",
        lists.iter().map(|l| l.len()).sum::<usize>(),
        lists.len()
    );
    let anchors = combine(lists, convert_nt).map_err(CliError::from)?;
    write_anchor_list(&anchors, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::sample_anchors;
    use anchorna_core::io::read_anchors_file;
    use tempfile::tempdir;

    #[test]
    fn test_combine_selections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anchors.gff");
        write_anchor_list(&sample_anchors(), Some(&path)).unwrap();
        let out = dir.path().join("combined.gff");
        let exprs = [format!("{}|2", path.display()), format!("{}|:1", path.display())];
        execute(&exprs, Some(&out), false).unwrap();
        let combined = read_anchors_file(&out, true).unwrap();
        assert_eq!(combined.len(), 2);
        // the result is sorted by guide position
        assert_eq!(combined[0].guide().start, 2);
        assert_eq!(combined[1].guide().start, 20);
    }
}
