//! JSON anchor files

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::anchor::AnchorList;
use super::{AnchorFileError, AnchorFileResult};

impl From<serde_json::Error> for AnchorFileError {
    fn from(err: serde_json::Error) -> Self {
        match err.line() {
            0 => AnchorFileError::Io(err.into()),
            line => AnchorFileError::Parse {
                line,
                message: err.to_string(),
            },
        }
    }
}

pub fn write_json<W: Write>(anchors: &AnchorList, writer: W) -> AnchorFileResult<()> {
    serde_json::to_writer(writer, anchors)?;
    Ok(())
}

pub fn write_json_file<P: AsRef<Path>>(anchors: &AnchorList, path: P) -> AnchorFileResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(anchors, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read anchors from JSON; anchors are validated like freshly built ones
pub fn read_json<R: Read>(reader: R) -> AnchorFileResult<AnchorList> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn read_json_file<P: AsRef<Path>>(path: P) -> AnchorFileResult<AnchorList> {
    read_json(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, Fluke};
    use crate::types::Strand;

    #[test]
    fn test_json_keeps_all_fields() {
        let mut f1 = Fluke::new("S1", 3, "MKL");
        f1.offset = Some(99);
        f1.strand = Strand::Reverse;
        f1.median_score = 12.5;
        let mut f2 = Fluke::new("S2", 4, "MRL");
        f2.poor = true;
        let list = AnchorList::new(vec![Anchor::new(vec![f2, f1], "S1").unwrap()]).with_no_cds(true);

        let mut buf = Vec::new();
        write_json(&list, &mut buf).unwrap();
        let back = read_json(buf.as_slice()).unwrap();
        assert!(back.no_cds);
        assert_eq!(back[0].gseqid(), "S1");
        assert_eq!(back[0].flukes(), list[0].flukes());
    }

    #[test]
    fn test_invalid_anchor_is_rejected() {
        let text = r#"{"anchors":[{"gseqid":"S9","flukes":[{"seqid":"S1","start":0,"stop":3,"word":"MKL","score":1,"median_score":1.0}]}]}"#;
        assert!(read_json(text.as_bytes()).is_err());
        assert!(matches!(read_json("{".as_bytes()), Err(AnchorFileError::Parse { .. })));
    }
}
