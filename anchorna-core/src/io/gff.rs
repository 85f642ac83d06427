//! GFF3 anchor files
//!
//! One feature line per fluke. The guide fluke of each anchor has type
//! `anchor` and name `A{i}`, the other flukes type `fluke` and name
//! `A{i}_{seqid}`. Coordinates are 1-based inclusive working coordinates;
//! the nucleotide offset of each fluke is kept in its `offset` attribute so
//! that a file read back in is identical to the written list.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::anchor::{Anchor, AnchorList, Fluke};
use crate::types::{Mode, Strand};
use super::{AnchorFileError, AnchorFileResult};

const SOURCE: &str = "anchorna";

/// Write anchors as GFF3
///
/// With `mode` the coordinates are transformed into that frame and the
/// offset attributes are left out. Such files are meant for other tools and
/// are rejected by a header-checking read.
pub fn write_anchors<W: Write>(anchors: &AnchorList, mut writer: W, mode: Option<Mode>) -> AnchorFileResult<()> {
    writeln!(writer, "##gff-version 3")?;
    match mode {
        None => {
            writeln!(writer, "#AnchoRNA anchor file")?;
            writeln!(writer, "# written with AnchoRNA v{}", crate::VERSION)?;
            if anchors.no_cds {
                writeln!(writer, "#no_cds")?;
            } else {
                writeln!(
                    writer,
                    "# Indices are given for amino acids, the offset specifies the offset of index 0\n\
                     # to the beginning of the original sequence (in nucleotides)."
                )?;
            }
        }
        Some(mode) => {
            writeln!(
                writer,
                "# Anchors exported by AnchoRNA v{} with mode {}",
                crate::VERSION,
                anchors.effective_mode(mode)
            )?;
        }
    }

    let frame = anchors.effective_mode(mode.unwrap_or(Mode::Aa));
    for (i, anchor) in anchors.iter().enumerate() {
        for (j, f) in anchor.iter().enumerate() {
            let (ftype, name) = if j == 0 {
                ("anchor", format!("A{}", i))
            } else {
                ("fluke", format!("A{}_{}", i, f.seqid))
            };
            let (start, stop) = f.interval(frame);
            write!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t.\tName={};word={};median_score={}",
                f.seqid,
                SOURCE,
                ftype,
                start + 1,
                stop,
                f.score,
                f.strand,
                name,
                f.word,
                f.median_score
            )?;
            if let (None, Some(offset)) = (mode, f.offset) {
                write!(writer, ";offset={}", offset)?;
            }
            if f.poor {
                write!(writer, ";poor=1")?;
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}

/// Write anchors to `path`, see [`write_anchors`]
pub fn write_anchors_file<P: AsRef<Path>>(anchors: &AnchorList, path: P, mode: Option<Mode>) -> AnchorFileResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_anchors(anchors, &mut writer, mode)?;
    writer.flush()?;
    Ok(())
}

/// Anchors as GFF3 text
pub fn anchors_to_string(anchors: &AnchorList, mode: Option<Mode>) -> AnchorFileResult<String> {
    let mut buf = Vec::new();
    write_anchors(anchors, &mut buf, mode)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parsed feature line
struct FeatureLine {
    ftype: String,
    name: String,
    fluke: Fluke,
}

fn parse_feature(line: &str, lineno: usize) -> AnchorFileResult<FeatureLine> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return Err(AnchorFileError::parse(
            lineno,
            format!("expected 9 columns, got {}", fields.len()),
        ));
    }
    let start = fields[3]
        .parse::<usize>()
        .map_err(|_| AnchorFileError::parse(lineno, format!("invalid start {}", fields[3])))?;
    let stop = fields[4]
        .parse::<usize>()
        .map_err(|_| AnchorFileError::parse(lineno, format!("invalid stop {}", fields[4])))?;
    if start == 0 || stop + 1 < start {
        return Err(AnchorFileError::parse(lineno, format!("invalid interval {}-{}", start, stop)));
    }
    let score = match fields[5] {
        "." => 0,
        s => s
            .parse::<i32>()
            .map_err(|_| AnchorFileError::parse(lineno, format!("invalid score {}", s)))?,
    };
    let mut strand_chars = fields[6].chars();
    let strand = match (strand_chars.next(), strand_chars.next()) {
        (Some('.'), None) => Strand::Forward,
        (Some(c), None) => Strand::try_from(c).map_err(|e| AnchorFileError::parse(lineno, e.to_string()))?,
        _ => return Err(AnchorFileError::parse(lineno, format!("invalid strand {}", fields[6]))),
    };

    let mut name = None;
    let mut word = None;
    let mut median_score = 0.0;
    let mut offset = None;
    let mut poor = false;
    for attr in fields[8].trim().split(';').filter(|a| !a.is_empty()) {
        let (key, value) = attr
            .split_once('=')
            .ok_or_else(|| AnchorFileError::parse(lineno, format!("invalid attribute {}", attr)))?;
        match key {
            "Name" => name = Some(value.to_string()),
            "word" => word = Some(value.to_string()),
            "median_score" => {
                median_score = value
                    .parse::<f64>()
                    .map_err(|_| AnchorFileError::parse(lineno, format!("invalid median_score {}", value)))?
            }
            "offset" => {
                offset = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| AnchorFileError::parse(lineno, format!("invalid offset {}", value)))?,
                )
            }
            "poor" => poor = value == "1",
            _ => debug!("Ignore attribute {} in line {}", key, lineno),
        }
    }
    let name = name.ok_or_else(|| AnchorFileError::parse(lineno, "missing Name attribute"))?;
    let word = word.ok_or_else(|| AnchorFileError::parse(lineno, "missing word attribute"))?;

    let fluke = Fluke {
        seqid: fields[0].to_string(),
        start: start - 1,
        stop,
        offset,
        strand,
        word,
        score,
        median_score,
        poor,
    };
    Ok(FeatureLine {
        ftype: fields[2].to_string(),
        name,
        fluke,
    })
}

/// Read anchors written by [`write_anchors`]
///
/// `source` only names the input in error messages.
pub fn read_anchors<R: BufRead>(reader: R, source: &str, check_header: bool) -> AnchorFileResult<AnchorList> {
    let mut no_cds = false;
    let mut anchors = Vec::new();
    // (anchor name, guide seqid, flukes)
    let mut open: Option<(String, String, Vec<Fluke>)> = None;
    let mut ncomments = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = i + 1;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') {
            if check_header {
                if ncomments == 0 && !trimmed.starts_with("##gff-version 3") {
                    return Err(AnchorFileError::NotGff(source.to_string()));
                }
                if ncomments == 1 && !trimmed.starts_with("#AnchoRNA") {
                    return Err(AnchorFileError::NotAnchorFile(source.to_string()));
                }
            }
            ncomments += 1;
            if trimmed.starts_with("#no_cds") {
                no_cds = true;
            }
            continue;
        }
        if check_header && ncomments < 2 {
            return Err(AnchorFileError::NotAnchorFile(source.to_string()));
        }

        let feature = parse_feature(trimmed, lineno)?;
        match feature.ftype.as_str() {
            "anchor" => {
                if let Some((_, gseqid, flukes)) = open.take() {
                    anchors.push(Anchor::new(flukes, gseqid)?);
                }
                open = Some((feature.name, feature.fluke.seqid.clone(), vec![feature.fluke]));
            }
            "fluke" => {
                let Some((aname, _, flukes)) = open.as_mut() else {
                    return Err(AnchorFileError::ForeignFluke {
                        name: feature.name,
                        anchor: String::from("<none>"),
                    });
                };
                let belongs = feature
                    .name
                    .strip_prefix(aname.as_str())
                    .is_some_and(|rest| rest.starts_with('_'));
                if !belongs {
                    return Err(AnchorFileError::ForeignFluke {
                        name: feature.name,
                        anchor: aname.clone(),
                    });
                }
                flukes.push(feature.fluke);
            }
            other => warn!("Cannot convert feature of type {} in line {}", other, lineno),
        }
    }
    if let Some((_, gseqid, flukes)) = open.take() {
        anchors.push(Anchor::new(flukes, gseqid)?);
    }
    Ok(AnchorList { anchors, no_cds })
}

/// Read an anchor file, see [`read_anchors`]
pub fn read_anchors_file<P: AsRef<Path>>(path: P, check_header: bool) -> AnchorFileResult<AnchorList> {
    let source = path.as_ref().display().to_string();
    let reader = BufReader::new(File::open(&path)?);
    read_anchors(reader, &source, check_header)
}

/// Load anchors with the `fname|select` or `fname|select|remove` syntax
///
/// `select` keeps the given anchors (all if empty), `remove` drops anchors
/// of the full file. The file name `-` reads from stdin.
pub fn load_selected_anchors(expr: &str, check_header: bool) -> AnchorFileResult<AnchorList> {
    let mut parts = expr.splitn(3, '|');
    let fname = parts.next().unwrap_or_default().trim();
    let select = parts.next().map(str::to_lowercase);
    let remove = parts.next().map(str::to_lowercase);

    let anchors = if fname == "-" {
        read_anchors(std::io::stdin().lock(), "stdin", check_header)?
    } else {
        read_anchors_file(fname, check_header)?
    };
    let Some(select) = select else {
        return Ok(anchors);
    };
    let Some(remove) = remove else {
        return Ok(anchors.select(&select)?);
    };

    let removed: HashSet<Anchor> = anchors.select(&remove)?.into_iter().collect();
    let mut selected = if select.trim().is_empty() {
        anchors
    } else {
        anchors.select(&select)?
    };
    selected.anchors.retain(|a| !removed.contains(a));
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn anchors() -> AnchorList {
        let make = |start: usize, poor_s3: bool| {
            let mut flukes: Vec<Fluke> = [("S1", 0, 30), ("S2", 1, 33), ("S3", 0, 36)]
                .iter()
                .map(|&(id, shift, offset)| {
                    let mut f = Fluke::new(id, start + shift, "MKLVI");
                    f.offset = Some(offset);
                    f.score = 22;
                    f.median_score = 19.5;
                    f
                })
                .collect();
            flukes[2].poor = poor_s3;
            Anchor::new(flukes, "S1").unwrap()
        };
        AnchorList::new(vec![make(10, false), make(40, true)])
    }

    fn roundtrip(list: &AnchorList) -> AnchorList {
        let text = anchors_to_string(list, None).unwrap();
        read_anchors(Cursor::new(text), "test", true).unwrap()
    }

    #[test]
    fn test_written_layout() {
        let text = anchors_to_string(&anchors(), None).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "##gff-version 3");
        assert_eq!(lines[1], "#AnchoRNA anchor file");
        assert!(text.contains("S1\tanchorna\tanchor\t11\t15\t22\t+\t.\tName=A0;word=MKLVI;median_score=19.5;offset=30\n"));
        assert!(text.contains(
            "S3\tanchorna\tfluke\t41\t45\t22\t+\t.\tName=A1_S3;word=MKLVI;median_score=19.5;offset=36;poor=1\n"
        ));
    }

    #[test]
    fn test_roundtrip_keeps_everything() {
        let list = anchors();
        let back = roundtrip(&list);
        assert!(!back.no_cds);
        assert_eq!(back.len(), 2);
        for (a, b) in list.iter().zip(back.iter()) {
            assert_eq!(a.gseqid(), b.gseqid());
            assert_eq!(a.flukes(), b.flukes());
        }

        let list = anchors().with_no_cds(true);
        assert!(roundtrip(&list).no_cds);
    }

    #[test]
    fn test_roundtrip_keeps_offsets_per_fluke() {
        let make = |start: usize, offsets: [Option<i64>; 2], strand: Strand| {
            let flukes = ["S1", "S2"]
                .iter()
                .zip(offsets)
                .map(|(id, offset)| {
                    let mut f = Fluke::new(*id, start, "MKL");
                    f.offset = offset;
                    f.strand = strand;
                    f
                })
                .collect();
            Anchor::new(flukes, "S1").unwrap()
        };
        // S2 carries three different offsets, one of them missing
        let list = AnchorList::new(vec![
            make(5, [Some(0), Some(3)], Strand::Forward),
            make(20, [Some(0), None], Strand::Forward),
            make(40, [Some(0), Some(210)], Strand::Reverse),
        ]);
        let back = roundtrip(&list);
        let offsets: Vec<Option<i64>> = back.iter().map(|a| a.fluke("S2").unwrap().offset).collect();
        assert_eq!(offsets, vec![Some(3), None, Some(210)]);
        assert_eq!(back[2].guide().strand, Strand::Reverse);
        for (a, b) in list.iter().zip(back.iter()) {
            assert_eq!(a.flukes(), b.flukes());
        }
    }

    #[test]
    fn test_invalid_strand_column() {
        let text = "##gff-version 3\n#AnchoRNA anchor file\n\
                    S1\tanchorna\tanchor\t1\t5\t22\tx\t.\tName=A0;word=MKLVI;median_score=22\n";
        let err = read_anchors(Cursor::new(text), "x", true).unwrap_err();
        assert!(matches!(err, AnchorFileError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_mode_export_is_not_an_anchor_file() {
        let text = anchors_to_string(&anchors(), Some(Mode::Seq)).unwrap();
        assert!(!text.contains("offset="));
        // S2: 3 * 11 + 33 = 66
        assert!(text.contains("S2\tanchorna\tfluke\t67\t81\t"));
        let err = read_anchors(Cursor::new(text.clone()), "export", true).unwrap_err();
        assert!(matches!(err, AnchorFileError::NotAnchorFile(_)));
        let list = read_anchors(Cursor::new(text), "export", false).unwrap();
        assert_eq!(list[0].fluke("S2").unwrap().start, 66);
    }

    #[test]
    fn test_invalid_header() {
        let err = read_anchors(Cursor::new("#AnchoRNA anchor file\n"), "x", true).unwrap_err();
        assert!(matches!(err, AnchorFileError::NotGff(_)));
    }

    #[test]
    fn test_foreign_fluke_is_rejected() {
        let text = "##gff-version 3\n#AnchoRNA anchor file\n\
                    S1\tanchorna\tanchor\t1\t5\t22\t+\t.\tName=A1;word=MKLVI;median_score=22\n\
                    S2\tanchorna\tfluke\t1\t5\t22\t+\t.\tName=A10_S2;word=MKLVI;median_score=22\n";
        let err = read_anchors(Cursor::new(text), "x", true).unwrap_err();
        assert!(matches!(err, AnchorFileError::ForeignFluke { .. }));
    }

    #[test]
    fn test_missing_attribute() {
        let text = "##gff-version 3\n#AnchoRNA anchor file\n\
                    S1\tanchorna\tanchor\t1\t5\t22\t+\t.\tName=A0\n";
        let err = read_anchors(Cursor::new(text), "x", true).unwrap_err();
        assert!(matches!(err, AnchorFileError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_load_selected_anchors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.gff");
        write_anchors_file(&anchors(), &path, None).unwrap();
        let fname = path.display().to_string();

        assert_eq!(load_selected_anchors(&fname, true).unwrap().len(), 2);
        let sel = load_selected_anchors(&format!("{}|a1", fname), true).unwrap();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel[0].guide().start, 40);
        let rem = load_selected_anchors(&format!("{}||A0", fname), true).unwrap();
        assert_eq!(rem.len(), 1);
        assert_eq!(rem[0].guide().start, 40);
        let both = load_selected_anchors(&format!("{}|0:2|1", fname), true).unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].guide().start, 10);
    }
}
