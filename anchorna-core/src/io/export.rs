//! Export of anchors for alignment viewers and aligners

use std::fmt::Write as _;

use crate::anchor::{AnchorList, Fluke};
use crate::types::Mode;

/// Tableau palette, cycled over the anchors
const PALETTE: [(u8, u8, u8); 10] = [
    (0x1f, 0x77, 0xb4),
    (0xff, 0x7f, 0x0e),
    (0x2c, 0xa0, 0x2c),
    (0xd6, 0x27, 0x28),
    (0x94, 0x67, 0xbd),
    (0x8c, 0x56, 0x4b),
    (0xe3, 0x77, 0xc2),
    (0x7f, 0x7f, 0x7f),
    (0xbc, 0xbd, 0x22),
    (0x17, 0xbe, 0xcf),
];

fn below_gate(f: &Fluke, score_use_fluke: Option<f64>) -> bool {
    score_use_fluke.is_some_and(|gate| (f.score as f64) < gate)
}

/// Palette colour blended towards white, `alpha = 1` keeps the colour
fn blend_with_white(rgb: (u8, u8, u8), alpha: f64) -> String {
    let alpha = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 1.0 };
    let mix = |c: u8| (alpha * c as f64 + (1.0 - alpha) * 255.0).round() as u8;
    format!("{:02x}{:02x}{:02x}", mix(rgb.0), mix(rgb.1), mix(rgb.2))
}

/// Jalview sequence feature file
///
/// Every fluke gets a feature labelled `anchor{k}_s{median_score}` whose
/// colour fades with the fluke's median score relative to the best fluke of
/// the anchor.
pub fn export_jalview(anchors: &AnchorList, mode: Mode, score_use_fluke: Option<f64>) -> String {
    let mode = anchors.effective_mode(mode);
    let mut sorted: Vec<_> = anchors.iter().collect();
    sorted.sort_by_key(|a| a.guide().start);

    let mut header = String::new();
    let mut content = String::new();
    for (k, a) in sorted.into_iter().enumerate() {
        let poor = a.poor_flukes().count();
        let w = a.word_len();
        let maxscore = a.maxscore();
        for f in a.iter().filter(|f| !below_gate(f, score_use_fluke)) {
            let color = blend_with_white(PALETTE[k % PALETTE.len()], f.median_score.max(1.0) / maxscore);
            let label = format!("anchor{}_s{}", k, f.median_score);
            let _ = writeln!(header, "{}\t{}", label, color);
            let (i, j) = f.interval(mode);
            let word: String = f.word.chars().take(5).collect();
            let _ = writeln!(
                content,
                "{} w{} poor:{}\t{}\t-1\t{}\t{}\t{}",
                word,
                w,
                poor,
                f.seqid,
                i + 1,
                j,
                label
            );
        }
    }
    header.push_str("\nSTARTFILTERS\nENDFILTERS\n\n");
    header + &content
}

/// Dialign anchor file
///
/// For each anchor the best scoring fluke is the pivot; one line
/// `i j start_i start_j len score` (1-based) per other fluke. Sequences are
/// numbered by their position in `seqids`, flukes of other sequences are
/// left out.
pub fn export_dialign(anchors: &AnchorList, seqids: &[&str], mode: Mode, score_use_fluke: Option<f64>) -> String {
    let mode = anchors.effective_mode(mode);
    let index_of = |f: &Fluke| seqids.iter().position(|id| *id == f.seqid);
    let mut content = String::new();
    for a in anchors {
        let Some(pivot) = a.iter().filter(|f| index_of(*f).is_some()).max_by_key(|f| f.score) else {
            continue;
        };
        let Some(i) = index_of(pivot) else {
            continue;
        };
        let (start0, _) = pivot.start_and_len(mode);
        let mut others: Vec<(usize, &Fluke)> = a
            .iter()
            .filter(|f| f.seqid != pivot.seqid && !below_gate(f, score_use_fluke))
            .filter_map(|f| index_of(f).map(|j| (j, f)))
            .collect();
        others.sort_by_key(|(j, _)| *j);
        for (j, f) in others {
            let (start, len) = f.start_and_len(mode);
            let _ = writeln!(content, "{} {} {} {} {} {}", i + 1, j + 1, start0 + 1, start + 1, len, f.score);
        }
    }
    content
}
