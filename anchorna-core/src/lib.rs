//! AnchoRNA Core Library
//!
//! Anchor search in related sequences: best-word search, anchor assembly,
//! parallel scan, merging of overlapping anchors, removal of contradicting
//! anchors, cutout between anchors, and the anchor file formats.

pub mod error;
pub mod types;
pub mod scoring;
pub mod search;
pub mod anchor;
pub mod assemble;
pub mod scan;
pub mod merge;
pub mod conflict;
pub mod cutout;
pub mod combine;
pub mod translate;
pub mod io;

// Re-export commonly used types and functions
pub use error::{AnchorError, AnchorResult};
pub use types::{Cds, Mode, Offset, Sequence, Strand};
pub use scoring::{corrscore, SubstitutionMatrix, GAP};
pub use search::{find_best_match, find_best_match_set};
pub use anchor::{Anchor, AnchorList, Fluke};
pub use assemble::{anchor_at_pos, AnchorOptions};
pub use scan::{find_anchors, find_anchors_winlen, Progress};
pub use merge::merge_overlapping_anchors;
pub use conflict::remove_contradicting_anchors;
pub use cutout::{cutout, PositionSpec};
pub use combine::combine;
pub use translate::prepare_sequences;

/// Version information for the AnchoRNA core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
