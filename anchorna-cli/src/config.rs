//! Configuration handling for the AnchoRNA CLI
//!
//! Options are read from a flat `anchorna.conf` TOML file; command line flags
//! override the values found there.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anchorna_core::AnchorOptions;

pub const DEFAULT_CONFIG_PATH: &str = "anchorna.conf";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sequence file with CDS annotation or offsets
    #[serde(default)]
    pub fname: Option<PathBuf>,

    /// Word length
    #[serde(default = "default_w")]
    pub w: usize,

    /// ID of the guiding sequence, "none" takes the first sequence
    #[serde(default)]
    pub gseqid: Option<String>,

    /// Letters to search left and right of the guiding fluke
    #[serde(default = "default_search_range")]
    pub search_range: usize,

    /// Substitution matrix name or file
    #[serde(default = "default_scoring")]
    pub scoring: String,

    #[serde(default = "default_score")]
    pub score_add_word: f64,

    #[serde(default = "default_quota")]
    pub thr_quota_add_anchor: f64,

    #[serde(default = "default_score")]
    pub thr_score_add_anchor: f64,

    /// Flukes scoring lower are left out of export and cutout
    #[serde(default)]
    pub score_use_fluke: Option<f64>,

    #[serde(default = "default_true")]
    pub aggressive_remove: bool,

    /// Removed anchors are written here, `{}` is replaced by a timestamp
    #[serde(default)]
    pub removed_anchors_path: Option<String>,

    #[serde(default)]
    pub logfile: Option<PathBuf>,

    /// Use residues directly, without translating a coding region
    #[serde(default)]
    pub no_cds: bool,

    #[serde(default)]
    pub njobs: Option<usize>,
}

// Default value functions
fn default_w() -> usize { 5 }
fn default_search_range() -> usize { 100 }
fn default_scoring() -> String { "blosum62".to_string() }
fn default_score() -> f64 { 22.0 }
fn default_quota() -> f64 { 1.0 }
fn default_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            fname: None,
            w: default_w(),
            gseqid: None,
            search_range: default_search_range(),
            scoring: default_scoring(),
            score_add_word: default_score(),
            thr_quota_add_anchor: default_quota(),
            thr_score_add_anchor: default_score(),
            score_use_fluke: None,
            aggressive_remove: true,
            removed_anchors_path: None,
            logfile: None,
            no_cds: false,
            njobs: None,
        }
    }
}

/// `None` for unset values and the literal strings none/null
fn switched_off(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "none" | "null"))
}

impl Config {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(config_path: &Path) -> Result<Self> {
        let loaded = Self::load_if_exists(config_path)?;
        Self::log_source(config_path, loaded.is_some());
        Ok(loaded.unwrap_or_default())
    }

    /// Load configuration without logging, `None` when the file is missing
    ///
    /// Used before the logger is installed; call [`Config::log_source`] afterwards.
    pub fn load_if_exists(config_path: &Path) -> Result<Option<Self>> {
        if config_path.exists() {
            Self::load_from_file(config_path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn log_source(config_path: &Path, found: bool) {
        if found {
            log::info!("Loading configuration from: {}", config_path.display());
        } else {
            log::warn!(
                "Configuration file {} not found, using default configuration",
                config_path.display()
            );
        }
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Annotated example configuration
    pub fn example_toml(no_cds: bool) -> String {
        let scoring = if no_cds {
            "scoring = \"blosum62\"       # use e.g. nuc for nucleotide sequences\n"
        } else {
            "scoring = \"blosum62\"       # substitution matrix used for scoring, or the path of a matrix file\n"
        };
        let mut example = String::from(
            "### Configuration for AnchoRNA in TOML format\n\
             \n\
             fname = \"pesti_example.fasta\" # sequence file, headers carry cds=START-STOP or offset=N\n\
             w = 5                      # word length\n\
             gseqid = \"KC533775\"        # ID of the guiding sequence, set to \"none\" to take first sequence in file\n\
             search_range = 100         # number of letters to search left and right from guiding fluke\n",
        );
        example.push_str(scoring);
        example.push_str(
            "score_add_word = 22        # score to add a word to word set, flukes with lower score are marked as \"poor\"\n\
             thr_quota_add_anchor = 1   # discard anchor if quota is not met (1=100%)\n\
             thr_score_add_anchor = 22  # score threshold for quota\n\
             score_use_fluke = 22       # score to use fluke in export and cutout\n\
             aggressive_remove = true   # turn aggressive remove mode on/off\n\
             \n\
             removed_anchors_path = \"removed_anchors_{}.gff\"  # turn off with \"none\", alternatively delete this line\n\
             logfile = \"anchorna.log\"   # turn off with \"none\", alternatively delete this line\n",
        );
        if no_cds {
            example.push_str("no_cds = true              # directly use aa or nucleotide sequences, no translation\n");
        }
        example
    }

    pub fn logfile(&self) -> Option<&Path> {
        let path = self.logfile.as_deref()?;
        switched_off(path.to_str()).map(|_| path)
    }

    /// Path for removed anchors with the `{}` placeholder filled in
    pub fn removed_anchors_path(&self, timestamp: &str) -> Option<PathBuf> {
        switched_off(self.removed_anchors_path.as_deref())
            .map(|p| PathBuf::from(p.replace("{}", timestamp)))
    }

    /// Search options for the anchor engine
    pub fn anchor_options(&self) -> AnchorOptions {
        AnchorOptions {
            w: self.w,
            gseqid: switched_off(self.gseqid.as_deref()).map(str::to_string),
            search_range: self.search_range,
            scoring: self.scoring.clone(),
            score_add_word: self.score_add_word,
            thr_quota_add_anchor: self.thr_quota_add_anchor,
            thr_score_add_anchor: self.thr_score_add_anchor,
            aggressive_remove: self.aggressive_remove,
            no_cds: self.no_cds,
            njobs: self.njobs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.w, 5);
        assert_eq!(config.scoring, "blosum62");
        assert_eq!(config.search_range, 100);
        assert!(config.aggressive_remove);
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let config = Config {
            gseqid: Some("S2".to_string()),
            njobs: Some(3),
            ..Config::default()
        };
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded_config.gseqid.as_deref(), Some("S2"));
        assert_eq!(loaded_config.njobs, Some(3));
        assert_eq!(loaded_config.thr_score_add_anchor, config.thr_score_add_anchor);

        Ok(())
    }

    #[test]
    fn test_load_if_exists() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "w = 4\nlogfile = \"go.log\"\n")?;
        let loaded = Config::load_if_exists(temp_file.path())?.expect("config file exists");
        assert_eq!(loaded.w, 4);
        assert_eq!(loaded.logfile(), Some(Path::new("go.log")));

        let missing = temp_file.path().with_extension("missing");
        assert!(Config::load_if_exists(&missing)?.is_none());
        assert_eq!(Config::load(&missing)?.w, Config::default().w);
        Ok(())
    }

    #[test]
    fn test_example_toml_parses() {
        let config: Config = toml::from_str(&Config::example_toml(false)).unwrap();
        assert_eq!(config.gseqid.as_deref(), Some("KC533775"));
        assert_eq!(config.score_use_fluke, Some(22.0));
        assert!(!config.no_cds);
        assert_eq!(config.logfile(), Some(Path::new("anchorna.log")));

        let config: Config = toml::from_str(&Config::example_toml(true)).unwrap();
        assert!(config.no_cds);
    }

    #[test]
    fn test_switched_off_values() {
        let config: Config = toml::from_str(
            "gseqid = \"none\"\nremoved_anchors_path = \"None\"\nlogfile = \"null\"\n",
        )
        .unwrap();
        assert!(config.anchor_options().gseqid.is_none());
        assert!(config.removed_anchors_path("t").is_none());
        assert!(config.logfile().is_none());

        let config: Config = toml::from_str("removed_anchors_path = \"removed_{}.gff\"").unwrap();
        assert_eq!(
            config.removed_anchors_path("2024_01_01"),
            Some(PathBuf::from("removed_2024_01_01.gff"))
        );
    }
}
