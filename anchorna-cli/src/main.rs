use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

mod commands;
mod config;
mod error;

use anchorna_core::Mode;
use config::{Config, DEFAULT_CONFIG_PATH};
use error::CliError;

#[derive(Parser)]
#[command(name = "anchorna")]
#[command(about = "AnchoRNA - find anchors in short sequences of related RNA or DNA")]
#[command(version)]
#[command(long_about = "
AnchoRNA finds conserved words (anchors) shared by a family of related
sequences. Coding sequences are translated and searched on the amino acid level.

Examples:
  anchorna create
  anchorna go anchors.gff
  anchorna print anchors.gff -m cds
  anchorna export anchors.gff --fmt jalview -o anchors.jalview
  anchorna cutout anchors.gff a3 a5 -o region.fasta
  anchorna combine anchors_part1.gff anchors_part2.gff -o anchors.gff
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug output, repeat for trace output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an example configuration file
    Create {
        /// Configuration file to write
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        conf: PathBuf,

        /// Configuration for sequences without coding region
        #[arg(long)]
        no_cds: bool,
    },

    /// Find anchors and write them to a GFF or JSON file
    Go(GoArgs),

    /// Print anchors
    Print {
        /// Anchor file, supports the fname|select|remove syntax
        fname_anchor: String,

        /// Print every fluke
        #[arg(short, long)]
        verbose: bool,

        /// Coordinate mode
        #[arg(short, long, default_value = "aa")]
        mode: ModeArg,
    },

    /// Export anchors for other programs
    Export {
        /// Anchor file, supports the fname|select|remove syntax
        fname_anchor: String,

        /// Output file, defaults to stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Coordinate mode
        #[arg(short, long, default_value = "aa")]
        mode: ModeArg,

        /// Output format
        #[arg(long, default_value = "gff")]
        fmt: ExportFormat,

        /// Leave out flukes scoring lower
        #[arg(long)]
        score_use_fluke: Option<f64>,

        /// Sequence file, determines the sequence order for dialign
        #[arg(long)]
        fname: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        conf: PathBuf,
    },

    /// Combine anchors of several anchor files
    Combine {
        /// Anchor files, supports the fname|select|remove syntax
        #[arg(required = true)]
        fname_anchors: Vec<String>,

        /// Output file, defaults to stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Convert coordinates to nucleotides, the result is a no_cds anchor file
        #[arg(long)]
        convert_nt: bool,
    },

    /// Cut out sequence regions between two positions
    Cutout {
        /// Anchor file, supports the fname|select|remove syntax
        fname_anchor: String,

        /// Left position, e.g. a3, a3>, a3^+5, start, atg
        #[arg(allow_hyphen_values = true)]
        pos1: String,

        /// Right position, e.g. a5, a5<-2, end, *
        #[arg(allow_hyphen_values = true)]
        pos2: String,

        /// Output FASTA file, defaults to stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Coordinate mode of the cut
        #[arg(short, long, default_value = "seq")]
        mode: ModeArg,

        /// Sequence file, overrides fname of the configuration
        #[arg(long)]
        fname: Option<PathBuf>,

        /// Skip sequences whose flukes score lower
        #[arg(long)]
        score_use_fluke: Option<f64>,

        /// Sequences have no coding region
        #[arg(long)]
        no_cds: bool,

        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        conf: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct GoArgs {
    /// Anchor file to write (.gff or .json)
    pub fname_anchor: PathBuf,

    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub conf: PathBuf,

    /// Number of threads, defaults to all cores
    #[arg(long)]
    pub njobs: Option<usize>,

    /// Do not show a progress bar
    #[arg(long)]
    pub no_pbar: bool,

    /// Do not remove contradicting anchors
    #[arg(long)]
    pub no_remove: bool,

    /// Only remove contradicting anchors of this anchor file
    #[arg(long)]
    pub continue_with: Option<String>,

    /// Sequence file
    #[arg(long)]
    pub fname: Option<PathBuf>,

    /// Word length
    #[arg(long)]
    pub w: Option<usize>,

    #[arg(long)]
    pub gseqid: Option<String>,

    #[arg(long)]
    pub search_range: Option<usize>,

    /// Substitution matrix name or file
    #[arg(long)]
    pub scoring: Option<String>,

    #[arg(long)]
    pub score_add_word: Option<f64>,

    #[arg(long)]
    pub thr_quota_add_anchor: Option<f64>,

    #[arg(long)]
    pub thr_score_add_anchor: Option<f64>,

    #[arg(long, overrides_with = "no_aggressive_remove")]
    pub aggressive_remove: bool,

    #[arg(long)]
    pub no_aggressive_remove: bool,

    #[arg(long)]
    pub removed_anchors_path: Option<String>,

    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Sequences have no coding region
    #[arg(long)]
    pub no_cds: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    #[value(alias = "nt")]
    Seq,
    Cds,
    Aa,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Seq => Mode::Seq,
            ModeArg::Cds => Mode::Cds,
            ModeArg::Aa => Mode::Aa,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Gff,
    Jalview,
    Dialign,
}

/// Writes log records to stderr and a log file
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

fn setup_logging(debug: u8, quiet: bool, logfile: Option<&Path>) -> Result<()> {
    let level = if quiet {
        "error"
    } else {
        match debug {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();
    if let Some(path) = logfile {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
    }
    // a logger installed earlier (tests) is not an error
    let _ = builder.try_init();

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Create { conf, no_cds } => {
            setup_logging(cli.debug, cli.quiet, None)?;
            commands::create::execute(&conf, no_cds)?;
        }

        Commands::Go(args) => {
            // the logfile may come from the configuration, so log its source afterwards
            let loaded = Config::load_if_exists(&args.conf)?;
            let logfile = args
                .logfile
                .clone()
                .or_else(|| loaded.as_ref().and_then(|c| c.logfile()).map(Path::to_path_buf));
            setup_logging(cli.debug, cli.quiet, logfile.as_deref())?;
            Config::log_source(&args.conf, loaded.is_some());
            commands::go::execute(loaded.unwrap_or_default(), args)?;
        }

        Commands::Print { fname_anchor, verbose, mode } => {
            setup_logging(cli.debug, cli.quiet, None)?;
            commands::print::execute(&fname_anchor, verbose, mode.into())?;
        }

        Commands::Export {
            fname_anchor,
            out,
            mode,
            fmt,
            score_use_fluke,
            fname,
            conf,
        } => {
            setup_logging(cli.debug, cli.quiet, None)?;
            let config = Config::load(&conf)?;
            commands::export::execute(
                &config,
                &fname_anchor,
                out.as_deref(),
                mode.into(),
                fmt,
                score_use_fluke,
                fname,
            )?;
        }

        Commands::Combine { fname_anchors, out, convert_nt } => {
            setup_logging(cli.debug, cli.quiet, None)?;
            commands::combine::execute(&fname_anchors, out.as_deref(), convert_nt)?;
        }

        Commands::Cutout {
            fname_anchor,
            pos1,
            pos2,
            out,
            mode,
            fname,
            score_use_fluke,
            no_cds,
            conf,
        } => {
            setup_logging(cli.debug, cli.quiet, None)?;
            let config = Config::load(&conf)?;
            commands::cutout::execute(
                &config,
                &fname_anchor,
                &pos1,
                &pos2,
                out.as_deref(),
                mode.into(),
                fname,
                score_use_fluke,
                no_cds,
            )?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => error::print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
