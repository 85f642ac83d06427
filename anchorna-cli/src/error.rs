//! Error handling for the AnchoRNA CLI

use std::path::PathBuf;
use thiserror::Error;

use anchorna_core::io::{AnchorFileError, SequenceFileError};
use anchorna_core::AnchorError;

/// Main error type for AnchoRNA CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Anchor error: {message}")]
    Anchor { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn parse<S: Into<String>, M: Into<String>>(file: S, message: M) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn anchor<S: Into<String>>(message: S) -> Self {
        Self::Anchor { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<AnchorError> for CliError {
    fn from(err: AnchorError) -> Self {
        match err {
            AnchorError::Configuration(message) => Self::config(message),
            other => Self::anchor(other.to_string()),
        }
    }
}

impl From<AnchorFileError> for CliError {
    fn from(err: AnchorFileError) -> Self {
        match err {
            AnchorFileError::NotGff(_) | AnchorFileError::NotAnchorFile(_) => {
                Self::invalid_format(err.to_string())
            }
            AnchorFileError::Parse { line, message } => {
                Self::parse("anchor file", format!("line {}: {}", line, message))
            }
            AnchorFileError::Io(e) => e.into(),
            AnchorFileError::Anchor(e) => e.into(),
            other => Self::anchor(other.to_string()),
        }
    }
}

impl From<SequenceFileError> for CliError {
    fn from(err: SequenceFileError) -> Self {
        match err {
            SequenceFileError::Io(e) => e.into(),
            other => Self::parse("sequence file", other.to_string()),
        }
    }
}

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Set the sequence file with fname in anchorna.conf or pass --fname",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Anchor files are written by 'anchorna go' or 'anchorna combine'\n\
                 • Files exported with a mode other than aa cannot be read back, export with --fmt gff -m aa",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your anchorna.conf configuration file\n\
                 • Use 'anchorna create' to generate an example configuration\n\
                 • thr_score_add_anchor must not be lower than score_add_word",
            );
        }

        CliError::Parse { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Sequence headers carry cds=START-STOP (1-based) or offset=N\n\
                 • Use --no-cds for sequences without coding region annotation",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("pesti.fasta"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));

        let formatted = format_error_with_suggestions(&CliError::config("bad"));
        assert!(formatted.contains("anchorna create"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: CliError = AnchorError::config("w must be positive").into();
        assert!(matches!(err, CliError::Config { .. }));
        let err: CliError = AnchorFileError::NotAnchorFile("x.gff".to_string()).into();
        assert!(matches!(err, CliError::InvalidFormat { .. }));
    }
}
