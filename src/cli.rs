//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::document::SignatureRole;
use crate::models::DigitizationStatus;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Manifiesto - waste manifest dashboards, reports and PDF documents
///
/// Aggregates waste reception manifests and landfill tickets from a JSON
/// snapshot or the hosted record store, and composes the printable
/// manifest and weigh-ticket documents.
///
/// Examples:
///   manifiesto dashboard
///   manifiesto report --from 2024-01-01 --to 2024-03-31 --format json
///   manifiesto manifest-pdf --id 12 --signature operator=./firma.png
///   manifiesto --remote complete-ticket --id 31 --exit-weight 420.75
///   manifiesto init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .manifiesto.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON snapshot of the record store to read from
    #[arg(long, global = true, value_name = "FILE", env = "MANIFIESTO_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Use the hosted record store and object storage
    ///
    /// The API key is read from MANIFIESTO_API_KEY.
    #[arg(long, global = true)]
    pub remote: bool,

    /// Base URL of the hosted record store
    #[arg(long, global = true, value_name = "URL", env = "MANIFIESTO_STORE_URL")]
    pub store_url: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a default .manifiesto.toml configuration file
    InitConfig,

    /// Monthly totals, top vessels, category and status distributions
    Dashboard {
        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Detailed residue report, one row per residue delivered
    Report {
        /// First issue date to include (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        from: Option<NaiveDate>,

        /// Last issue date to include (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        to: Option<NaiveDate>,

        /// Only manifests of this vessel id
        #[arg(long, value_name = "ID")]
        vessel: Option<String>,

        /// Only manifests with this digitization status
        #[arg(long, value_name = "STATUS")]
        status: Option<DigitizationStatus>,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Compose the PDF of one manifest
    ManifestPdf {
        #[arg(long)]
        id: String,

        /// Signature image for a party: recipient|operator|witness=URL, path or data URL
        ///
        /// May be given once per party.
        #[arg(long = "signature", value_name = "ROLE=SOURCE")]
        signatures: Vec<SignatureArg>,

        /// Directory to write the PDF to (default: general.output_dir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Upload to object storage and link it to the manifest
        #[arg(long)]
        upload: bool,

        /// Date used in the file name (default: today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },

    /// Compose the PDF of one landfill ticket
    TicketPdf {
        #[arg(long)]
        id: String,

        /// Responsible party's signature (URL, path or data URL)
        #[arg(long, value_name = "SOURCE")]
        signature: Option<String>,

        /// Directory to write the PDF to (default: general.output_dir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Upload to object storage and link it to the ticket
        #[arg(long)]
        upload: bool,

        /// Date used in the file name (default: today)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },

    /// Compose the PDF of every manifest
    BatchPdf {
        /// Only manifests with this digitization status
        #[arg(long, value_name = "STATUS")]
        status: Option<DigitizationStatus>,

        /// Directory to write the PDFs to (default: general.output_dir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Record the exit weighing of a ticket and publish its document
    CompleteTicket {
        #[arg(long)]
        id: String,

        /// Exit weight in kg
        #[arg(long, value_name = "KG")]
        exit_weight: f64,

        #[arg(long, value_name = "TEXT")]
        observations: Option<String>,

        /// Responsible party's signature (URL, path or data URL)
        #[arg(long, value_name = "SOURCE")]
        signature: Option<String>,
    },

    /// List vessels whose registration is incomplete
    Vessels,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// A `ROLE=SOURCE` pair given with `--signature`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureArg {
    pub role: SignatureRole,
    pub source: String,
}

impl FromStr for SignatureArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, source) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ROLE=SOURCE, got '{}'", s))?;

        let role = match role.trim().to_lowercase().as_str() {
            "recipient" => SignatureRole::Recipient,
            "operator" => SignatureRole::Operator,
            "witness" => SignatureRole::Witness,
            other => {
                return Err(format!(
                    "unknown signature role '{}' (expected recipient, operator or witness)",
                    other
                ))
            }
        };

        let source = source.trim();
        if source.is_empty() {
            return Err("signature source is empty".to_string());
        }

        Ok(Self {
            role,
            source: source.to_string(),
        })
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.store_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Store URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            Command::Report {
                from: Some(from),
                to: Some(to),
                ..
            } if from > to => Err(format!("--from {} is after --to {}", from, to)),
            Command::CompleteTicket { exit_weight, .. }
                if !exit_weight.is_finite() || *exit_weight < 0.0 =>
            {
                Err("Exit weight must be a non-negative number".to_string())
            }
            Command::ManifestPdf { signatures, .. } => {
                for (i, sig) in signatures.iter().enumerate() {
                    if signatures[..i].iter().any(|s| s.role == sig.role) {
                        return Err(format!("Signature for {:?} given more than once", sig.role));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
