//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.manifiesto.toml` files. The resulting [`Config`] is built once in
//! `main` and handed down by reference.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".manifiesto.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Hosted record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Document storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Image asset settings.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Institutional text and logos printed on documents.
    #[serde(default)]
    pub institution: InstitutionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Snapshot file used when not talking to the hosted store.
    #[serde(default = "default_snapshot")]
    pub snapshot: String,

    /// Directory generated documents are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            snapshot: default_snapshot(),
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_snapshot() -> String {
    "snapshot.json".to_string()
}

fn default_output_dir() -> String {
    "documents".to_string()
}

/// Hosted record store (PostgREST-style API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted project.
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_manifests_table")]
    pub manifests_table: String,

    #[serde(default = "default_tickets_table")]
    pub tickets_table: String,

    #[serde(default = "default_vessels_table")]
    pub vessels_table: String,

    /// Select expression producing the manifest join shape.
    #[serde(default = "default_manifests_select")]
    pub manifests_select: String,

    /// Select expression producing the ticket join shape.
    #[serde(default = "default_tickets_select")]
    pub tickets_select: String,

    /// Request timeout in seconds (0 disables the timeout).
    #[serde(default = "default_store_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            manifests_table: default_manifests_table(),
            tickets_table: default_tickets_table(),
            vessels_table: default_vessels_table(),
            manifests_select: default_manifests_select(),
            tickets_select: default_tickets_select(),
            timeout_seconds: default_store_timeout(),
        }
    }
}

fn default_manifests_table() -> String {
    "manifests".to_string()
}

fn default_tickets_table() -> String {
    "landfill_tickets".to_string()
}

fn default_vessels_table() -> String {
    "vessels".to_string()
}

fn default_manifests_select() -> String {
    "*,vessel:vessels(*),principal:people!principal_id(*),\
     secondary:people!secondary_id(*),residues:manifest_residues(*)"
        .to_string()
}

fn default_tickets_select() -> String {
    "*,vessel:vessels(*),responsible:people!responsible_id(*)".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

/// Where generated documents are uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name on the hosted backend.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Key prefix for waste manifest documents.
    #[serde(default = "default_manifest_prefix")]
    pub manifest_prefix: String,

    /// Key prefix for landfill ticket documents.
    #[serde(default = "default_ticket_prefix")]
    pub ticket_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            manifest_prefix: default_manifest_prefix(),
            ticket_prefix: default_ticket_prefix(),
        }
    }
}

fn default_bucket() -> String {
    "documents".to_string()
}

fn default_manifest_prefix() -> String {
    "manifests".to_string()
}

fn default_ticket_prefix() -> String {
    "basuron".to_string()
}

/// Image loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Timeout for remote image fetches in seconds (0 waits forever).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,

    /// Height logos are scaled to, in points.
    #[serde(default = "default_logo_height")]
    pub logo_height: f32,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_seconds: default_fetch_timeout(),
            logo_height: default_logo_height(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_logo_height() -> f32 {
    40.0
}

/// Institutional identity printed on every document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionConfig {
    /// Header lines, first one printed bold.
    #[serde(default = "default_header_lines")]
    pub header_lines: Vec<String>,

    /// Left logo (URL or file path).
    #[serde(default)]
    pub left_logo: Option<String>,

    /// Right logo (URL or file path).
    #[serde(default)]
    pub right_logo: Option<String>,

    /// Official who receives residues and signs manifests.
    #[serde(default = "default_recipient_name")]
    pub recipient_name: String,

    #[serde(default = "default_recipient_role")]
    pub recipient_role: String,

    /// Legal and contact lines at the bottom of landfill tickets.
    #[serde(default = "default_footer_lines")]
    pub footer_lines: Vec<String>,
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            header_lines: default_header_lines(),
            left_logo: None,
            right_logo: None,
            recipient_name: default_recipient_name(),
            recipient_role: default_recipient_role(),
            footer_lines: default_footer_lines(),
        }
    }
}

fn default_header_lines() -> Vec<String> {
    vec![
        "Port Waste Reception Facility".to_string(),
        "Environmental Management Office".to_string(),
    ]
}

fn default_recipient_name() -> String {
    "Reception Officer".to_string()
}

fn default_recipient_role() -> String {
    "Recipient official".to_string()
}

fn default_footer_lines() -> Vec<String> {
    vec![
        "This ticket certifies the weight of waste delivered to the municipal landfill."
            .to_string(),
        "Questions about this document: environmental office, port administration building."
            .to_string(),
    ]
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Title printed at the top of dashboard reports.
    #[serde(default = "default_report_title")]
    pub title: String,

    /// Include the landfill ticket section in dashboards.
    #[serde(default = "default_true")]
    pub include_landfill: bool,

    /// Decimal places for quantities.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            include_landfill: true,
            precision: default_precision(),
        }
    }
}

fn default_report_title() -> String {
    "Waste Reception Dashboard".to_string()
}

fn default_true() -> bool {
    true
}

fn default_precision() -> usize {
    2
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref snapshot) = args.snapshot {
            self.general.snapshot = snapshot.display().to_string();
        }

        if let Some(ref url) = args.store_url {
            self.store.url = url.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.snapshot, "snapshot.json");
        assert_eq!(config.store.tickets_table, "landfill_tickets");
        assert_eq!(config.assets.fetch_timeout_seconds, 30);
        assert!(config.report.include_landfill);
        assert!(config.institution.left_logo.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output_dir = "out"
verbose = true

[store]
url = "https://example.supabase.co"
timeout_seconds = 5

[institution]
header_lines = ["Harbor Authority"]
left_logo = "assets/left.png"

[report]
precision = 1
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output_dir, "out");
        assert!(config.general.verbose);
        assert_eq!(config.store.url, "https://example.supabase.co");
        assert_eq!(config.store.timeout_seconds, 5);
        assert_eq!(config.store.manifests_table, "manifests");
        assert_eq!(config.institution.header_lines, vec!["Harbor Authority"]);
        assert_eq!(config.institution.left_logo.as_deref(), Some("assets/left.png"));
        assert_eq!(config.institution.recipient_role, "Recipient official");
        assert_eq!(config.report.precision, 1);
    }

    #[test]
    fn test_merge_with_args() {
        use clap::Parser;

        let args = crate::cli::Args::try_parse_from([
            "manifiesto",
            "--snapshot",
            "export.json",
            "--store-url",
            "https://example.supabase.co",
            "--verbose",
            "vessels",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.general.snapshot, "export.json");
        assert_eq!(config.store.url, "https://example.supabase.co");
        assert!(config.general.verbose);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[institution]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.storage.ticket_prefix, "basuron");
    }
}
