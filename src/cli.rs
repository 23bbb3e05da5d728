//! CLI argument parsing for libsift

use crate::config::{MergeMethod, SiftConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for cluster reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "libsift")]
#[command(version)]
#[command(about = "Identify library clusters and their exemplar artifacts in a code-archive corpus", long_about = None)]
pub struct Cli {
    /// Corpus JSON file (artifacts and the names they contain)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// TOML configuration file; flags below override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stage-1 compatibility threshold in (0, 1]
    #[arg(long = "compatibility-threshold", value_name = "T")]
    pub compatibility_threshold: Option<f64>,

    /// Stage-2 merge strategy
    #[arg(long = "merge-method", value_enum)]
    pub merge_method: Option<MergeMethod>,

    /// Stage-2 merge threshold in [0, 1]
    #[arg(long = "merge-threshold", value_name = "T")]
    pub merge_threshold: Option<f64>,

    /// Share of a cluster's artifacts an extra name needs to be an exemplar name
    #[arg(long = "exemplar-threshold", value_name = "T")]
    pub exemplar_threshold: Option<f64>,

    /// Sweep the merge threshold from 100% down instead of using --merge-threshold
    #[arg(long = "sweep")]
    pub sweep: bool,

    /// Lowest sweep threshold in percent (exclusive)
    #[arg(long = "minimum-threshold", value_name = "PERCENT")]
    pub minimum_threshold: Option<u32>,

    /// Sweep step in percent
    #[arg(long = "threshold-decrement", value_name = "PERCENT")]
    pub threshold_decrement: Option<u32>,

    /// Write every merge and exemplar decision to FILE as JSON lines
    #[arg(long = "decision-log", value_name = "FILE")]
    pub decision_log: Option<PathBuf>,

    /// Show collection statistics only
    #[arg(short = 'c', long = "summary")]
    pub summary: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut SiftConfig) {
        if let Some(value) = self.compatibility_threshold {
            config.compatibility_threshold = value;
        }
        if let Some(method) = self.merge_method {
            config.merge_method = method;
        }
        if let Some(value) = self.merge_threshold {
            config.merge_threshold = value;
        }
        if let Some(value) = self.exemplar_threshold {
            config.exemplar_threshold = value;
        }
        if let Some(value) = self.minimum_threshold {
            config.minimum_threshold = value;
        }
        if let Some(value) = self.threshold_decrement {
            config.threshold_decrement = value;
        }
    }
}
