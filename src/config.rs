//! Run configuration
//!
//! Every threshold the stages consume, with the defaults the clustering was
//! tuned on. Loaded from TOML, overridden from the command line, and validated
//! once before any traversal starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors, all raised before the pipeline runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown merge method '{0}' (expected one of: related-subpackage, jaccard-package, max-path-similarity, avg-path-similarity, entropy)")]
    UnknownMergeMethod(String),

    #[error("{name} must be in {range}, got {value}")]
    ThresholdOutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("Invalid threshold sweep: {0}")]
    InvalidSweep(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Stage-2 merge strategy names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMethod {
    /// Candidate packages nested under the core cluster's packages
    RelatedSubpackage,
    /// Jaccard similarity of package sets
    JaccardPackage,
    /// Best common package-prefix ratio per name
    MaxPathSimilarity,
    /// Mean common package-prefix ratio per name
    AvgPathSimilarity,
    /// Package-tree entropy deltas
    Entropy,
}

impl MergeMethod {
    pub const ALL: [MergeMethod; 5] = [
        MergeMethod::RelatedSubpackage,
        MergeMethod::JaccardPackage,
        MergeMethod::MaxPathSimilarity,
        MergeMethod::AvgPathSimilarity,
        MergeMethod::Entropy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MergeMethod::RelatedSubpackage => "related-subpackage",
            MergeMethod::JaccardPackage => "jaccard-package",
            MergeMethod::MaxPathSimilarity => "max-path-similarity",
            MergeMethod::AvgPathSimilarity => "avg-path-similarity",
            MergeMethod::Entropy => "entropy",
        }
    }

    /// Whether the method is driven by a merge threshold (and can be swept)
    pub fn uses_threshold(self) -> bool {
        !matches!(self, MergeMethod::Entropy)
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MergeMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownMergeMethod(s.to_string()))
    }
}

/// Acceptance limits of the entropy strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyLimits {
    /// Largest allowed `joint - min(smaller, larger)`
    pub max_delta: f64,

    /// `joint - max(smaller, larger)` must stay strictly below this
    pub min_delta: f64,
}

impl Default for EntropyLimits {
    fn default() -> Self {
        Self {
            max_delta: 0.2,
            min_delta: 0.1,
        }
    }
}

/// Configuration for one clustering run
///
/// # Example
/// ```
/// use libsift::config::{MergeMethod, SiftConfig};
///
/// let config = SiftConfig::default();
/// assert_eq!(config.merge_method, MergeMethod::RelatedSubpackage);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Stage-1 compatibility threshold in (0, 1]
    ///
    /// At 1.0 only names carried by exactly the same artifacts are grouped.
    pub compatibility_threshold: f64,

    /// Stage-2 strategy
    pub merge_method: MergeMethod,

    /// Stage-2 threshold in [0, 1]; its meaning depends on the strategy
    pub merge_threshold: f64,

    /// Lowest sweep threshold, in percent, exclusive
    pub minimum_threshold: u32,

    /// Sweep step, in percent
    pub threshold_decrement: u32,

    /// Share of a cluster's artifacts an extra name must reach to count as exemplar
    pub exemplar_threshold: f64,

    pub entropy: EntropyLimits,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            compatibility_threshold: 1.0,
            merge_method: MergeMethod::RelatedSubpackage,
            merge_threshold: 1.0,
            minimum_threshold: 75,
            threshold_decrement: 5,
            exemplar_threshold: 0.5,
            entropy: EntropyLimits::default(),
        }
    }
}

impl SiftConfig {
    /// Exact co-occurrence only, every package must be related, most extra names are exemplars
    pub fn strict() -> Self {
        Self {
            exemplar_threshold: 0.75,
            ..Self::default()
        }
    }

    /// Looser grouping for noisy corpora
    pub fn permissive() -> Self {
        Self {
            compatibility_threshold: 0.8,
            merge_threshold: 0.75,
            exemplar_threshold: 0.25,
            ..Self::default()
        }
    }

    /// Load from a TOML file; missing keys take their defaults
    ///
    /// # Example TOML
    /// ```toml
    /// compatibility_threshold = 0.9
    /// merge_method = "jaccard-package"
    /// merge_threshold = 0.5
    ///
    /// [entropy]
    /// max_delta = 0.25
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge threshold as a fraction, for sweep steps given in percent
    pub fn with_merge_percent(&self, percent: u32) -> Self {
        Self {
            merge_threshold: f64::from(percent) / 100.0,
            ..self.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.compatibility_threshold > 0.0 && self.compatibility_threshold <= 1.0) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "compatibility_threshold",
                value: self.compatibility_threshold,
                range: "(0, 1]",
            });
        }

        check_unit("merge_threshold", self.merge_threshold)?;
        check_unit("exemplar_threshold", self.exemplar_threshold)?;

        if self.minimum_threshold >= 100 {
            return Err(ConfigError::InvalidSweep(format!(
                "minimum_threshold must be below 100, got {}",
                self.minimum_threshold
            )));
        }
        if self.threshold_decrement == 0 {
            return Err(ConfigError::InvalidSweep(
                "threshold_decrement must be positive".to_string(),
            ));
        }

        check_delta("entropy.max_delta", self.entropy.max_delta)?;
        check_delta("entropy.min_delta", self.entropy.min_delta)?;

        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange {
            name,
            value,
            range: "[0, 1]",
        })
    }
}

fn check_delta(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange {
            name,
            value,
            range: "[0, inf)",
        })
    }
}
