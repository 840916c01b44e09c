//! # Configuration Module
//!
//! Loads run settings from `FLOW_*` environment variables. `main` reads an
//! optional `.env` file into the environment first; command-line flags
//! override these values there.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use flow_pregel::pregel::{CandidateOrder, PregelConfig, DEFAULT_CONVERGENCE_WINDOW, MAX_PATHS};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings shared by every `run` invocation.
///
/// # Rust Concept: Derive Macros
/// `Debug` lets us log the whole struct with `{:?}`; `Clone` lets `main`
/// take a copy and apply command-line overrides to it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory for the staged environment's record files
    pub work_dir: PathBuf,

    /// Unchanged rounds required before the run stops
    pub convergence_window: usize,

    /// Source/sink paths kept per vertex per round
    pub max_paths: usize,

    /// Hard bound on rounds
    pub max_supersteps: usize,

    /// Concurrent vertex computations
    pub parallelism: usize,

    /// Evaluate candidates in path-signature order
    pub deterministic: bool,

    /// Where to write checkpoints; `None` disables checkpointing
    pub checkpoint_dir: Option<PathBuf>,

    /// Checkpoint every N rounds
    pub checkpoint_interval: usize,

    /// Newest checkpoints kept on disk; 0 keeps all
    pub keep_checkpoints: usize,

    /// Compress checkpoint files with zstd
    pub compress_checkpoints: bool,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        let pregel = PregelConfig::default();
        Self {
            work_dir: PathBuf::from("work"),
            convergence_window: DEFAULT_CONVERGENCE_WINDOW,
            max_paths: MAX_PATHS,
            max_supersteps: pregel.max_supersteps,
            parallelism: pregel.parallelism,
            deterministic: false,
            checkpoint_dir: None,
            checkpoint_interval: pregel.checkpoint_interval,
            keep_checkpoints: pregel.keep_checkpoints,
            compress_checkpoints: false,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
/// Parse an optional environment variable, naming it in the error.
///
/// # Rust Concept: Generic Bounds
/// `T: FromStr` accepts any type with a `parse()` implementation; the extra
/// bound on `T::Err` lets `.context()` wrap the parse error.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has an invalid value: {val:?}")),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from `FLOW_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(val) = env::var("FLOW_WORK_DIR") {
            config.work_dir = PathBuf::from(val);
        }
        if let Some(val) = parse_var("FLOW_CONVERGENCE_WINDOW")? {
            config.convergence_window = val;
        }
        if let Some(val) = parse_var("FLOW_MAX_PATHS")? {
            config.max_paths = val;
        }
        if let Some(val) = parse_var("FLOW_MAX_SUPERSTEPS")? {
            config.max_supersteps = val;
        }
        if let Some(val) = parse_var("FLOW_PARALLELISM")? {
            config.parallelism = val;
        }
        if let Some(val) = parse_var("FLOW_DETERMINISTIC")? {
            config.deterministic = val;
        }
        if let Ok(val) = env::var("FLOW_CHECKPOINT_DIR") {
            config.checkpoint_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = parse_var("FLOW_CHECKPOINT_INTERVAL")? {
            config.checkpoint_interval = val;
        }
        if let Some(val) = parse_var("FLOW_KEEP_CHECKPOINTS")? {
            config.keep_checkpoints = val;
        }
        if let Some(val) = parse_var("FLOW_COMPRESS_CHECKPOINTS")? {
            config.compress_checkpoints = val;
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Fail fast with a clear message instead of a confusing runtime error.
    pub fn validate(&self) -> Result<()> {
        if self.convergence_window == 0 {
            anyhow::bail!("Convergence window must be at least 1");
        }
        if self.max_paths == 0 {
            anyhow::bail!("Max paths must be at least 1");
        }
        if self.max_supersteps == 0 {
            anyhow::bail!("Max supersteps must be at least 1");
        }
        if self.parallelism == 0 {
            anyhow::bail!("Parallelism must be at least 1");
        }
        if self.checkpoint_dir.is_some() && self.checkpoint_interval == 0 {
            anyhow::bail!("Checkpoint interval must be at least 1 when a checkpoint dir is set");
        }
        Ok(())
    }

    /// Runtime configuration for the superstep engine
    pub fn to_pregel_config(&self) -> PregelConfig {
        let checkpoint_interval = if self.checkpoint_dir.is_some() {
            self.checkpoint_interval
        } else {
            0
        };
        let order = if self.deterministic {
            CandidateOrder::Signature
        } else {
            CandidateOrder::Arrival
        };

        PregelConfig::default()
            .with_convergence_window(self.convergence_window)
            .with_max_paths(self.max_paths)
            .with_max_supersteps(self.max_supersteps)
            .with_parallelism(self.parallelism)
            .with_checkpoint_interval(checkpoint_interval)
            .with_keep_checkpoints(self.keep_checkpoints)
            .with_candidate_order(order)
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.work_dir, PathBuf::from("work"));
        assert_eq!(config.convergence_window, 5);
        assert_eq!(config.max_paths, 10);
        assert!(config.checkpoint_dir.is_none());
        assert!(!config.deterministic);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_window() {
        let mut config = Config::default();
        config.convergence_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_checkpoint_interval() {
        let mut config = Config::default();
        config.checkpoint_dir = Some(PathBuf::from("ckpt"));
        config.checkpoint_interval = 0;
        assert!(config.validate().is_err());

        config.checkpoint_interval = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_pregel_config() {
        let mut config = Config::default();
        config.max_paths = 4;
        config.deterministic = true;

        let pregel = config.to_pregel_config();
        assert_eq!(pregel.max_paths, 4);
        assert_eq!(pregel.candidate_order, CandidateOrder::Signature);
        assert_eq!(pregel.checkpoint_interval, 0);

        config.checkpoint_dir = Some(PathBuf::from("ckpt"));
        assert_eq!(config.to_pregel_config().checkpoint_interval, 10);
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        // Only a variable no other test touches
        env::set_var("FLOW_KEEP_CHECKPOINTS", "4");
        let config = Config::from_env().unwrap();
        env::remove_var("FLOW_KEEP_CHECKPOINTS");

        assert_eq!(config.keep_checkpoints, 4);
        assert_eq!(config.to_pregel_config().keep_checkpoints, 4);
    }
}
