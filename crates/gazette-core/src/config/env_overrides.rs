//! Environment variable overrides for configuration.
//!
//! The stage-binding variables keep the unprefixed names the deployment
//! has always used (`BRAINSTORM_PROVIDER`, `TOURNAMENT_FINALS_MODEL`, ...).
//! `TOURNAMENT_ELIMINATION_*` is an accepted alias for the bulk
//! `TOURNAMENT_*` binding.

use super::Config;
use crate::error::ConfigError;
use std::env;

impl Config {
    /// Apply environment variable overrides to the configuration.
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Stage bindings
        if let Ok(val) = env::var("BRAINSTORM_PROVIDER") {
            self.llm.brainstorm.provider = val;
        }
        if let Ok(val) = env::var("BRAINSTORM_MODEL") {
            self.llm.brainstorm.model = val;
        }
        if let Ok(val) = env::var("GENERATE_PROVIDER") {
            self.llm.generate.provider = val;
        }
        if let Ok(val) = env::var("GENERATE_MODEL") {
            self.llm.generate.model = val;
        }
        if let Ok(val) = env::var("TOURNAMENT_PROVIDER") {
            self.llm.tournament.provider = val;
        }
        if let Ok(val) = env::var("TOURNAMENT_MODEL") {
            self.llm.tournament.model = val;
        }
        // Older deployments called the bulk binding "elimination".
        if let Ok(val) = env::var("TOURNAMENT_ELIMINATION_PROVIDER") {
            self.llm.tournament.provider = val;
        }
        if let Ok(val) = env::var("TOURNAMENT_ELIMINATION_MODEL") {
            self.llm.tournament.model = val;
        }
        if let Ok(val) = env::var("TOURNAMENT_FINALS_PROVIDER") {
            self.llm.tournament_finals.provider = val;
        }
        if let Ok(val) = env::var("TOURNAMENT_FINALS_MODEL") {
            self.llm.tournament_finals.model = val;
        }

        // Tournament knobs
        if let Ok(val) = env::var("TOURNAMENT_FINALS_CUTOFF") {
            self.tournament.finals_cutoff = parse_env_usize("TOURNAMENT_FINALS_CUTOFF", &val)?;
        }
        if let Ok(val) = env::var("TOURNAMENT_VERBOSE") {
            self.tournament.verbose = parse_env_bool(&val);
        }

        // Storage
        if let Ok(val) = env::var("GAZETTE_DB_PATH") {
            self.storage.db_path = val;
        }

        Ok(())
    }
}

fn parse_env_usize(name: &str, val: &str) -> Result<usize, ConfigError> {
    val.parse().map_err(|_| ConfigError::InvalidValue {
        field: name.to_string(),
        message: format!("'{val}' is not a valid integer"),
    })
}

fn parse_env_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
