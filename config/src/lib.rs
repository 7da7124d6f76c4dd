//! Configuration loading for perlcheck.
//!
//! ```toml
//! [checker]
//! executable = "${HOME}/perl5/perlbrew/perls/perl-5.38.0/bin/perl"
//! options = ["-T"]
//! include_paths = ["/opt/perl/lib"]
//! relative_include_paths = ["lib", "local/lib/perl5"]
//! prepend_code = ["use strict;\n"]
//! cwd = "t"
//! timeout_secs = 30
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

use perlcheck_lint::CheckerConfig;

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".perlcheck.toml";

#[derive(Debug, Default, Deserialize)]
pub struct PerlcheckConfig {
    /// How to invoke the syntax checker.
    pub checker: Option<CheckerConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl PerlcheckConfig {
    /// Load from the first config file that exists: the workspace file, then
    /// the user file. `Ok(None)` when neither exists.
    pub fn load_default(workspace_root: &Path) -> Result<Option<Self>, ConfigError> {
        for path in config_candidates(workspace_root) {
            if path.exists() {
                return Self::load_from(&path).map(Some);
            }
        }
        Ok(None)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Parse TOML text and expand `${VAR}` references in path-valued settings.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        if let Some(checker) = config.checker.as_mut() {
            expand_checker_paths(checker);
        }
        Ok(config)
    }

    /// The checker settings, or defaults when the section is absent.
    #[must_use]
    pub fn checker_or_default(self) -> CheckerConfig {
        self.checker.unwrap_or_default()
    }
}

fn expand_checker_paths(checker: &mut CheckerConfig) {
    checker.executable = expand_env_vars(&checker.executable);
    for path in checker
        .include_paths
        .iter_mut()
        .chain(checker.relative_include_paths.iter_mut())
    {
        *path = expand_env_vars(path);
    }
    if let Some(cwd) = checker.cwd.as_mut() {
        *cwd = expand_env_vars(cwd);
    }
}

/// Replace `${VAR}` with the variable's value; unset variables become empty.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < value.len() {
        if value[i..].starts_with("${") {
            let start = i + 2;
            if let Some(end_rel) = value[start..].find('}') {
                let end = start + end_rel;
                let var = &value[start..end];
                if !var.is_empty() {
                    let replacement = env::var(var).unwrap_or_default();
                    out.push_str(&replacement);
                }
                i = end + 1;
                continue;
            }
        }

        let Some(ch) = value[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// Config files in lookup order.
#[must_use]
pub fn config_candidates(workspace_root: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![workspace_root.join(WORKSPACE_CONFIG_FILE)];
    if let Some(path) = user_config_path() {
        candidates.push(path);
    }
    candidates
}

/// `~/.perlcheck/config.toml`
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".perlcheck").join("config.toml"))
}
