// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Project configuration
//!
//! `.artiflow.yaml` (or `.artiflow.toml`) names the descriptor sources, in
//! priority order, and the defaults for a run. Command-line flags override
//! everything here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::{ArtiflowError, ArtiflowResult};
use crate::pipeline::FailurePolicy;
use crate::registry::DescriptorSource;

/// File names searched for, in order
pub const CONFIG_FILES: [&str; 3] = [".artiflow.yaml", ".artiflow.yml", ".artiflow.toml"];

/// Project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Descriptor source patterns, lowest priority first; globs allowed
    pub sources: Vec<String>,

    /// Default failure policy
    pub policy: FailurePolicy,

    /// Concurrency bound; absent or zero is unbounded
    pub max_parallel: Option<usize>,

    /// Shell used to run step commands
    pub shell: String,

    /// Directory step commands run in, relative to the config file
    pub working_dir: Option<PathBuf>,

    /// Extra environment for every step
    pub env: HashMap<String, String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            policy: FailurePolicy::default(),
            max_parallel: None,
            shell: "sh".to_string(),
            working_dir: None,
            env: HashMap::new(),
        }
    }
}

impl FlowConfig {
    /// Load a config file, choosing the format by extension
    pub fn load(path: &Path) -> ArtiflowResult<Self> {
        if !path.exists() {
            return Err(ArtiflowError::InvalidConfig {
                reason: format!("config file not found: {}", path.display()),
                help: Some("Create .artiflow.yaml or pass --config".into()),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");

        let config = if is_toml {
            Self::from_toml(&content)?
        } else {
            Self::from_yaml(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Find and load the first config file in `dir`; defaults when none exists
    pub fn discover(dir: &Path) -> ArtiflowResult<(Self, Option<PathBuf>)> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.is_file() {
                tracing::debug!(config = %path.display(), "loading configuration");
                return Ok((Self::load(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> ArtiflowResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse TOML
    pub fn from_toml(text: &str) -> ArtiflowResult<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    fn validate(&self) -> ArtiflowResult<()> {
        if self.shell.trim().is_empty() {
            return Err(ArtiflowError::InvalidConfig {
                reason: "`shell` must not be empty".into(),
                help: Some("Use e.g. `shell: bash`".into()),
            });
        }
        Ok(())
    }

    /// Expand `sources` relative to `base` into descriptor sources.
    ///
    /// Each pattern's matches are sorted; a file matched by several
    /// patterns keeps its first (lowest) priority. Patterns that match
    /// nothing are logged and ignored.
    pub fn resolve_sources(&self, base: &Path) -> ArtiflowResult<Vec<DescriptorSource>> {
        resolve_patterns(&self.sources, base)
    }

    /// Working directory for step commands
    pub fn working_dir(&self, base: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }
}

/// Expand glob patterns into file sources
pub fn resolve_patterns(patterns: &[String], base: &Path) -> ArtiflowResult<Vec<DescriptorSource>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            base.join(pattern).to_string_lossy().to_string()
        };

        let mut matches: Vec<PathBuf> = glob::glob(&full)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            tracing::warn!(pattern = %pattern, "source pattern matched no files");
            continue;
        }

        matches.sort();
        for path in matches {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files.into_iter().map(DescriptorSource::File).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config() {
        let config = FlowConfig::from_yaml(
            r#"
sources:
  - common/*/dependency.yaml
  - project/dependency.yaml
policy: skip-downstream
max_parallel: 4
env:
  PROJECT: demo
"#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.policy, FailurePolicy::SkipDownstream);
        assert_eq!(config.max_parallel, Some(4));
        assert_eq!(config.shell, "sh");
        assert_eq!(config.env["PROJECT"], "demo");
    }

    #[test]
    fn test_toml_config() {
        let config = FlowConfig::from_toml(
            r#"
sources = ["flows/*.yaml"]
policy = "stop"
shell = "bash"
"#,
        )
        .unwrap();

        assert_eq!(config.policy, FailurePolicy::Stop);
        assert_eq!(config.shell, "bash");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FlowConfig::from_yaml("polcy: strict\n").is_err());
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(FlowConfig::from_yaml("").unwrap(), FlowConfig::default());
    }

    #[test]
    fn test_discover_and_resolve() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for flow in ["pv_calibre", "pnr_innovus"] {
            fs::create_dir_all(root.join("common").join(flow)).unwrap();
            fs::write(root.join("common").join(flow).join("dependency.yaml"), "").unwrap();
        }
        fs::write(
            root.join(".artiflow.yaml"),
            concat!(
                "sources:\n",
                "  - common/*/dependency.yaml\n",
                "  - common/pv_calibre/dependency.yaml\n",
                "  - missing/*.yaml\n",
            ),
        )
        .unwrap();

        let (config, path) = FlowConfig::discover(root).unwrap();
        assert_eq!(path, Some(root.join(".artiflow.yaml")));

        let sources = config.resolve_sources(root).unwrap();
        let labels: Vec<String> = sources.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].contains("pnr_innovus"));
        assert!(labels[1].contains("pv_calibre"));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = TempDir::new().unwrap();
        let (config, path) = FlowConfig::discover(dir.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn test_working_dir_is_relative_to_base() {
        let config = FlowConfig {
            working_dir: Some("run".into()),
            ..FlowConfig::default()
        };
        assert_eq!(config.working_dir(Path::new("/proj")), PathBuf::from("/proj/run"));
    }
}
