//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/marktree/marktree.toml`
//! 3. Local config: `./.marktree.toml` or the file given with `--config`
//! 4. Environment variables: `MARKTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::services::{DEFAULT_NODE_THRESHOLD_LEAF, DEFAULT_NODE_THRESHOLD_TOTAL};
use crate::application::ApplicationError;
use crate::util::path::expand_path;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "MARKTREE";

/// Raw settings for intermediate parsing (everything optional to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub node_threshold_total: Option<usize>,
    pub node_threshold_leaf: Option<usize>,
    pub limiting_enabled: Option<bool>,
    pub children_method: Option<String>,
    pub count_method: Option<String>,
    pub hide_from_hierarchy: Option<Vec<String>>,
    pub marking_filter: Option<String>,
    pub hierarchy_file: Option<PathBuf>,
}

/// Unified configuration for marktree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Soft cap on marked nodes per marking pass (0 disables it)
    pub node_threshold_total: usize,
    /// Child count above which a node is rendered limited
    pub node_threshold_leaf: usize,
    /// Whether `node_threshold_leaf` applies at all
    pub limiting_enabled: bool,
    /// Children strategy name
    pub children_method: String,
    /// Child-count strategy name
    pub count_method: String,
    /// Node kinds excluded from every children listing
    pub hide_from_hierarchy: Vec<String>,
    /// Filter expression such as `Status=Published`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marking_filter: Option<String>,
    /// Hierarchy used when no source is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_threshold_total: DEFAULT_NODE_THRESHOLD_TOTAL,
            node_threshold_leaf: DEFAULT_NODE_THRESHOLD_LEAF,
            limiting_enabled: true,
            children_method: "AllChildrenIncludingDeleted".into(),
            count_method: "numChildren".into(),
            hide_from_hierarchy: vec![],
            marking_filter: None,
            hierarchy_file: None,
        }
    }
}

/// Get the XDG config directory for marktree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "marktree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("marktree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".marktree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(path) = &self.hierarchy_file {
            self.hierarchy_file = Some(expand_path(path));
        }
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `hide_from_hierarchy`: union merge with negation support
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            hide_from_hierarchy: overlay
                .hide_from_hierarchy
                .as_ref()
                .map(|o| Self::merge_array(&self.hide_from_hierarchy, o))
                .unwrap_or_else(|| self.hide_from_hierarchy.clone()),
            ..self.apply_scalars(overlay)
        }
    }

    /// Apply global config onto defaults.
    ///
    /// Unlike `merge_with()`, arrays use REPLACE semantics: if the global
    /// config specifies `hide_from_hierarchy`, it replaces the default list.
    pub fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            hide_from_hierarchy: global
                .hide_from_hierarchy
                .clone()
                .unwrap_or_else(|| self.hide_from_hierarchy.clone()),
            ..self.apply_scalars(global)
        }
    }

    fn apply_scalars(&self, raw: &RawSettings) -> Self {
        Self {
            node_threshold_total: raw
                .node_threshold_total
                .unwrap_or(self.node_threshold_total),
            node_threshold_leaf: raw.node_threshold_leaf.unwrap_or(self.node_threshold_leaf),
            limiting_enabled: raw.limiting_enabled.unwrap_or(self.limiting_enabled),
            children_method: raw
                .children_method
                .clone()
                .unwrap_or_else(|| self.children_method.clone()),
            count_method: raw
                .count_method
                .clone()
                .unwrap_or_else(|| self.count_method.clone()),
            hide_from_hierarchy: self.hide_from_hierarchy.clone(),
            marking_filter: raw
                .marking_filter
                .clone()
                .or_else(|| self.marking_filter.clone()),
            hierarchy_file: raw
                .hierarchy_file
                .clone()
                .or_else(|| self.hierarchy_file.clone()),
        }
    }

    /// Load settings with an explicitly named config file, which must exist.
    pub fn load_explicit(config_file: &Path) -> Result<Self, ApplicationError> {
        if !config_file.exists() {
            return Err(ApplicationError::Config {
                message: format!("config file not found: {}", config_file.display()),
            });
        }
        Self::load(Some(config_file))
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional local config file; skipped when it does not exist
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(local_path) = local_config {
            if local_path.exists() {
                let raw = load_raw_settings(local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply MARKTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("hide_from_hierarchy")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Some(val) = env_value::<usize>(&config, "node_threshold_total")? {
            settings.node_threshold_total = val;
        }
        if let Some(val) = env_value::<usize>(&config, "node_threshold_leaf")? {
            settings.node_threshold_leaf = val;
        }
        if let Some(val) = env_value::<bool>(&config, "limiting_enabled")? {
            settings.limiting_enabled = val;
        }
        if let Some(val) = env_value::<String>(&config, "children_method")? {
            settings.children_method = val;
        }
        if let Some(val) = env_value::<String>(&config, "count_method")? {
            settings.count_method = val;
        }
        if let Some(val) = env_value::<Vec<String>>(&config, "hide_from_hierarchy")? {
            settings.hide_from_hierarchy = val;
        }
        if let Some(val) = env_value::<String>(&config, "marking_filter")? {
            settings.marking_filter = Some(val);
        }
        if let Some(val) = env_value::<String>(&config, "hierarchy_file")? {
            settings.hierarchy_file = Some(PathBuf::from(val));
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# marktree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/marktree/marktree.toml
#   Local:  ./.marktree.toml (or --config FILE)
#   Env:    MARKTREE_* environment variables
#
# hide_from_hierarchy in the local file is merged with the global list.
# Use "!Kind" to remove an inherited entry.

# Soft cap on marked nodes per marking pass (0 disables)
# node_threshold_total = 50

# Nodes with more children than this are shown limited
# node_threshold_leaf = 250
# limiting_enabled = true

# AllChildrenIncludingDeleted | AllChildren | Children
# children_method = "AllChildrenIncludingDeleted"

# numChildren | numHistoricalChildren
# count_method = "numChildren"

# hide_from_hierarchy = ["Attachment"]
# marking_filter = "Status in Published,Draft"
# hierarchy_file = "~/site/tree.toml"
"#
        .to_string()
    }
}

/// Typed lookup of one environment override; unset is `None`, unparsable is an error.
fn env_value<T: DeserializeOwned>(
    config: &Config,
    key: &str,
) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(ApplicationError::Config {
            message: format!("{}_{}: {}", ENV_PREFIX, key.to_uppercase(), e),
        }),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
