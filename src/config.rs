//! Application configuration.
//!
//! Options are resolved once at startup from an ordered list of layers:
//! explicit command-line flags, then a JSON file, then compiled-in
//! defaults.  Each field is resolved independently: the first layer that
//! sets it wins.
//!
//! The file is the one passed with `--config <path>`, or else the first of
//! these that exists:
//!
//! 1. `$XDG_CONFIG_HOME/qkdisplays.json`
//! 2. `$HOME/.config/qkdisplays.json`
//! 3. `/etc/qkdisplays.json`
//!
//! # Example
//!
//! ```json
//! {
//!   "allow_reorg": false,
//!   "strict_y": true
//! }
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in each configuration directory.
pub const CONFIG_FILE_NAME: &str = "qkdisplays.json";

/// Optional stylesheet for the indicator overlays.
pub const CSS_FILE_NAME: &str = "qkdisplays.css";

/// Fully resolved options for an [`Arrangement`](crate::arrangement::Arrangement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrangementOptions {
    /// Repair outputs that are not contiguous (or not aligned, with
    /// `strict_y`) instead of failing.
    pub allow_reorg: bool,
    /// All outputs must share the same y coordinate.
    pub strict_y: bool,
}

impl Default for ArrangementOptions {
    fn default() -> Self {
        Self {
            allow_reorg: true,
            strict_y: true,
        }
    }
}

/// One configuration layer.  Absent (or `null`) fields defer to the next
/// layer.
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialOptions {
    pub allow_reorg: Option<bool>,
    pub strict_y: Option<bool>,
}

impl PartialOptions {
    /// Load a layer from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let layer: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(layer)
    }
}

/// Merge `layers` (highest precedence first) over the defaults.
pub fn resolve(layers: &[PartialOptions]) -> ArrangementOptions {
    let defaults = ArrangementOptions::default();
    ArrangementOptions {
        allow_reorg: layers
            .iter()
            .find_map(|l| l.allow_reorg)
            .unwrap_or(defaults.allow_reorg),
        strict_y: layers
            .iter()
            .find_map(|l| l.strict_y)
            .unwrap_or(defaults.strict_y),
    }
}

/// Read an environment variable, treating an empty value as unset.
fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// User configuration directories, most specific first.
fn user_config_dirs(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    dirs.extend(xdg_config_home);
    dirs.extend(home.map(|h| h.join(".config")));
    dirs
}

/// Candidate configuration files in lookup order.
pub fn search_paths(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = user_config_dirs(xdg_config_home, home)
        .into_iter()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .collect();
    paths.push(Path::new("/etc").join(CONFIG_FILE_NAME));
    paths
}

/// The first existing configuration file, if any.
pub fn find_config_file() -> Option<PathBuf> {
    search_paths(env_path("XDG_CONFIG_HOME"), env_path("HOME"))
        .into_iter()
        .find(|p| p.exists())
}

/// The user's indicator stylesheet, if one exists.
pub fn find_css_file() -> Option<PathBuf> {
    user_config_dirs(env_path("XDG_CONFIG_HOME"), env_path("HOME"))
        .into_iter()
        .map(|d| d.join(CSS_FILE_NAME))
        .find(|p| p.exists())
}

/// Resolve the options for this run.
///
/// `explicit` holds the command-line flags.  When `config_path` is given it
/// must be readable; otherwise the search paths are tried and a missing
/// file simply contributes nothing.
pub fn load_options(
    explicit: PartialOptions,
    config_path: Option<&Path>,
) -> Result<ArrangementOptions, ConfigError> {
    let path = match config_path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let mut layers = vec![explicit];
    if let Some(path) = path {
        debug!("loading config from {}", path.display());
        layers.push(PartialOptions::load(&path)?);
    }

    let options = resolve(&layers);
    debug!("resolved options: {:?}", options);
    Ok(options)
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
