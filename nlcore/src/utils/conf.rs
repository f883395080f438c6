use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    magic::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_CONFIG_PATH},
    utils::error::{NlError, NlResult},
};

/// Compiler configuration, usually read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Capacity of each pending-operand stack.
    pub max_depth: usize,
    /// Overrides the tolerance reported by the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feasibility_tolerance: Option<f64>,
    /// Evaluate compiled expressions against the validation record, if any.
    pub validate: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: nlinstr::builder::DEFAULT_MAX_DEPTH,
            feasibility_tolerance: None,
            validate: true,
        }
    }
}

impl CompilerConfig {
    /// Path of the configuration file: `NLINSTR_CONFIG_PATH` when set,
    /// otherwise `nlinstr/config.toml` under the platform config directory.
    pub fn default_path() -> PathBuf {
        resolve_path(|name| env::var_os(name))
    }

    /// Load the configuration from a TOML file. Missing keys take their default.
    pub fn load_from_toml(path: &Path) -> NlResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents, path)
    }

    /// Load from the default path, falling back to defaults if no file exists.
    pub fn load_or_default() -> NlResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn from_toml_str(toml_str: &str, path: &Path) -> NlResult<Self> {
        toml::from_str(toml_str).map_err(|e| NlError::ConfigParseError {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save_to_toml(&self, path: &Path) -> NlResult<()> {
        let contents = toml::to_string(self).map_err(|source| NlError::ConfigSerializeError {
            source,
            file: path.display().to_string(),
        })?;

        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
            _ => {}
        }
        Ok(fs::write(path, contents)?)
    }
}

/// Configuration path from the environment as seen through `lookup`.
fn resolve_path(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    if let Some(path) = lookup(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }

    let base = if cfg!(windows) {
        lookup("APPDATA").map(PathBuf::from)
    } else {
        lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| Path::new(&home).join(".config")))
    };
    base.unwrap_or_default().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}
