use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{ConfigError, DEFAULT_DOCS_DIR};

/// Project defaults for the markdown image generator, read from the working
/// directory.
pub const MDIMGGEN_RC_FILE: &str = ".openscad_mdimggen_rc";

/// One glob pattern or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourcePatterns {
    One(String),
    Many(Vec<String>),
}

impl SourcePatterns {
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::One(pattern) => vec![pattern.clone()],
            Self::Many(patterns) => patterns.clone(),
        }
    }
}

/// Settings for a markdown image generation run.
///
/// The rc file is YAML; flags given on the command line are applied on top.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MdImgGenSettings {
    pub docs_dir: PathBuf,
    /// Prepended to each output page name.
    pub file_prefix: String,
    /// Image directory, relative to `docs_dir`.
    pub image_root: String,
    #[serde(rename = "png_animations")]
    pub png_animation: bool,
    /// Used when no files are named on the command line.
    pub source_files: Option<SourcePatterns>,
    #[serde(skip)]
    pub test_only: bool,
    #[serde(skip)]
    pub force: bool,
}

impl Default for MdImgGenSettings {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            file_prefix: String::new(),
            image_root: "images".to_string(),
            png_animation: true,
            source_files: None,
            test_only: false,
            force: false,
        }
    }
}

impl MdImgGenSettings {
    /// Reads the rc file at `path`. A missing file gives the defaults, as does
    /// an empty one.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigReadError {
            config_path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::RcParseError {
            config_path: path.to_path_buf(),
            source,
        })
    }

    fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let settings: Option<Self> = serde_yaml::from_str(content)?;
        Ok(settings.unwrap_or_default())
    }

    /// Patterns from `source_files`, or none.
    pub fn source_patterns(&self) -> Vec<String> {
        self.source_files
            .as_ref()
            .map(SourcePatterns::patterns)
            .unwrap_or_default()
    }
}
