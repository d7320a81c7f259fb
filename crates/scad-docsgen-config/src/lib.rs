use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod mdimggen;

pub use mdimggen::{MDIMGGEN_RC_FILE, MdImgGenSettings, SourcePatterns};

pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_TARGET_PROFILE: &str = "githubwiki";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse {config_path}: {source}")]
    RcParseError {
        config_path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Unknown docs type \"{0}\"")]
    UnknownGenerator(String),

    #[error("Bad file pattern \"{pattern}\": {source}")]
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Which output pages a run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generators {
    pub files: bool,
    pub toc: bool,
    pub index: bool,
    pub topics: bool,
    pub cheat: bool,
    pub sidebar: bool,
}

impl Generators {
    pub fn any(&self) -> bool {
        self.files || self.toc || self.index || self.topics || self.cheat || self.sidebar
    }

    /// Enables a generator by the name used in `GenerateDocs:` directives.
    pub fn enable(&mut self, name: &str) -> Result<(), ConfigError> {
        match name.trim().to_uppercase().as_str() {
            "FILES" => self.files = true,
            "TOC" => self.toc = true,
            "INDEX" => self.index = true,
            "TOPICS" => self.topics = true,
            "CHEAT" | "CHEATSHEET" => self.cheat = true,
            "SIDEBAR" => self.sidebar = true,
            _ => return Err(ConfigError::UnknownGenerator(name.trim().to_string())),
        }
        Ok(())
    }
}

/// Settings for a single documentation run.
///
/// Layered as: built-in defaults, then the optional user config file, then
/// command-line flags, then directives from the project's rc file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub docs_dir: PathBuf,
    pub project_name: Option<String>,
    pub target_profile: String,
    pub strict: bool,
    pub quiet: bool,
    pub force: bool,
    pub test_only: bool,
    pub gen_images: bool,
    /// Animations are written as animated PNGs rather than GIFs.
    pub png_animation: bool,
    pub report: bool,
    pub generate: Generators,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            project_name: None,
            target_profile: DEFAULT_TARGET_PROFILE.to_string(),
            strict: false,
            quiet: false,
            force: false,
            test_only: false,
            gen_images: true,
            png_animation: false,
            report: false,
            generate: Generators::default(),
        }
    }
}

impl Settings {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the configured docs directory
        settings.docs_dir = Self::expand_path(&settings.docs_dir).unwrap_or(settings.docs_dir);
        settings.set_docs_dir(settings.docs_dir.clone());

        Ok(Some(settings))
    }

    /// Loads the user config file, falling back to defaults when it is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        Ok(Self::load_from_path(&config_path)?.unwrap_or_default())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/scad-docsgen");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Sets the docs directory, dropping any trailing slashes.
    pub fn set_docs_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        let dir = dir.into();
        let text = dir.to_string_lossy();
        let trimmed = text.trim().trim_end_matches('/');
        self.docs_dir = if trimmed.is_empty() {
            dir
        } else {
            PathBuf::from(trimmed)
        };
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

/// Parses the truthy spellings accepted by boolean rc directives.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_uppercase().as_str(), "TRUE" | "YES" | "1")
}

/// Expands glob patterns into the matching paths, in pattern order.
///
/// Entries the filesystem refuses to list are skipped.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut out = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() {
            continue;
        }
        let paths = glob::glob(pattern).map_err(|source| ConfigError::BadPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        for path in paths.flatten() {
            if !out.contains(&path) {
                out.push(path);
            }
        }
    }
    Ok(out)
}
