//! Settings types
//!
//! These structures represent a drover.yml settings file. Everything is
//! optional; [`Settings::merge_under`] layers a file over the built-in
//! defaults, and CLI flags are applied on top by the application.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// A file type the extractor understands: an extension plus the regex
/// recognizing its comment prefix
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileType {
    /// File extension without the dot (e.g. "tex")
    pub extension: String,

    /// Anchored regex for the comment prefix (e.g. `^\s*%+`)
    pub pattern: String,
}

/// Top-level settings structure, as deserialized from drover.yml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Rule search paths, in priority order, relative to the settings
    /// file's directory when not absolute
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_paths: Vec<String>,

    /// Ceiling for while/until loop iterations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_loops: Option<u32>,

    /// Command timeout in seconds; absent or zero means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Stop the run after the first failing command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halt_on_error: Option<bool>,

    /// Interpreter for command lines (e.g. ["bash", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Extra file types, consulted before the built-ins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filetypes: Vec<FileType>,
}

impl Settings {
    /// Validate the settings: every filetype pattern must compile
    pub fn validate(&self) -> ConfigResult<()> {
        for filetype in &self.filetypes {
            regex::Regex::new(&filetype.pattern).map_err(|e| ConfigError::BadPattern {
                pattern: filetype.pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(interpreter) = &self.interpreter {
            if interpreter.is_empty() {
                return Err(ConfigError::Invalid(
                    "interpreter must name a program".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Find the file type for an extension: configured entries first,
    /// then the built-ins
    pub fn filetype_for(&self, extension: &str) -> ConfigResult<FileType> {
        let wanted = extension.to_ascii_lowercase();
        self.filetypes
            .iter()
            .chain(builtin_filetypes().iter())
            .find(|ft| ft.extension == wanted)
            .cloned()
            .ok_or(ConfigError::UnknownFileType(wanted))
    }
}

/// File types known without any configuration
pub fn builtin_filetypes() -> &'static [FileType] {
    use std::sync::OnceLock;
    static BUILTINS: OnceLock<Vec<FileType>> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        let percent = r"^\s*%+";
        let hash = r"^\s*#";
        let mut types = Vec::new();
        for ext in ["tex", "latex", "dtx", "cls", "sty"] {
            types.push(FileType {
                extension: ext.to_string(),
                pattern: percent.to_string(),
            });
        }
        for ext in ["sh", "bash", "py", "yaml", "yml", "toml", "mk", "makefile"] {
            types.push(FileType {
                extension: ext.to_string(),
                pattern: hash.to_string(),
            });
        }
        types
    })
}
