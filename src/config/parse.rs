//! Settings file discovery and parsing

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::config::types::Settings;
use crate::error::{ConfigError, ConfigResult};

/// Settings file names searched in each directory
const SETTINGS_FILE_NAMES: &[&str] = &["drover.yml", "drover.yaml"];

/// Find a settings file by walking from `start_dir` to the filesystem
/// root, then trying the user configuration directory. A missing file
/// is not an error; the caller falls back to defaults.
pub fn find_settings_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = Some(start_dir.to_path_buf());
    while let Some(dir) = current {
        for file_name in SETTINGS_FILE_NAMES {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        current = dir.parent().map(Path::to_path_buf);
    }

    let project = ProjectDirs::from("", "", "drover")?;
    for file_name in SETTINGS_FILE_NAMES {
        let candidate = project.config_dir().join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Parse and validate a settings file
pub fn parse_settings_file(path: &Path) -> ConfigResult<Settings> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let settings: Settings =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings for a run: an explicit file, or discovery from the
/// document's directory, or defaults. Returns the settings and the
/// directory its relative rule paths resolve against.
pub fn load_settings(
    explicit: Option<&Path>,
    document_dir: &Path,
) -> ConfigResult<(Settings, PathBuf)> {
    if let Some(path) = explicit {
        let settings = parse_settings_file(path)?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| document_dir.to_path_buf());
        return Ok((settings, base));
    }
    match find_settings_file(document_dir) {
        Some(path) => {
            let settings = parse_settings_file(&path)?;
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| document_dir.to_path_buf());
            Ok((settings, base))
        }
        None => Ok((Settings::default(), document_dir.to_path_buf())),
    }
}

/// Resolve the rule search paths for a run: CLI-supplied paths first,
/// then configured paths, then `rules/` beside the document, then the
/// user rules directory.
pub fn rule_search_paths(
    cli_paths: &[PathBuf],
    settings: &Settings,
    settings_dir: &Path,
    document_dir: &Path,
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for path in cli_paths {
        paths.push(absolutize(path, &cwd));
    }
    for path in &settings.rule_paths {
        paths.push(absolutize(Path::new(path), settings_dir));
    }
    paths.push(document_dir.join("rules"));
    if let Some(project) = ProjectDirs::from("", "", "drover") {
        paths.push(project.config_dir().join("rules"));
    }
    paths.dedup();
    paths
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
