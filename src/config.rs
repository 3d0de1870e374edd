//! TOML settings for projects and unknown samples.

use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default alignment window in minutes.
pub const RT_TOLERANCE: f64 = 0.2;
/// A consolidated peak must appear in at least this many repeats.
pub const MIN_REPEATS: usize = 2;
/// Library hits with a mean score below this are discarded.
pub const MIN_MATCH_SCORE: f64 = 60.0;

fn default_rt_tolerance() -> f64 {
    RT_TOLERANCE
}

fn default_min_repeats() -> usize {
    MIN_REPEATS
}

fn default_min_match_score() -> f64 {
    MIN_MATCH_SCORE
}

/// `[global]` table of `projects.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    pub output_directory: PathBuf,
    #[serde(default = "default_rt_tolerance")]
    pub rt_tolerance: f64,
    #[serde(default = "default_min_repeats")]
    pub min_repeats: usize,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,
}

impl GlobalSettings {
    /// Absolute output directory (relative paths resolve against the cwd).
    pub fn resolved_output_directory(&self) -> Result<PathBuf> {
        resolve_dir(&self.output_directory)
    }
}

/// One `[projects.<name>]` table: where the repeat datafiles live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    pub data_directory: PathBuf,
    pub datafiles: Vec<String>,
}

/// The whole `projects.toml`: global knobs plus per-project settings,
/// iterated in sorted name order so console output is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Projects {
    pub global: GlobalSettings,
    #[serde(rename = "projects")]
    pub per_project: BTreeMap<String, ProjectSettings>,
}

impl Projects {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read projects config {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("invalid projects config {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.per_project.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_project.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProjectSettings)> {
        self.per_project.iter()
    }
}

/// `unknown.toml`: a single acquisition of unknown class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnknownSettings {
    pub name: String,
    pub datafile: PathBuf,
    pub output_directory: PathBuf,
    #[serde(default = "default_rt_tolerance")]
    pub rt_tolerance: f64,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: f64,
}

impl UnknownSettings {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read unknown config {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("invalid unknown config {}", path.display()))
    }

    pub fn resolved_output_directory(&self) -> Result<PathBuf> {
        resolve_dir(&self.output_directory)
    }
}

fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

/// "project" or "projects", matching the count.
pub fn project_plural(n: usize) -> &'static str {
    if n == 1 {
        "project"
    } else {
        "projects"
    }
}
