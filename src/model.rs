//! Core data model: peaks, repeats, alignments, projects, `.gsmp` persistence.

use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A library hit for a peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundMatch {
    pub name: String,
    pub score: f64,
}

/// One chromatographic peak; rt in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub rt: f64,
    pub area: f64,
    pub hits: Vec<CompoundMatch>,
}

impl Peak {
    /// Highest-scoring library hit, if any.
    pub fn best_hit(&self) -> Option<&CompoundMatch> {
        self.hits.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// One GC-MS acquisition: a named, rt-sorted peak list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datafile {
    pub name: String,
    pub peaks: Vec<Peak>,
}

/// One acquisition within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    pub datafile: Datafile,
}

/// One aligned peak position: the peak index per repeat (None = absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub rt: f64,
    pub peak_indices: Vec<Option<usize>>,
}

impl AlignedRow {
    /// Number of repeats containing this peak.
    pub fn count(&self) -> usize {
        self.peak_indices.iter().filter(|i| i.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub rows: Vec<AlignedRow>,
}

/// An identification vote aggregated across repeats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedHit {
    pub name: String,
    /// Mean library score over the repeats proposing this compound.
    pub score: f64,
    /// Number of member peaks proposing this compound.
    pub count: usize,
}

/// A peak merged across repeats, with its winning identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedPeak {
    pub rt: f64,
    pub area: f64,
    /// Number of repeats the peak was found in.
    pub count: usize,
    pub name: String,
    pub score: f64,
    pub hits: Vec<ConsolidatedHit>,
}

/// A named collection of repeats processed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub repeats: Vec<Repeat>,
    pub alignment: Alignment,
    pub consolidated_peaks: Option<Vec<ConsolidatedPeak>>,
}

impl Project {
    pub fn gsmp_filename(name: &str) -> String {
        format!("{name}.gsmp")
    }

    /// Write the project to `<out_dir>/<name>.gsmp` (pretty JSON).
    pub fn save(&self, out_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)?;
        let path = out_dir.join(Self::gsmp_filename(&self.name));
        let f = fs::File::create(&path)?;
        serde_json::to_writer_pretty(f, self)
            .with_context(|| format!("failed to write project to {}", path.display()))?;
        Ok(path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let f = fs::File::open(path)?;
        let project: Self = serde_json::from_reader(f)
            .with_context(|| format!("failed to parse project file {}", path.display()))?;
        Ok(project)
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("saved project {name:?} diverges from the in-memory project (md5 {disk} != {memory})")]
    Mismatch {
        name: String,
        memory: String,
        disk: String,
    },
}

fn digest(project: &Project) -> Result<String> {
    let bytes = serde_json::to_vec(project)?;
    Ok(format!("{:x}", md5::compute(&bytes)))
}

/// Check that what was persisted to disk round-trips to the in-memory project.
pub fn verify_saved_project(memory: &Project, disk: &Project) -> Result<()> {
    let mem_md5 = digest(memory)?;
    let disk_md5 = digest(disk)?;
    if mem_md5 != disk_md5 {
        return Err(VerifyError::Mismatch {
            name: memory.name.clone(),
            memory: mem_md5,
            disk: disk_md5,
        }
        .into());
    }
    Ok(())
}
