//! `gunshotmatch peak-report` — render PDF peak tables from saved projects.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::Projects;
use crate::model::Project;
use crate::report::peaks;

#[derive(Args, Debug)]
pub struct CmdPeakReport {
    /// Projects TOML configuration
    #[arg(default_value = "projects.toml")]
    pub projects_toml: PathBuf,
}

impl CmdPeakReport {
    pub fn run(self) -> Result<()> {
        let settings = Projects::load(&self.projects_toml)?;
        let output_dir = settings.global.resolved_output_directory()?;

        for (name, _) in settings.iter() {
            let gsmp = output_dir.join(Project::gsmp_filename(name));
            let project = Project::from_file(&gsmp).with_context(|| {
                format!("no saved project for {name}; run `gunshotmatch projects` first")
            })?;
            let path = peaks::write_peak_report(&project, &output_dir)?;
            println!("Wrote {}", path.display());
        }
        Ok(())
    }
}
