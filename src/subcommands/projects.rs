//! `gunshotmatch projects` — build projects from raw datafiles and export results.

use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{project_plural, Projects};
use crate::export;
use crate::model::{verify_saved_project, Project};
use crate::pipeline;

#[derive(Args, Debug)]
pub struct CmdProjects {
    /// Projects TOML configuration
    #[arg(default_value = "projects.toml")]
    pub projects_toml: PathBuf,
}

impl CmdProjects {
    pub fn run(self) -> Result<()> {
        let started = Instant::now();
        let settings = Projects::load(&self.projects_toml)?;
        let output_dir = settings.global.resolved_output_directory()?;

        println!("Processing {} {}:", settings.len(), project_plural(settings.len()));
        for (name, _) in settings.iter() {
            println!("  {name}");
        }
        println!("Saving to {:?}", output_dir.display().to_string());

        for project in pipeline::process_projects(&settings, &output_dir, false)? {
            let from_disk =
                Project::from_file(&output_dir.join(Project::gsmp_filename(&project.name)))?;
            verify_saved_project(&project, &from_disk)?;

            export::write_alignment(&project, &output_dir)?;
            for repeat in &project.repeats {
                export::write_combined_csv(repeat, &output_dir)?;
            }
            export::write_matches_json(&project, &output_dir)?;

            let peaks = project.consolidated_peaks.as_ref().ok_or_else(|| {
                anyhow!("consolidated peaks have not been computed for {}", project.name)
            })?;
            println!("{}: {} consolidated peaks", project.name, peaks.len());
            println!("{}", peaks.len());
        }

        log::info!("processed in {}", humantime::format_duration(started.elapsed()));
        Ok(())
    }
}
