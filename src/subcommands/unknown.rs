//! `gunshotmatch unknown` — process a single sample of unknown class.

use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::UnknownSettings;
use crate::export;
use crate::pipeline;

#[derive(Args, Debug)]
pub struct CmdUnknown {
    /// Unknown-sample TOML configuration
    #[arg(default_value = "unknown.toml")]
    pub unknown_toml: PathBuf,
}

impl CmdUnknown {
    pub fn run(self) -> Result<()> {
        let unknown = UnknownSettings::load(&self.unknown_toml)?;
        let output_dir = unknown.resolved_output_directory()?;

        println!("Processing unknown {}", unknown.name);

        let project = pipeline::process_unknown(&unknown, &output_dir, false)?;
        export::write_matches_json(&project, &output_dir)?;

        let peaks = project.consolidated_peaks.as_ref().ok_or_else(|| {
            anyhow!("consolidated peaks have not been computed for {}", project.name)
        })?;
        println!("{}", peaks.len());
        Ok(())
    }
}
