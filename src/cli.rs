//! CLI definition and top-level dispatch.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};

use crate::subcommands::{
    chromatograms::CmdChromatograms, decision_tree::CmdDecisionTree, peak_report::CmdPeakReport,
    projects::CmdProjects, unknown::CmdUnknown,
};
use crate::versions;

#[derive(Parser, Debug)]
#[command(
    name = "gunshotmatch",
    about = "GunShotMatch command-line interface",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version information (repeat for more detail)
    #[arg(short = 'V', long = "version", action = ArgAction::Count)]
    version: u8,

    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pipeline for creating projects from raw datafiles
    Projects(CmdProjects),

    /// Pipeline for an unknown propellant/OGSR sample
    Unknown(CmdUnknown),

    /// Train a classifier and predict the class of an unknown sample
    DecisionTree(CmdDecisionTree),

    /// Render PDF peak reports for previously saved projects
    PeakReport(CmdPeakReport),

    /// Render PDF chromatogram reports for previously saved projects
    Chromatograms(CmdChromatograms),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if self.version > 0 {
            versions::print_version(self.version);
            return Ok(());
        }
        match self.cmd {
            Some(Commands::Projects(cmd)) => cmd.run(),
            Some(Commands::Unknown(cmd)) => cmd.run(),
            Some(Commands::DecisionTree(cmd)) => cmd.run(),
            Some(Commands::PeakReport(cmd)) => cmd.run(),
            Some(Commands::Chromatograms(cmd)) => cmd.run(),
            None => Err(anyhow!("missing subcommand; run with --help for usage")),
        }
    }
}
