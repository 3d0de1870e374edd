//! One module per subcommand; each `Cmd*` struct has a `run` method.

pub mod chromatograms;
pub mod decision_tree;
pub mod peak_report;
pub mod projects;
pub mod unknown;
