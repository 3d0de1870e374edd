//! PDF reports rendered from processed projects.

pub mod chromatogram;
pub mod peaks;
