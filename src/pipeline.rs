//! Project and unknown-sample processing: load datafiles, align, consolidate,
//! persist `.gsmp` files.

use anyhow::{Context, Result};
use fs_err as fs;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::align;
use crate::config::{GlobalSettings, ProjectSettings, Projects, UnknownSettings};
use crate::datafile;
use crate::model::{Project, Repeat};

/// Process every configured project, reusing saved `.gsmp` files unless
/// `recreate` is set. Returns the projects in configuration (sorted) order.
pub fn process_projects(
    settings: &Projects,
    output_dir: &Path,
    recreate: bool,
) -> Result<Vec<Project>> {
    fs::create_dir_all(output_dir)?;

    let mut projects = Vec::with_capacity(settings.len());
    for (name, project_settings) in settings.iter() {
        let gsmp = output_dir.join(Project::gsmp_filename(name));
        if !recreate && gsmp.exists() {
            log::info!("loading existing project from {}", gsmp.display());
            projects.push(Project::from_file(&gsmp)?);
            continue;
        }

        log::info!("processing project {name}");
        let project = build_project(name, project_settings, &settings.global)?;
        project.save(output_dir)?;
        projects.push(project);
    }
    Ok(projects)
}

fn build_project(
    name: &str,
    settings: &ProjectSettings,
    global: &GlobalSettings,
) -> Result<Project> {
    let bar = ProgressBar::new(settings.datafiles.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg:>12} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(name.to_string());

    let mut repeats = Vec::with_capacity(settings.datafiles.len());
    for filename in &settings.datafiles {
        let path = settings.data_directory.join(filename);
        let df = datafile::read_datafile(&path)
            .with_context(|| format!("while loading repeat {filename} of project {name}"))?;
        repeats.push(Repeat { datafile: df });
        bar.inc(1);
    }
    bar.finish_and_clear();

    let alignment = align::align(&repeats, global.rt_tolerance);
    let consolidated = align::consolidate(
        &repeats,
        &alignment,
        global.min_repeats,
        global.min_match_score,
    );
    log::info!(
        "{name}: {} repeats, {} aligned rows, {} consolidated peaks",
        repeats.len(),
        alignment.rows.len(),
        consolidated.len()
    );

    Ok(Project {
        name: name.to_string(),
        repeats,
        alignment,
        consolidated_peaks: Some(consolidated),
    })
}

/// Process an unknown sample: a single-repeat project, consolidated with
/// `min_repeats = 1` so every qualifying peak survives.
pub fn process_unknown(
    unknown: &UnknownSettings,
    output_dir: &Path,
    recreate: bool,
) -> Result<Project> {
    fs::create_dir_all(output_dir)?;

    let gsmp = output_dir.join(Project::gsmp_filename(&unknown.name));
    if !recreate && gsmp.exists() {
        log::info!("loading existing unknown from {}", gsmp.display());
        return Project::from_file(&gsmp);
    }

    let df = datafile::read_datafile(&unknown.datafile)
        .with_context(|| format!("while loading unknown sample {}", unknown.name))?;
    let repeats = vec![Repeat { datafile: df }];
    let alignment = align::align(&repeats, unknown.rt_tolerance);
    let consolidated = align::consolidate(&repeats, &alignment, 1, unknown.min_match_score);

    let project = Project {
        name: unknown.name.clone(),
        repeats,
        alignment,
        consolidated_peaks: Some(consolidated),
    };
    project.save(output_dir)?;
    Ok(project)
}
