//! Exporters: alignment CSV, per-repeat combined CSV, matches JSON.

use anyhow::{anyhow, Result};
use csv::Writer;
use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::model::{Project, Repeat};

/// Write `<name>_alignment.csv`: one row per aligned peak, the mean rt then
/// the rt observed in each repeat (empty cell when absent).
pub fn write_alignment(project: &Project, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}_alignment.csv", project.name));
    let mut writer = Writer::from_writer(fs::File::create(&path)?);

    let mut header = vec!["rt".to_string()];
    header.extend(project.repeats.iter().map(|r| r.datafile.name.clone()));
    writer.write_record(&header)?;

    for row in &project.alignment.rows {
        let mut record = vec![format!("{:.4}", row.rt)];
        for (ri, pi) in row.peak_indices.iter().enumerate() {
            record.push(match pi {
                Some(pi) => format!("{:.4}", project.repeats[ri].datafile.peaks[*pi].rt),
                None => String::new(),
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Write `<datafile>_combined.csv`: every peak of the repeat with its top hit.
pub fn write_combined_csv(repeat: &Repeat, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}_combined.csv", repeat.datafile.name));
    let mut writer = Writer::from_writer(fs::File::create(&path)?);

    writer.write_record(["rt", "area", "compound", "score"])?;
    for peak in &repeat.datafile.peaks {
        let (compound, score) = match peak.best_hit() {
            Some(hit) => (hit.name.clone(), format!("{:.1}", hit.score)),
            None => (String::new(), String::new()),
        };
        writer.write_record([
            format!("{:.4}", peak.rt),
            format!("{:.1}", peak.area),
            compound,
            score,
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

/// Write `<name>_matches.json`: the consolidated peaks with their full hit lists.
pub fn write_matches_json(project: &Project, out_dir: &Path) -> Result<PathBuf> {
    let peaks = project
        .consolidated_peaks
        .as_ref()
        .ok_or_else(|| anyhow!("consolidated peaks have not been computed for {}", project.name))?;
    fs::create_dir_all(out_dir)?;

    let obj = serde_json::json!({
        "project": project.name,
        "matches": peaks,
    });
    let path = out_dir.join(format!("{}_matches.json", project.name));
    serde_json::to_writer_pretty(fs::File::create(&path)?, &obj)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align;
    use crate::model::{Alignment, CompoundMatch, Datafile, Peak};

    fn project() -> Project {
        let peak = |rt: f64, area: f64, compound: &str, score: f64| Peak {
            rt,
            area,
            hits: vec![CompoundMatch {
                name: compound.to_string(),
                score,
            }],
        };
        let repeats = vec![
            Repeat {
                datafile: Datafile {
                    name: "ELEY_1".to_string(),
                    peaks: vec![peak(4.50, 1200.0, "Nitroglycerin", 85.0), peak(9.0, 50.0, "X", 90.0)],
                },
            },
            Repeat {
                datafile: Datafile {
                    name: "ELEY_2".to_string(),
                    peaks: vec![peak(4.55, 1100.0, "Nitroglycerin", 82.0)],
                },
            },
        ];
        let alignment = align::align(&repeats, 0.2);
        let consolidated = align::consolidate(&repeats, &alignment, 2, 60.0);
        Project {
            name: "ELEY".to_string(),
            repeats,
            alignment,
            consolidated_peaks: Some(consolidated),
        }
    }

    #[test]
    fn alignment_csv_has_row_per_aligned_peak() {
        let dir = tempfile::tempdir().unwrap();
        let project = project();
        let path = write_alignment(&project, dir.path()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "rt,ELEY_1,ELEY_2");
        // Two aligned rows; the unmatched one has an empty trailing cell.
        assert_eq!(lines.clone().count(), 2);
        assert!(lines.any(|l| l.ends_with(',')));
    }

    #[test]
    fn combined_csv_lists_every_peak() {
        let dir = tempfile::tempdir().unwrap();
        let project = project();
        let path = write_combined_csv(&project.repeats[0], dir.path()).unwrap();
        assert!(path.ends_with("ELEY_1_combined.csv"));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3); // header + two peaks
        assert!(text.contains("Nitroglycerin"));
    }

    #[test]
    fn combined_csv_quotes_compound_names_with_commas() {
        let dir = tempfile::tempdir().unwrap();
        let repeat = Repeat {
            datafile: Datafile {
                name: "GECO_1".to_string(),
                peaks: vec![Peak {
                    rt: 6.10,
                    area: 450.0,
                    hits: vec![CompoundMatch {
                        name: "2,4-Dinitrotoluene".to_string(),
                        score: 78.5,
                    }],
                }],
            },
        };
        let path = write_combined_csv(&repeat, dir.path()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"2,4-Dinitrotoluene\""));
        // The export must read back as a valid peak table.
        let df = crate::datafile::parse_peak_table("GECO_1", &text).unwrap();
        assert_eq!(df.peaks[0].hits[0].name, "2,4-Dinitrotoluene");
    }

    #[test]
    fn matches_json_requires_consolidated_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project();

        let path = write_matches_json(&project, dir.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["project"], "ELEY");
        assert_eq!(value["matches"].as_array().unwrap().len(), 1);
        assert_eq!(value["matches"][0]["name"], "Nitroglycerin");

        project.consolidated_peaks = None;
        project.alignment = Alignment { rows: Vec::new() };
        let err = write_matches_json(&project, dir.path()).unwrap_err();
        assert!(err.to_string().contains("consolidated peaks"));
    }
}
