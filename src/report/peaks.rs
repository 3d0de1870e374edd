//! Consolidated-peak table report (PDF).

use anyhow::{anyhow, Result};
use fs_err as fs;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::model::Project;

// Page geometry in mm; printpdf's `Mm` wraps an f32.
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_H: f32 = 6.0;

/// Render `<name>_peaks.pdf`: one table row per consolidated peak, paginated.
pub fn write_peak_report(project: &Project, out_dir: &Path) -> Result<PathBuf> {
    let peaks = project
        .consolidated_peaks
        .as_ref()
        .ok_or_else(|| anyhow!("consolidated peaks have not been computed for {}", project.name))?;
    fs::create_dir_all(out_dir)?;

    let (doc, page, layer) = PdfDocument::new(
        format!("{} consolidated peaks", project.name),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "peaks",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_H - MARGIN;

    let header = |layer: &printpdf::PdfLayerReference, y: f32, bold: &IndirectFontRef| {
        layer.use_text(
            format!("{} - consolidated peaks", project.name),
            12.0,
            Mm(MARGIN),
            Mm(y),
            bold,
        );
        layer.use_text(
            "#      rt (min)    mean area      n    compound (score)",
            9.0,
            Mm(MARGIN),
            Mm(y - 2.0 * LINE_H),
            bold,
        );
    };

    header(&current, y, &bold);
    y -= 3.0 * LINE_H;

    for (idx, peak) in peaks.iter().enumerate() {
        if y < MARGIN + LINE_H {
            let (p, l) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "peaks");
            current = doc.get_page(p).get_layer(l);
            y = PAGE_H - MARGIN;
            header(&current, y, &bold);
            y -= 3.0 * LINE_H;
        }
        let line = format!(
            "{:<5}  {:>8.3}  {:>11.1}  {:>3}    {} ({:.1})",
            idx + 1,
            peak.rt,
            peak.area,
            peak.count,
            peak.name,
            peak.score
        );
        current.use_text(line, 9.0, Mm(MARGIN), Mm(y), &font);
        y -= LINE_H;
    }

    let path = out_dir.join(format!("{}_peaks.pdf", project.name));
    doc.save(&mut BufWriter::new(fs::File::create(&path)?))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, ConsolidatedHit, ConsolidatedPeak};

    fn project(n_peaks: usize) -> Project {
        let peaks = (0..n_peaks)
            .map(|i| ConsolidatedPeak {
                rt: 4.0 + i as f64 * 0.1,
                area: 1000.0 + i as f64,
                count: 2,
                name: format!("Compound {i}"),
                score: 80.0,
                hits: vec![ConsolidatedHit {
                    name: format!("Compound {i}"),
                    score: 80.0,
                    count: 2,
                }],
            })
            .collect();
        Project {
            name: "ELEY".to_string(),
            repeats: Vec::new(),
            alignment: Alignment { rows: Vec::new() },
            consolidated_peaks: Some(peaks),
        }
    }

    #[test]
    fn writes_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_peak_report(&project(3), dir.path()).unwrap();
        assert!(path.ends_with("ELEY_peaks.pdf"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_tables_paginate() {
        let dir = tempfile::tempdir().unwrap();
        // More rows than fit on one page; must not panic or truncate the file.
        let path = write_peak_report(&project(120), dir.path()).unwrap();
        assert!(fs::read(&path).unwrap().len() > 1000);
    }

    #[test]
    fn requires_consolidated_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(1);
        project.consolidated_peaks = None;
        assert!(write_peak_report(&project, dir.path()).is_err());
    }
}
