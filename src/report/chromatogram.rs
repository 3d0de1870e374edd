//! Stick-chromatogram report (PDF): one page per repeat.

use anyhow::{anyhow, Result};
use fs_err as fs;
use itertools::Itertools;
use printpdf::{BuiltinFont, Color, Line, Mm, PdfDocument, Point, Rgb};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::model::{Peak, Project, Repeat};

// Page geometry in mm; printpdf's `Mm` wraps an f32.
const PAGE_W: f32 = 297.0; // landscape A4
const PAGE_H: f32 = 210.0;
const MARGIN: f32 = 20.0;
const PLOT_H: f32 = PAGE_H - 2.0 * MARGIN - 15.0;
const ANNOTATED_PEAKS: usize = 5;

/// Render `<name>_chromatogram.pdf`: a stick chromatogram per repeat,
/// areas normalised to the tallest peak, the tallest peaks annotated.
pub fn write_chromatogram_report(project: &Project, out_dir: &Path) -> Result<PathBuf> {
    if project.repeats.is_empty() {
        return Err(anyhow!("project {} has no repeats to plot", project.name));
    }
    fs::create_dir_all(out_dir)?;

    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("{} chromatograms", project.name),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "chromatogram",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    for (ri, repeat) in project.repeats.iter().enumerate() {
        let layer = if ri == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "chromatogram");
            doc.get_page(p).get_layer(l)
        };
        draw_repeat(&layer, &font, &project.name, repeat);
    }

    let path = out_dir.join(format!("{}_chromatogram.pdf", project.name));
    doc.save(&mut BufWriter::new(fs::File::create(&path)?))?;
    Ok(path)
}

fn draw_repeat(
    layer: &printpdf::PdfLayerReference,
    font: &printpdf::IndirectFontRef,
    project_name: &str,
    repeat: &Repeat,
) {
    layer.use_text(
        format!("{project_name} / {}", repeat.datafile.name),
        12.0,
        Mm(MARGIN),
        Mm(PAGE_H - MARGIN + 8.0),
        font,
    );

    layer.set_outline_color(Color::Rgb(Rgb::new(0.2, 0.2, 0.2, None)));
    layer.set_outline_thickness(0.75);
    layer.add_line(frame());

    let peaks = &repeat.datafile.peaks;
    if peaks.is_empty() {
        layer.use_text("(no peaks)", 10.0, Mm(PAGE_W / 2.0 - 10.0), Mm(PAGE_H / 2.0), font);
        return;
    }

    // rt span and intensity scale for this repeat
    let rt_min = peaks.first().map(|p| p.rt).unwrap_or(0.0);
    let rt_max = peaks.last().map(|p| p.rt).unwrap_or(1.0);
    let rt_span = (rt_max - rt_min).max(1e-6);
    let max_area = peaks
        .iter()
        .map(|p| p.area)
        .fold(f64::MIN, f64::max)
        .max(1e-6);

    // Model values are f64; cast to f32 once they become page coordinates.
    let x_of = |rt: f64| MARGIN + ((rt - rt_min) / rt_span) as f32 * (PAGE_W - 2.0 * MARGIN);
    let y_of = |area: f64| MARGIN + (area / max_area) as f32 * PLOT_H;

    layer.set_outline_color(Color::Rgb(Rgb::new(0.1, 0.3, 0.7, None)));
    layer.set_outline_thickness(0.5);
    for peak in peaks {
        layer.add_line(stick(x_of(peak.rt), y_of(peak.area)));
    }

    // Annotate the tallest peaks with their winning identification.
    let tallest: Vec<&Peak> = peaks
        .iter()
        .sorted_by(|a, b| b.area.partial_cmp(&a.area).unwrap_or(std::cmp::Ordering::Equal))
        .take(ANNOTATED_PEAKS)
        .collect();
    for peak in tallest {
        let label = match peak.best_hit() {
            Some(hit) => format!("{:.2} {}", peak.rt, hit.name),
            None => format!("{:.2}", peak.rt),
        };
        layer.use_text(label, 7.0, Mm(x_of(peak.rt) + 1.0), Mm(y_of(peak.area) + 1.0), font);
    }

    // Axis captions
    layer.use_text(
        "retention time (min)",
        8.0,
        Mm(PAGE_W / 2.0 - 15.0),
        Mm(MARGIN - 8.0),
        font,
    );
    layer.use_text(format!("{rt_min:.2}"), 8.0, Mm(MARGIN), Mm(MARGIN - 5.0), font);
    layer.use_text(
        format!("{rt_max:.2}"),
        8.0,
        Mm(PAGE_W - MARGIN - 8.0),
        Mm(MARGIN - 5.0),
        font,
    );
}

fn frame() -> Line {
    let corners = [
        (MARGIN, MARGIN),
        (PAGE_W - MARGIN, MARGIN),
        (PAGE_W - MARGIN, MARGIN + PLOT_H),
        (MARGIN, MARGIN + PLOT_H),
    ];
    Line {
        points: corners
            .iter()
            .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
            .collect(),
        is_closed: true,
    }
}

fn stick(x: f32, y_top: f32) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x), Mm(MARGIN)), false),
            (Point::new(Mm(x), Mm(y_top)), false),
        ],
        is_closed: false,
    }
}
