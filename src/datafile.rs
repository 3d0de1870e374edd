//! Peak-table CSV parsing.
//!
//! Datafiles are peak tables exported from the instrument software:
//! a `rt,area,compound,score` header, then one row per library hit.
//! Consecutive rows with identical rt and area belong to the same peak.

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use fs_err as fs;
use std::path::Path;

use crate::model::{CompoundMatch, Datafile, Peak};

/// Read and parse a peak-table CSV. The datafile name is the file stem.
pub fn read_datafile(path: &Path) -> Result<Datafile> {
    let text = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("datafile has no usable name: {}", path.display()))?;
    parse_peak_table(name, &text).with_context(|| format!("in datafile {}", path.display()))
}

pub fn parse_peak_table(name: &str, text: &str) -> Result<Datafile> {
    let mut peaks: Vec<Peak> = Vec::new();

    if !text.trim().is_empty() {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader.headers().context("unreadable header")?;
        if headers.get(0) != Some("rt") {
            return Err(anyhow!(
                "expected a 'rt,area,compound,score' header, got {headers:?}"
            ));
        }

        for record in reader.records() {
            let record = record?;
            let lineno = record.position().map_or(0, |p| p.line());
            let (rt, area, hit) =
                parse_record(&record).with_context(|| format!("line {lineno}"))?;

            // Same rt & area as the previous row: another hit for the same peak.
            match peaks.last_mut() {
                Some(last) if last.rt == rt && last.area == area => last.hits.push(hit),
                _ => peaks.push(Peak {
                    rt,
                    area,
                    hits: vec![hit],
                }),
            }
        }
    }

    peaks.sort_by(|a, b| a.rt.partial_cmp(&b.rt).unwrap_or(std::cmp::Ordering::Equal));
    Ok(Datafile {
        name: name.to_string(),
        peaks,
    })
}

fn parse_record(record: &StringRecord) -> Result<(f64, f64, CompoundMatch)> {
    let field = |i: usize, what: &str| {
        record
            .get(i)
            .ok_or_else(|| anyhow!("missing {what} field"))
    };
    let rt: f64 = field(0, "rt")?.parse().context("bad rt")?;
    let area: f64 = field(1, "area")?.parse().context("bad area")?;
    let name = field(2, "compound")?.to_string();
    let score: f64 = field(3, "score")?.parse().context("bad score")?;

    Ok((rt, area, CompoundMatch { name, score }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_hits_by_peak() {
        let table = "rt,area,compound,score\n\
                     4.50,1200.0,Nitroglycerin,85.0\n\
                     4.50,1200.0,2-Nitrodiphenylamine,62.0\n\
                     7.80,900.0,Diphenylamine,91.0\n";
        let df = parse_peak_table("ELEY_1", table).unwrap();
        assert_eq!(df.name, "ELEY_1");
        assert_eq!(df.peaks.len(), 2);
        assert_eq!(df.peaks[0].hits.len(), 2);
        assert_eq!(df.peaks[0].best_hit().unwrap().name, "Nitroglycerin");
        assert_eq!(df.peaks[1].hits.len(), 1);
    }

    #[test]
    fn quoted_compound_names_are_unquoted() {
        let table = "rt,area,compound,score\n\
                     6.10,450.0,\"2,4-Dinitrotoluene\",78.5\n";
        let df = parse_peak_table("x", table).unwrap();
        assert_eq!(df.peaks[0].hits[0].name, "2,4-Dinitrotoluene");
        assert_eq!(df.peaks[0].hits[0].score, 78.5);
    }

    #[test]
    fn quoting_does_not_split_identifications() {
        // The same compound quoted in one repeat and bare in another must
        // pool into a single consolidated hit, not two rival ones.
        let quoted = parse_peak_table(
            "r1",
            "rt,area,compound,score\n6.10,450.0,\"2,4-Dinitrotoluene\",78.5\n",
        )
        .unwrap();
        let bare = parse_peak_table(
            "r2",
            "rt,area,compound,score\n6.12,460.0,2,4-Dinitrotoluene,80.0\n",
        );
        // Bare commas change the field count, so the bare spelling must be quoted.
        assert!(bare.is_err());
        let bare = parse_peak_table(
            "r2",
            "rt,area,compound,score\n6.12,460.0,\"2,4-Dinitrotoluene\",80.0\n",
        )
        .unwrap();
        assert_eq!(quoted.peaks[0].hits[0].name, bare.peaks[0].hits[0].name);

        let repeats = vec![
            crate::model::Repeat { datafile: quoted },
            crate::model::Repeat { datafile: bare },
        ];
        let alignment = crate::align::align(&repeats, 0.2);
        let peaks = crate::align::consolidate(&repeats, &alignment, 2, 60.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].name, "2,4-Dinitrotoluene");
        assert_eq!(peaks[0].hits.len(), 1);
        assert_eq!(peaks[0].hits[0].count, 2);
    }

    #[test]
    fn peaks_sorted_by_rt() {
        let table = "rt,area,compound,score\n\
                     7.80,900.0,Diphenylamine,91.0\n\
                     4.50,1200.0,Nitroglycerin,85.0\n";
        let df = parse_peak_table("x", table).unwrap();
        assert!(df.peaks[0].rt < df.peaks[1].rt);
    }

    #[test]
    fn header_only_is_empty() {
        let df = parse_peak_table("x", "rt,area,compound,score\n").unwrap();
        assert!(df.peaks.is_empty());
    }

    #[test]
    fn empty_file_is_empty() {
        let df = parse_peak_table("x", "").unwrap();
        assert!(df.peaks.is_empty());
    }

    #[test]
    fn rejects_bad_header_and_bad_fields() {
        assert!(parse_peak_table("x", "time,height\n").is_err());
        assert!(parse_peak_table("x", "rt,area,compound,score\nabc,1.0,Foo,50.0\n").is_err());
        assert!(parse_peak_table("x", "rt,area,compound,score\n1.0,2.0,Foo\n").is_err());
    }
}
