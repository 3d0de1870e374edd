//! Retention-time alignment across repeats and consolidated-peak computation.
//!
//! Alignment pools every peak from every repeat, sorts by rt, and sweeps
//! left to right: a peak joins the open row unless it is further than the
//! tolerance from the row's first member, or the row already holds a peak
//! from the same repeat. Rows therefore come out sorted by rt and never
//! contain two peaks from one repeat.

use itertools::Itertools;
use std::collections::BTreeMap;

use crate::model::{AlignedRow, Alignment, ConsolidatedHit, ConsolidatedPeak, Repeat};

pub fn align(repeats: &[Repeat], rt_tolerance: f64) -> Alignment {
    let mut pool: Vec<(usize, usize, f64)> = Vec::new();
    for (ri, repeat) in repeats.iter().enumerate() {
        for (pi, peak) in repeat.datafile.peaks.iter().enumerate() {
            pool.push((ri, pi, peak.rt));
        }
    }
    pool.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut rows: Vec<AlignedRow> = Vec::new();
    // Open row under construction: rt of its first member, member rts, indices.
    let mut open: Option<(f64, Vec<f64>, Vec<Option<usize>>)> = None;

    for (ri, pi, rt) in pool {
        let start_new = match &open {
            None => true,
            Some((first_rt, _, indices)) => rt - first_rt > rt_tolerance || indices[ri].is_some(),
        };
        if start_new {
            if let Some(row) = open.take() {
                rows.push(finish_row(row));
            }
            open = Some((rt, Vec::new(), vec![None; repeats.len()]));
        }
        let (_, rts, indices) = open.as_mut().unwrap();
        rts.push(rt);
        indices[ri] = Some(pi);
    }
    if let Some(row) = open.take() {
        rows.push(finish_row(row));
    }

    Alignment { rows }
}

fn finish_row((_, rts, peak_indices): (f64, Vec<f64>, Vec<Option<usize>>)) -> AlignedRow {
    let rt = rts.iter().sum::<f64>() / rts.len() as f64;
    AlignedRow { rt, peak_indices }
}

/// Merge aligned rows present in at least `min_repeats` repeats.
///
/// Identification votes are pooled across the member peaks; hits whose mean
/// score falls below `min_match_score` are dropped, and rows left with no
/// qualifying hit are discarded. The winner is the most-proposed compound,
/// mean score as tie-break.
pub fn consolidate(
    repeats: &[Repeat],
    alignment: &Alignment,
    min_repeats: usize,
    min_match_score: f64,
) -> Vec<ConsolidatedPeak> {
    let mut consolidated = Vec::new();

    for row in &alignment.rows {
        if row.count() < min_repeats {
            continue;
        }

        let mut rt_sum = 0.0;
        let mut area_sum = 0.0;
        let mut votes: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
        for (ri, pi) in row.peak_indices.iter().enumerate() {
            let Some(pi) = pi else { continue };
            let peak = &repeats[ri].datafile.peaks[*pi];
            rt_sum += peak.rt;
            area_sum += peak.area;
            for hit in &peak.hits {
                let entry = votes.entry(hit.name.as_str()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += hit.score;
            }
        }

        let hits: Vec<ConsolidatedHit> = votes
            .into_iter()
            .map(|(name, (count, score_sum))| ConsolidatedHit {
                name: name.to_string(),
                score: score_sum / count as f64,
                count,
            })
            .filter(|hit| hit.score >= min_match_score)
            .sorted_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            })
            .collect();

        let Some(winner) = hits.first() else { continue };

        let count = row.count();
        consolidated.push(ConsolidatedPeak {
            rt: rt_sum / count as f64,
            area: area_sum / count as f64,
            count,
            name: winner.name.clone(),
            score: winner.score,
            hits,
        });
    }

    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompoundMatch, Datafile, Peak};

    fn repeat(name: &str, peaks: Vec<Peak>) -> Repeat {
        Repeat {
            datafile: Datafile {
                name: name.to_string(),
                peaks,
            },
        }
    }

    fn peak(rt: f64, area: f64, compound: &str, score: f64) -> Peak {
        Peak {
            rt,
            area,
            hits: vec![CompoundMatch {
                name: compound.to_string(),
                score,
            }],
        }
    }

    #[test]
    fn peaks_within_tolerance_share_a_row() {
        let repeats = vec![
            repeat("r1", vec![peak(4.50, 1200.0, "NG", 85.0)]),
            repeat("r2", vec![peak(4.55, 1100.0, "NG", 82.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        assert_eq!(alignment.rows.len(), 1);
        assert_eq!(alignment.rows[0].count(), 2);
        assert!((alignment.rows[0].rt - 4.525).abs() < 1e-9);
    }

    #[test]
    fn distant_peaks_get_separate_rows() {
        let repeats = vec![
            repeat("r1", vec![peak(4.50, 1200.0, "NG", 85.0)]),
            repeat("r2", vec![peak(5.50, 1100.0, "DPA", 82.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        assert_eq!(alignment.rows.len(), 2);
        assert!(alignment.rows[0].rt < alignment.rows[1].rt);
    }

    #[test]
    fn same_repeat_never_shares_a_row() {
        // Two peaks of one repeat closer together than the tolerance.
        let repeats = vec![
            repeat("r1", vec![peak(4.50, 100.0, "A", 80.0), peak(4.55, 200.0, "B", 80.0)]),
            repeat("r2", vec![peak(4.52, 150.0, "A", 80.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        assert_eq!(alignment.rows.len(), 2);
        assert_eq!(alignment.rows[0].peak_indices[0], Some(0));
        assert_eq!(alignment.rows[1].peak_indices[0], Some(1));
        // r2's peak lands in the first (earlier) row.
        assert_eq!(alignment.rows[0].peak_indices[1], Some(0));
    }

    #[test]
    fn consolidation_honours_min_repeats() {
        let repeats = vec![
            repeat("r1", vec![peak(4.50, 1200.0, "NG", 85.0), peak(9.0, 50.0, "X", 90.0)]),
            repeat("r2", vec![peak(4.55, 1100.0, "NG", 82.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        let peaks = consolidate(&repeats, &alignment, 2, 60.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].name, "NG");
        assert_eq!(peaks[0].count, 2);
        assert!((peaks[0].score - 83.5).abs() < 1e-9);
        assert!((peaks[0].area - 1150.0).abs() < 1e-9);

        let all = consolidate(&repeats, &alignment, 1, 60.0);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn consolidation_drops_low_scoring_hits() {
        let repeats = vec![
            repeat("r1", vec![peak(4.50, 1200.0, "NG", 55.0)]),
            repeat("r2", vec![peak(4.55, 1100.0, "NG", 50.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        assert!(consolidate(&repeats, &alignment, 2, 60.0).is_empty());
    }

    #[test]
    fn winner_is_most_proposed_compound() {
        let mut p1 = peak(4.50, 1200.0, "NG", 70.0);
        p1.hits.push(CompoundMatch {
            name: "DPA".into(),
            score: 99.0,
        });
        let repeats = vec![
            repeat("r1", vec![p1]),
            repeat("r2", vec![peak(4.55, 1100.0, "NG", 72.0)]),
        ];
        let alignment = align(&repeats, 0.2);
        let peaks = consolidate(&repeats, &alignment, 2, 60.0);
        // NG proposed twice beats DPA's single higher-scoring vote.
        assert_eq!(peaks[0].name, "NG");
        assert_eq!(peaks[0].hits.len(), 2);
        assert_eq!(peaks[0].hits[1].name, "DPA");
    }
}
