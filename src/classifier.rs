//! Decision-tree and random-forest classifiers over consolidated peak areas.
//!
//! Features are the compounds identified across the training projects'
//! consolidated peaks; each repeat becomes one row of area fractions.
//! Trees are CART with Gini impurity; the forest bootstraps rows and
//! subsamples features per split, training in parallel with a fixed seed
//! so repeated runs produce identical models.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::model::{Project, Repeat};

/// Fixed seed so repeated runs train identical models.
pub const RANDOM_STATE: u64 = 20231020;

/// Trees in a random forest.
pub const N_TREES: usize = 100;

#[derive(Debug, Clone)]
pub struct TrainingData {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl TrainingData {
    /// CSV rendering of the training matrix (class name last).
    pub fn to_csv(&self, class_names: &[String]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        header.push("class");
        writer.write_record(&header)?;
        for (row, label) in self.rows.iter().zip(&self.labels) {
            let mut record: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            record.push(class_names[*label].clone());
            writer.write_record(&record)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Build the training matrix from processed projects.
///
/// Returns the data and the factorize map (class index -> project name).
pub fn data_from_projects(projects: &[Project]) -> Result<(TrainingData, Vec<String>)> {
    let mut feature_set: BTreeSet<&str> = BTreeSet::new();
    for project in projects {
        let peaks = project.consolidated_peaks.as_ref().ok_or_else(|| {
            anyhow!("consolidated peaks have not been computed for {}", project.name)
        })?;
        for peak in peaks {
            feature_set.insert(&peak.name);
        }
    }
    if feature_set.is_empty() {
        return Err(anyhow!("no consolidated peaks across the training projects"));
    }
    let feature_names: Vec<String> = feature_set.into_iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    let mut factorize_map = Vec::with_capacity(projects.len());
    for (class, project) in projects.iter().enumerate() {
        factorize_map.push(project.name.clone());
        for repeat in &project.repeats {
            rows.push(featurise(repeat, &feature_names));
            labels.push(class);
        }
    }

    Ok((
        TrainingData {
            feature_names,
            rows,
            labels,
        },
        factorize_map,
    ))
}

/// Featurise an unknown sample against the training feature names.
/// Compounds unseen in training are ignored.
pub fn data_from_unknown(project: &Project, feature_names: &[String]) -> Result<Vec<f64>> {
    let repeat = project
        .repeats
        .first()
        .ok_or_else(|| anyhow!("unknown sample {} has no datafile", project.name))?;
    Ok(featurise(repeat, feature_names))
}

/// Area fraction per compound: sum the areas of peaks whose best hit is the
/// compound, then normalise the row to sum to 1 (blank repeats stay zero).
fn featurise(repeat: &Repeat, feature_names: &[String]) -> Vec<f64> {
    let positions: BTreeMap<&str, usize> = feature_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut row = vec![0.0; feature_names.len()];
    for peak in &repeat.datafile.peaks {
        if let Some(hit) = peak.best_hit() {
            if let Some(&i) = positions.get(hit.name.as_str()) {
                row[i] += peak.area;
            }
        }
    }
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        for value in &mut row {
            *value /= total;
        }
    }
    row
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features considered per split; None = all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 24,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    pub fn fit(data: &TrainingData, n_classes: usize, params: TreeParams, rng: &mut StdRng) -> Self {
        let indices: Vec<usize> = (0..data.rows.len()).collect();
        Self::fit_indices(data, &indices, n_classes, params, rng)
    }

    /// Fit on an explicit multiset of row indices (bootstrap support).
    pub fn fit_indices(
        data: &TrainingData,
        indices: &[usize],
        n_classes: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let root = grow(data, indices, n_classes, params, 0, rng);
        Self { root }
    }

    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { proba } => return proba.clone(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    /// Graphviz rendering of the fitted tree.
    pub fn to_dot(&self, feature_names: &[String], class_names: &[String]) -> String {
        let mut dot = String::from("digraph decision_tree {\n  node [shape=box];\n");
        let mut next_id = 0usize;
        render_dot(&self.root, feature_names, class_names, &mut dot, &mut next_id);
        dot.push_str("}\n");
        dot
    }
}

fn render_dot(
    node: &Node,
    feature_names: &[String],
    class_names: &[String],
    dot: &mut String,
    next_id: &mut usize,
) -> usize {
    let id = *next_id;
    *next_id += 1;
    match node {
        Node::Leaf { proba } => {
            let winner = proba
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| class_names[i].as_str())
                .unwrap_or("?");
            let _ = writeln!(dot, "  n{id} [label=\"{winner}\"];");
        }
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let _ = writeln!(
                dot,
                "  n{id} [label=\"{} <= {threshold:.4}\"];",
                feature_names[*feature]
            );
            let l = render_dot(left, feature_names, class_names, dot, next_id);
            let r = render_dot(right, feature_names, class_names, dot, next_id);
            let _ = writeln!(dot, "  n{id} -> n{l} [label=\"yes\"];");
            let _ = writeln!(dot, "  n{id} -> n{r} [label=\"no\"];");
        }
    }
    id
}

fn class_counts(data: &TrainingData, indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[data.labels[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize]) -> Node {
    let total: usize = counts.iter().sum();
    let proba = if total == 0 {
        vec![0.0; counts.len()]
    } else {
        counts.iter().map(|&c| c as f64 / total as f64).collect()
    };
    Node::Leaf { proba }
}

fn grow(
    data: &TrainingData,
    indices: &[usize],
    n_classes: usize,
    params: TreeParams,
    depth: usize,
    rng: &mut StdRng,
) -> Node {
    let counts = class_counts(data, indices, n_classes);
    let impurity = gini(&counts);
    if impurity == 0.0 || indices.len() < params.min_samples_split || depth >= params.max_depth {
        return leaf(&counts);
    }

    let n_features = data.feature_names.len();
    let candidates: Vec<usize> = match params.max_features {
        Some(k) if k < n_features => rand::seq::index::sample(rng, n_features, k).into_vec(),
        _ => (0..n_features).collect(),
    };

    let mut best: Option<(f64, usize, f64)> = None; // (weighted impurity, feature, threshold)
    for &feature in &candidates {
        let mut values: Vec<f64> = indices.iter().map(|&i| data.rows[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (mut left, mut right) = (vec![0usize; n_classes], vec![0usize; n_classes]);
            for &i in indices {
                if data.rows[i][feature] <= threshold {
                    left[data.labels[i]] += 1;
                } else {
                    right[data.labels[i]] += 1;
                }
            }
            let nl: usize = left.iter().sum();
            let nr: usize = right.iter().sum();
            if nl == 0 || nr == 0 {
                continue;
            }
            let weighted = (nl as f64 * gini(&left) + nr as f64 * gini(&right))
                / indices.len() as f64;
            if best.map_or(true, |(b, _, _)| weighted < b) {
                best = Some((weighted, feature, threshold));
            }
        }
    }

    let Some((weighted, feature, threshold)) = best else {
        return leaf(&counts);
    };
    if weighted >= impurity {
        return leaf(&counts);
    }

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| data.rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, &left_idx, n_classes, params, depth + 1, rng)),
        right: Box::new(grow(data, &right_idx, n_classes, params, depth + 1, rng)),
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_classes: usize,
}

impl RandomForest {
    pub fn fit(data: &TrainingData, n_classes: usize, seed: u64) -> Self {
        let n_features = data.feature_names.len();
        let max_features = (n_features as f64).sqrt().ceil() as usize;
        let params = TreeParams {
            max_features: Some(max_features.max(1)),
            ..TreeParams::default()
        };

        let trees: Vec<DecisionTree> = (0..N_TREES)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let n = data.rows.len();
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit_indices(data, &bootstrap, n_classes, params, &mut rng)
            })
            .collect();

        Self { trees, n_classes }
    }

    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(sample)) {
                *acc += p;
            }
        }
        for p in &mut proba {
            *p /= self.trees.len() as f64;
        }
        proba
    }
}

/// Either classifier behind one `predict_proba`.
pub enum Classifier {
    Tree(DecisionTree),
    Forest(RandomForest),
}

impl Classifier {
    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        match self {
            Classifier::Tree(tree) => tree.predict_proba(sample),
            Classifier::Forest(forest) => forest.predict_proba(sample),
        }
    }
}

/// Classes ranked by descending probability, strictly-positive entries only.
/// The sort is stable, so equal probabilities keep their class order.
pub fn ranked_classes(proba: &[f64], class_names: &[String]) -> Vec<(String, f64)> {
    let mut order: Vec<usize> = (0..proba.len()).collect();
    order.sort_by(|&a, &b| {
        proba[b]
            .partial_cmp(&proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
        .into_iter()
        .filter(|&i| proba[i] > 0.0)
        .map(|i| (class_names[i].clone(), proba[i]))
        .collect()
}
