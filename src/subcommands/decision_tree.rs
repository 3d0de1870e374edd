//! `gunshotmatch decision-tree` — train a classifier on the saved projects
//! and predict the class of an unknown sample.

use anyhow::Result;
use clap::Args;
use fs_err as fs;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use crate::classifier::{
    self, Classifier, DecisionTree, RandomForest, TreeParams, RANDOM_STATE,
};
use crate::config::{project_plural, Projects, UnknownSettings};
use crate::pipeline;

#[derive(Args, Debug)]
pub struct CmdDecisionTree {
    /// Projects TOML with the training data
    #[arg(short = 'p', long = "projects", default_value = "projects.toml")]
    pub projects_toml: PathBuf,

    /// Unknown-sample TOML to predict
    #[arg(short = 'u', long = "unknown", default_value = "unknown.toml")]
    pub unknown_toml: PathBuf,

    /// Train the classifier without predicting an unknown
    #[arg(short = 't', long)]
    pub train_only: bool,

    /// Train a random forest (the default)
    #[arg(short = 'r', long)]
    pub random_forest: bool,

    /// Train a single decision tree instead of a forest
    #[arg(long, conflicts_with = "random_forest")]
    pub no_random_forest: bool,
}

impl CmdDecisionTree {
    pub fn run(self) -> Result<()> {
        let settings = Projects::load(&self.projects_toml)?;
        let output_dir = settings.global.resolved_output_directory()?;

        println!(
            "Training decision tree on {} {}:",
            settings.len(),
            project_plural(settings.len())
        );
        for (name, _) in settings.iter() {
            println!("  {name}");
        }

        let projects = pipeline::process_projects(&settings, &output_dir, false)?;
        let (data, factorize_map) = classifier::data_from_projects(&projects)?;
        fs::write(
            output_dir.join("decision_tree_data.csv"),
            data.to_csv(&factorize_map)?,
        )?;

        // -r is the default; --no-random-forest selects a single tree.
        let use_forest = self.random_forest || !self.no_random_forest;
        let clf = if !use_forest {
            let mut rng = StdRng::seed_from_u64(RANDOM_STATE);
            let tree = DecisionTree::fit(&data, factorize_map.len(), TreeParams::default(), &mut rng);
            let trees_dir = output_dir.join("trees");
            fs::create_dir_all(&trees_dir)?;
            fs::write(
                trees_dir.join("decision_tree.dot"),
                tree.to_dot(&data.feature_names, &factorize_map),
            )?;
            Classifier::Tree(tree)
        } else {
            Classifier::Forest(RandomForest::fit(&data, factorize_map.len(), RANDOM_STATE))
        };

        if self.train_only {
            log::info!("training complete; skipping prediction");
            return Ok(());
        }

        let unknown = UnknownSettings::load(&self.unknown_toml)?;
        let unknown_dir = unknown.resolved_output_directory()?;

        println!("\nPredicting class for unknown {}", unknown.name);

        let unknown_project = pipeline::process_unknown(&unknown, &unknown_dir, false)?;
        let sample = classifier::data_from_unknown(&unknown_project, &data.feature_names)?;
        let proba = clf.predict_proba(&sample);

        for (idx, (propellant, probability)) in
            classifier::ranked_classes(&proba, &factorize_map).iter().enumerate()
        {
            println!("{} {} {}", idx + 1, probability, propellant);
        }
        Ok(())
    }
}
