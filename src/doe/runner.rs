use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::config::DoeConfig;
use super::export::{export_clusters_csv, export_doe_summary, export_table_csv};
use super::sampler::CorrelatedSampler;
use super::scenario::Scenario;
use crate::dedup::{filter, FeatureTable, FilterOutcome, ScaleMode};
use crate::error::Result;
use crate::io::save_scenarios;
use crate::stats::pearson;

/// Headline numbers of a finished study, written to `DOE_Summary.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySummary {
    pub study_name: String,
    pub analysis: String,
    pub n_parameters: usize,
    pub n_scenarios: usize,
    pub n_kept: usize,
    pub n_removed: usize,
    pub n_clusters: usize,
    pub eps: Option<f64>,
    pub scale: Option<ScaleMode>,
    /// Largest |target - realized| over the requested correlations.
    pub max_rho_error: Option<f64>,
}

/// Target vs. realized correlation of one requested pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedCorrelation {
    pub first: String,
    pub second: String,
    pub target: f64,
    pub realized: f64,
}

/// Sample -> flatten -> deduplicate -> export, for one study configuration.
pub struct DoeRunner {
    config: DoeConfig,
    output_dir: PathBuf,
}

impl DoeRunner {
    pub fn new(config: DoeConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self { config, output_dir: output_dir.into() }
    }

    pub fn config(&self) -> &DoeConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Draw the configured number of scenarios.
    pub fn sample(&self) -> Result<Vec<Scenario>> {
        let params = self.config.parameter_set()?;
        let correlations = self.config.correlation_spec();
        let mut sampler = CorrelatedSampler::new(&params).with_correlations(&correlations);
        if let Some(seed) = self.config.seed {
            sampler = sampler.with_seed(seed);
        }
        sampler.sample(self.config.n_scenarios, &self.config.analysis)
    }

    /// Realized Pearson correlation of every requested pair in `table`.
    pub fn realized_correlations(&self, table: &FeatureTable) -> Vec<RealizedCorrelation> {
        self.config
            .correlation_spec()
            .entries()
            .iter()
            .filter_map(|entry| {
                let a = table.column_index(&entry.first)?;
                let b = table.column_index(&entry.second)?;
                let xs: Vec<f64> = table.column_values(a).collect();
                let ys: Vec<f64> = table.column_values(b).collect();
                Some(RealizedCorrelation {
                    first: entry.first.clone(),
                    second: entry.second.clone(),
                    target: entry.rho,
                    realized: pearson(&xs, &ys),
                })
            })
            .collect()
    }

    /// Run the whole study and write every artifact into the output directory.
    pub fn run_all(&self) -> Result<StudySummary> {
        std::fs::create_dir_all(&self.output_dir)?;
        tracing::info!(study = %self.config.study_name, n = self.config.n_scenarios, "starting DOE study");

        let scenarios = self.sample()?;
        save_scenarios(self.output_dir.join("scenarios.json"), &scenarios)?;
        println!("✓ Sampled {} scenarios", scenarios.len());

        let table = FeatureTable::from_scenarios(&scenarios);
        let realized = self.realized_correlations(&table);
        for r in &realized {
            println!("  ρ({}, {}) target {:+.3} realized {:+.3}", r.first, r.second, r.target, r.realized);
        }
        let max_rho_error = realized
            .iter()
            .map(|r| (r.target - r.realized).abs())
            .filter(|e| !e.is_nan())
            .reduce(f64::max);

        let mut summary = StudySummary {
            study_name: self.config.study_name.clone(),
            analysis: self.config.analysis.clone(),
            n_parameters: self.config.parameters.len(),
            n_scenarios: scenarios.len(),
            n_kept: scenarios.len(),
            n_removed: 0,
            n_clusters: 0,
            eps: None,
            scale: None,
            max_rho_error,
        };

        match &self.config.filter {
            Some(options) => {
                let outcome = filter(&table, options)?;
                self.write_filtered(&scenarios, &table, &outcome)?;
                println!(
                    "✓ Deduplicated: kept {}, removed {} (eps = {}, {})",
                    outcome.kept.len(),
                    outcome.removed.len(),
                    options.eps,
                    options.scale
                );
                summary.n_kept = outcome.kept.len();
                summary.n_removed = outcome.removed.len();
                summary.n_clusters = outcome.clusters.len();
                summary.eps = Some(options.eps);
                summary.scale = Some(options.scale);
            }
            None => export_table_csv(&table, self.output_dir.join("features.csv"))?,
        }

        export_doe_summary(&summary, &self.output_dir)?;
        tracing::info!(
            kept = summary.n_kept,
            removed = summary.n_removed,
            "DOE study finished"
        );
        Ok(summary)
    }

    fn write_filtered(&self, scenarios: &[Scenario], table: &FeatureTable, outcome: &FilterOutcome) -> Result<()> {
        // Table ids are batch positions.
        let kept: Vec<Scenario> = outcome.kept.iter().map(|id| scenarios[id.0].clone()).collect();
        save_scenarios(self.output_dir.join("scenarios_filtered.json"), &kept)?;
        export_table_csv(&outcome.table, self.output_dir.join("features.csv"))?;

        let kept_ids: HashSet<_> = outcome.kept.iter().copied().collect();
        let representatives: Vec<usize> = outcome
            .clusters
            .iter()
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .find(|&i| kept_ids.contains(&table.id(i)))
                    .unwrap_or(members[0])
            })
            .collect();
        export_clusters_csv(table, &outcome.clusters, &representatives, self.output_dir.join("clusters.csv"))
    }

    /// Print the parameters and correlations of the study
    pub fn list_parameters(&self) {
        println!("\n╔══════════════════════════════════════════╗");
        println!("║  DOE Study: {}  ", self.config.study_name);
        println!("╚══════════════════════════════════════════╝\n");

        println!("Analysis: {}", self.config.analysis);
        println!("Scenarios: {}", self.config.n_scenarios);
        match self.config.seed {
            Some(seed) => println!("Seed: {}", seed),
            None => println!("Seed: (random)"),
        }
        println!("\nParameters ({}):", self.config.parameters.len());
        for (idx, p) in self.config.parameters.iter().enumerate() {
            println!("  [{}] {:<20} [{}, {}]", idx + 1, p.name, p.lower, p.upper);
        }
        if !self.config.correlations.is_empty() {
            println!("\nCorrelations:");
            for c in &self.config.correlations {
                println!("  {} ~ {}: {:+.3}", c.first, c.second, c.rho);
            }
        }
        if let Some(f) = &self.config.filter {
            println!("\nFilter: eps = {}, scale = {}, keep = {}", f.eps, f.scale, f.keep);
        }
        println!();
    }
}
