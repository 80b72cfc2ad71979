//! Report files of a ranking run.
//!
//! ```text
//! <output>/<strategy id>/
//!   results.csv          every evaluated gene, ascending p-value
//!   results_log_rank/    step charts of the top genes by p-value
//!   results_fdr/         step charts of the top genes by FDR
//!   summary.json         run metadata
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use kmrank_analysis::{
    result::{GeneResult, RankedResults},
    runner::{GeneFailure, SkippedGene},
};
use serde::Serialize;

use crate::util::{self, Output};

/// One row of a two-cohort Kaplan-Meier step chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepRow {
    pub time: i64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedGene {
    pub gene: String,
    pub error: String,
}

impl From<&GeneFailure> for FailedGene {
    fn from(failure: &GeneFailure) -> Self {
        Self {
            gene: failure.gene_id.to_string(),
            error: failure.error.to_string(),
        }
    }
}

/// Metadata written to `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub strategy: String,
    pub patients_file: PathBuf,
    pub genes_file: PathBuf,
    pub patients: usize,
    pub genes: usize,
    pub evaluated: usize,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedGene>,
    pub min_cohort_size: usize,
    pub top: usize,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn skipped_ids(skipped: &[SkippedGene]) -> Vec<String> {
        skipped.iter().map(|s| s.gene_id.to_string()).collect()
    }
}

pub struct ReportWriter {
    dir: PathBuf,
    top: usize,
}

impl ReportWriter {
    /// Prepares `<output>/<strategy id>/`, replacing a previous report.
    pub fn create(output: &Path, strategy_id: &str, top: usize) -> anyhow::Result<Self> {
        let dir = output.join(util::sanitize_file_name(strategy_id));
        if dir.exists() {
            tracing::warn!(dir = %dir.display(), "replacing existing report directory");
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove directory: {}", dir.display()))?;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(Self { dir, top })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, ranked: &RankedResults, summary: &RunSummary) -> anyhow::Result<()> {
        self.write_results(ranked)?;
        self.write_step_charts(
            "results_log_rank",
            ranked.by_p_value().iter(),
            GeneResult::neg_log10_p_value,
        )?;
        self.write_step_charts("results_fdr", ranked.by_fdr().into_iter(), |result| {
            result.fdr().unwrap_or(f64::NAN)
        })?;

        let path = self.dir.join("summary.json");
        Output::create(path)?.write_json(summary)?;
        Ok(())
    }

    fn write_results(&self, ranked: &RankedResults) -> anyhow::Result<()> {
        let path = self.dir.join("results.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record([
            "gene",
            "p_value",
            "neg_log10_p_value",
            "fdr",
            "group_size",
            "low_median_survival",
            "high_median_survival",
        ])?;
        let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        for result in ranked.by_p_value() {
            writer
                .write_record([
                    result.gene_id.to_string(),
                    format!("{:.6e}", result.p_value()),
                    result.neg_log10_p_value().to_string(),
                    optional(result.fdr()),
                    result.group_size.to_string(),
                    optional(result.low.median_survival),
                    optional(result.high.median_survival),
                ])
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(())
    }

    fn write_step_charts<'r, I, S>(&self, name: &str, results: I, score: S) -> anyhow::Result<()>
    where
        I: Iterator<Item = &'r GeneResult>,
        S: Fn(&GeneResult) -> f64,
    {
        let dir = self.dir.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        for (rank, result) in results.take(self.top).enumerate() {
            let path = dir.join(chart_file_name(rank + 1, &result.gene_id, score(result)));
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            for row in step_chart(result) {
                writer
                    .serialize(row)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", path.display()))?;
        }
        Ok(())
    }
}

/// File name of a step chart: rank, gene and the score the ranking is based on.
pub fn chart_file_name(rank: usize, gene_id: &str, score: f64) -> String {
    let name = format!("{rank:03}_{gene_id}_{score:.5}.csv");
    util::sanitize_file_name(&name)
}

/// Step chart of both cohort curves of a gene.
///
/// The chart starts one time unit before the first observation with both
/// probabilities at 1. Every failure time adds two rows, the probabilities
/// just before and just after the drop, so that plotting the rows as lines
/// draws the Kaplan-Meier steps.
pub fn step_chart(result: &GeneResult) -> Vec<StepRow> {
    let (low, high) = (&result.low.curve, &result.high.curve);
    let first = low
        .points()
        .first()
        .into_iter()
        .chain(high.points().first())
        .map(|p| p.time)
        .min();
    let Some(first) = first else {
        return vec![];
    };

    let mut prev = StepRow {
        time: i64::from(first) - 1,
        low: 1.0,
        high: 1.0,
    };
    let mut rows = vec![prev];
    for event in result.log_rank.merged_events() {
        let time = i64::from(event.time);
        rows.push(StepRow { time, ..prev });
        prev = StepRow {
            time,
            low: low.survival_at(event.time),
            high: high.survival_at(event.time),
        };
        rows.push(prev);
    }
    rows
}
