//! Gene ranking command
//!
//! Splits the patients of every gene into low and high expression cohorts,
//! compares their survival with a log-rank test and writes the ranked genes
//! with their step charts.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, ValueEnum};
use kmrank_analysis::{
    patient::PatientLookup,
    runner::{DEFAULT_MIN_COHORT_SIZE, GeneEvaluationRunner, RunnerConfig},
    split::{CohortSplitter as _, ExpressionMeasure, TopNPercentSplit},
};

use crate::io::{
    genes,
    patients::{self, PatientColumns},
    report::{FailedGene, ReportWriter, RunSummary},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MeasureArg {
    /// Expression before treatment
    Before,
    /// Expression after treatment
    After,
    /// Absolute difference between both measurements
    Diff,
}

impl From<MeasureArg> for ExpressionMeasure {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Before => ExpressionMeasure::Before,
            MeasureArg::After => ExpressionMeasure::After,
            MeasureArg::Diff => ExpressionMeasure::AbsoluteDifference,
        }
    }
}

/// Header names of the patient file columns.
#[derive(Debug, Clone, Args)]
pub(crate) struct PatientColumnArgs {
    /// Column holding the patient id
    #[arg(long, default_value = "patient_id")]
    pub id_column: String,

    /// Column holding the event flag (1/0, death/censored, true/false)
    #[arg(long, default_value = "event")]
    pub event_column: String,

    /// Column holding the follow-up time
    #[arg(long, default_value = "time")]
    pub time_column: String,
}

impl From<&PatientColumnArgs> for PatientColumns {
    fn from(args: &PatientColumnArgs) -> Self {
        Self {
            id: args.id_column.clone(),
            event: args.event_column.clone(),
            time: args.time_column.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct RankArg {
    /// Patient survival file (CSV, or TSV by extension)
    #[arg(long)]
    pub patients: PathBuf,

    /// Gene expression matrix (CSV)
    #[arg(long)]
    pub genes: PathBuf,

    /// Expression measure used to rank the patients of a gene
    #[arg(long, value_enum)]
    pub measure: MeasureArg,

    /// Percentage of patients in each cohort (1-50)
    #[arg(long)]
    pub percent: u32,

    /// Directory the report directory is created in
    #[arg(long, default_value = ".")]
    pub output: PathBuf,

    /// Number of genes with step charts per ranking
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Skip genes whose smaller cohort has fewer patients
    #[arg(long, default_value_t = DEFAULT_MIN_COHORT_SIZE)]
    pub min_cohort_size: usize,

    #[clap(flatten)]
    pub columns: PatientColumnArgs,
}

pub(crate) fn run(arg: &RankArg) -> anyhow::Result<()> {
    let patients = patients::read_patients_file(&arg.patients, &(&arg.columns).into())?;
    let patients = PatientLookup::new(patients)
        .with_context(|| format!("Invalid patients file: {}", arg.patients.display()))?;

    // reject a bad configuration before reading the (large) gene file
    let split = TopNPercentSplit::new(arg.percent, arg.measure.into(), &patients)?;
    let config = RunnerConfig {
        min_cohort_size: arg.min_cohort_size,
        threads: arg.threads,
    };
    let runner = GeneEvaluationRunner::new(&split, config)?;

    let genes = genes::read_genes_file(&arg.genes)?;
    let output = runner.run(&genes)?;

    let summary = RunSummary {
        strategy: split.id(),
        patients_file: arg.patients.clone(),
        genes_file: arg.genes.clone(),
        patients: patients.len(),
        genes: genes.len(),
        evaluated: output.results.len(),
        skipped: RunSummary::skipped_ids(&output.skipped),
        failed: output.failures.iter().map(FailedGene::from).collect(),
        min_cohort_size: arg.min_cohort_size,
        top: arg.top,
        generated_at: Utc::now(),
    };
    let ranked = output.rank();

    let writer = ReportWriter::create(&arg.output, &summary.strategy, arg.top)?;
    writer.write(&ranked, &summary)?;

    println!(
        "Ranked {} genes ({} skipped, {} failed)",
        summary.evaluated,
        summary.skipped.len(),
        summary.failed.len()
    );
    if let Some(best) = ranked.by_p_value().first() {
        println!(
            "Top gene: {} (p={:.3e}, fdr={:.3e})",
            best.gene_id,
            best.p_value(),
            best.fdr().unwrap_or(f64::NAN)
        );
    }
    println!("Output is ready at {}", writer.dir().display());
    Ok(())
}
