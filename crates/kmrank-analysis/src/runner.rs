//! Parallel evaluation of every gene with one split strategy.
//!
//! Each gene runs through the same pipeline:
//!
//! 1. split its patients with the [`CohortSplitter`]
//! 2. drop the gene if a cohort is smaller than the minimum cohort size
//! 3. compute both Kaplan-Meier curves and the log-rank test
//!
//! Genes are independent, so they are evaluated on a rayon thread pool. The
//! patient lookup and the splitter are only read. Once every gene is done the
//! results are sorted by ascending p-value, with ties broken by gene id.
//!
//! A gene with malformed rows fails on its own and is reported in
//! [`RunOutput::failures`]; it never aborts the other genes.

use std::sync::Arc;

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder, prelude::*};

use crate::{
    expression::GeneGroup,
    result::{GeneResult, RankedResults},
    split::{CohortSplitter, GeneError},
};

/// Smallest cohort a gene may produce and still be evaluated.
pub const DEFAULT_MIN_COHORT_SIZE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub min_cohort_size: usize,
    /// Worker threads, `None` for rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            min_cohort_size: DEFAULT_MIN_COHORT_SIZE,
            threads: None,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RunnerError {
    #[display("minimum cohort size must be at least 1")]
    ZeroMinCohortSize,
    #[display("failed to build worker thread pool: {source}")]
    ThreadPool { source: ThreadPoolBuildError },
}

/// A gene left out because one of its cohorts was too small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGene {
    pub gene_id: Arc<str>,
    pub low_size: usize,
    pub high_size: usize,
}

/// A gene whose expression rows could not be split.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneFailure {
    pub gene_id: Arc<str>,
    pub error: GeneError,
}

#[derive(Debug)]
enum GeneOutcome {
    Evaluated(GeneResult),
    Skipped(SkippedGene),
    Failed(GeneFailure),
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Evaluated genes, ascending p-value, ties by gene id.
    pub results: Vec<GeneResult>,
    pub skipped: Vec<SkippedGene>,
    pub failures: Vec<GeneFailure>,
}

impl RunOutput {
    /// Assigns false discovery rates to the sorted results.
    #[must_use]
    pub fn rank(self) -> RankedResults {
        RankedResults::from_sorted(self.results)
    }
}

/// Runs a split strategy over every gene.
pub struct GeneEvaluationRunner<'s> {
    splitter: &'s dyn CohortSplitter,
    config: RunnerConfig,
}

impl<'s> GeneEvaluationRunner<'s> {
    pub fn new(
        splitter: &'s dyn CohortSplitter,
        config: RunnerConfig,
    ) -> Result<Self, RunnerError> {
        if config.min_cohort_size == 0 {
            return Err(RunnerError::ZeroMinCohortSize);
        }
        Ok(Self { splitter, config })
    }

    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Evaluates all genes and returns the results sorted by p-value.
    pub fn run(&self, genes: &[GeneGroup]) -> Result<RunOutput, RunnerError> {
        tracing::info!(
            strategy = %self.splitter.id(),
            genes = genes.len(),
            "evaluating genes"
        );

        let outcomes = match self.config.threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|source| RunnerError::ThreadPool { source })?;
                pool.install(|| self.evaluate_all(genes))
            }
            None => self.evaluate_all(genes),
        };

        let mut output = RunOutput::default();
        for outcome in outcomes {
            match outcome {
                GeneOutcome::Evaluated(result) => output.results.push(result),
                GeneOutcome::Skipped(skipped) => output.skipped.push(skipped),
                GeneOutcome::Failed(failure) => output.failures.push(failure),
            }
        }
        // all workers have joined here
        output.results.sort_by(GeneResult::cmp_by_p_value);
        output.skipped.sort_by(|a, b| a.gene_id.cmp(&b.gene_id));
        output.failures.sort_by(|a, b| a.gene_id.cmp(&b.gene_id));

        tracing::info!(
            evaluated = output.results.len(),
            skipped = output.skipped.len(),
            failed = output.failures.len(),
            "gene evaluation finished"
        );
        Ok(output)
    }

    fn evaluate_all(&self, genes: &[GeneGroup]) -> Vec<GeneOutcome> {
        genes.par_iter().map(|gene| self.evaluate(gene)).collect()
    }

    fn evaluate(&self, gene: &GeneGroup) -> GeneOutcome {
        let gene_id = Arc::clone(&gene.gene_id);
        let cohorts = match self.splitter.split(gene) {
            Ok(cohorts) => cohorts,
            Err(error) => {
                tracing::warn!(gene = %gene_id, %error, "skipping malformed gene");
                return GeneOutcome::Failed(GeneFailure { gene_id, error });
            }
        };

        let (low_size, high_size) = (cohorts.low.len(), cohorts.high.len());
        if low_size.min(high_size) < self.config.min_cohort_size {
            tracing::debug!(gene = %gene_id, low_size, high_size, "cohort below minimum size");
            return GeneOutcome::Skipped(SkippedGene {
                gene_id,
                low_size,
                high_size,
            });
        }

        GeneOutcome::Evaluated(GeneResult::compute(gene_id, &cohorts.low, &cohorts.high))
    }
}
