//! Per-gene log-rank results and their false discovery rate ranking.

use std::{cmp::Ordering, sync::Arc};

use kmrank_stats::{fdr, log_rank::LogRankTest, survival::SurvivalCurve};
use serde::Serialize;

use crate::patient::Patient;

/// Kaplan-Meier summary of one cohort of a gene.
#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    pub size: usize,
    pub failures: usize,
    /// Kaplan-Meier median survival time, `None` if never reached.
    pub median_survival: Option<f64>,
    pub curve: SurvivalCurve,
}

impl CohortSummary {
    #[must_use]
    pub fn from_patients(patients: &[&Patient]) -> Self {
        let curve = SurvivalCurve::from_events(patients.iter().map(|p| p.survival_event()));
        Self {
            size: curve.subjects(),
            failures: curve.total_failing(),
            median_survival: curve.median_survival(),
            curve,
        }
    }
}

/// Outcome of comparing the low and high expression cohorts of a gene.
#[derive(Debug, Clone, Serialize)]
pub struct GeneResult {
    pub gene_id: Arc<str>,
    pub low: CohortSummary,
    pub high: CohortSummary,
    pub log_rank: LogRankTest,
    /// Size of the smaller cohort.
    pub group_size: usize,
    fdr: Option<f64>,
}

impl GeneResult {
    /// Computes both curves and the log-rank test of a gene's cohorts.
    #[must_use]
    pub fn compute(gene_id: Arc<str>, low: &[&Patient], high: &[&Patient]) -> Self {
        let low = CohortSummary::from_patients(low);
        let high = CohortSummary::from_patients(high);
        let log_rank = LogRankTest::compute(&low.curve, &high.curve);
        let group_size = low.size.min(high.size);
        Self {
            gene_id,
            low,
            high,
            log_rank,
            group_size,
            fdr: None,
        }
    }

    #[must_use]
    pub fn p_value(&self) -> f64 {
        self.log_rank.p_value()
    }

    #[must_use]
    pub fn neg_log10_p_value(&self) -> f64 {
        self.log_rank.neg_log10_p_value()
    }

    /// False discovery rate, set once the result has been ranked.
    #[must_use]
    pub fn fdr(&self) -> Option<f64> {
        self.fdr
    }

    /// Ascending p-value, ties broken by gene id.
    #[must_use]
    pub fn cmp_by_p_value(&self, other: &Self) -> Ordering {
        self.p_value()
            .total_cmp(&other.p_value())
            .then_with(|| self.gene_id.cmp(&other.gene_id))
    }
}

/// Gene results sorted by p-value with their false discovery rates filled in.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RankedResults {
    results: Vec<GeneResult>,
}

impl RankedResults {
    /// Assigns `fdr = p * N / rank` to results already sorted by p-value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `results` is not sorted by ascending p-value.
    #[must_use]
    pub fn from_sorted(mut results: Vec<GeneResult>) -> Self {
        let p_values = results.iter().map(GeneResult::p_value).collect::<Vec<_>>();
        for (result, fdr) in results.iter_mut().zip(fdr::false_discovery_rates(&p_values)) {
            result.fdr = Some(fdr);
        }
        Self { results }
    }

    /// Results in ascending p-value order.
    #[must_use]
    pub fn by_p_value(&self) -> &[GeneResult] {
        &self.results
    }

    /// Results in ascending FDR order, ties broken by gene id.
    #[must_use]
    pub fn by_fdr(&self) -> Vec<&GeneResult> {
        let mut sorted = self.results.iter().collect::<Vec<_>>();
        sorted.sort_by(|a, b| {
            a.fdr
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.fdr.unwrap_or(f64::INFINITY))
                .then_with(|| a.gene_id.cmp(&b.gene_id))
        });
        sorted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<GeneResult> {
        self.results
    }
}
