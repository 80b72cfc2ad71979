//! Log-rank test comparing the survival of two cohorts.
//!
//! The two Kaplan-Meier curves are merged into a single timeline of failure
//! times. At each of them the failures are split between the cohorts in
//! proportion to their at-risk counts, which gives the failures expected
//! under the null hypothesis of equal hazard. The deviation of the observed
//! failures from the expected ones is summarized as a chi-square statistic
//! with one degree of freedom.
//!
//! # Examples
//!
//! ```
//! use kmrank_stats::{
//!     log_rank::LogRankTest,
//!     survival::{EventKind, SurvivalCurve},
//! };
//!
//! let a = SurvivalCurve::from_events([(1, EventKind::Failure), (4, EventKind::Censored)]);
//! let b = SurvivalCurve::from_events([(2, EventKind::Failure), (3, EventKind::Failure)]);
//! let test = LogRankTest::compute(&a, &b);
//!
//! assert_eq!(test.merged_events().len(), 3);
//! assert!((0.0..=1.0).contains(&test.p_value()));
//! ```

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::survival::{SurvivalCurve, SurvivalPoint};

/// A failure time of the merged timeline with both cohorts' counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedEvent {
    pub time: u32,
    pub at_risk_a: usize,
    pub at_risk_b: usize,
    pub failing_a: usize,
    pub failing_b: usize,
}

impl MergedEvent {
    #[must_use]
    pub fn total_failing(&self) -> usize {
        self.failing_a + self.failing_b
    }

    #[must_use]
    pub fn total_at_risk(&self) -> usize {
        self.at_risk_a + self.at_risk_b
    }
}

/// Merges two curves into the timeline of times where either cohort failed.
///
/// Both curves are walked with a cursor each. While both have points left,
/// a cohort whose cursor sits past the current time reports the at-risk
/// count of its next point, which equals its current risk set. Once a curve
/// is exhausted its at-risk count stays fixed at
/// [`SurvivalCurve::residual_at_risk`] for the rest of the merge.
///
/// Times where no cohort failed are not part of the result.
#[must_use]
pub fn merge_events(a: &SurvivalCurve, b: &SurvivalCurve) -> Vec<MergedEvent> {
    let (pa, pb) = (a.points(), b.points());
    let (mut ia, mut ib) = (0, 0);
    let mut merged = Vec::new();

    while ia < pa.len() && ib < pb.len() {
        let current_time = pa[ia].time.min(pb[ib].time);
        let failing_at = |p: &SurvivalPoint| if p.time == current_time { p.failing } else { 0 };
        let event = MergedEvent {
            time: current_time,
            at_risk_a: pa[ia].at_risk,
            at_risk_b: pb[ib].at_risk,
            failing_a: failing_at(&pa[ia]),
            failing_b: failing_at(&pb[ib]),
        };
        if event.total_failing() > 0 {
            merged.push(event);
        }

        if pa[ia].time == current_time {
            ia += 1;
        }
        if pb[ib].time == current_time {
            ib += 1;
        }
    }

    let residual_a = a.residual_at_risk();
    let residual_b = b.residual_at_risk();

    merged.extend(
        pa[ia..]
            .iter()
            .filter(|p| p.failing > 0)
            .map(|p| MergedEvent {
                time: p.time,
                at_risk_a: p.at_risk,
                at_risk_b: residual_b,
                failing_a: p.failing,
                failing_b: 0,
            }),
    );
    merged.extend(
        pb[ib..]
            .iter()
            .filter(|p| p.failing > 0)
            .map(|p| MergedEvent {
                time: p.time,
                at_risk_a: residual_a,
                at_risk_b: p.at_risk,
                failing_a: 0,
                failing_b: p.failing,
            }),
    );

    merged
}

/// Result of a log-rank test between cohort A and cohort B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankTest {
    #[serde(skip)]
    merged_events: Vec<MergedEvent>,
    observed_a: usize,
    observed_b: usize,
    expected_a: f64,
    expected_b: f64,
    statistic: f64,
    p_value: f64,
}

impl LogRankTest {
    /// Runs the log-rank test on two Kaplan-Meier curves.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn compute(a: &SurvivalCurve, b: &SurvivalCurve) -> Self {
        let merged_events = merge_events(a, b);

        let (mut expected_a, mut expected_b) = (0.0, 0.0);
        for event in &merged_events {
            let total_failing = event.total_failing() as f64;
            let total_at_risk = event.total_at_risk() as f64;
            expected_a += total_failing / total_at_risk * event.at_risk_a as f64;
            expected_b += total_failing / total_at_risk * event.at_risk_b as f64;
        }

        let observed_a = a.total_failing();
        let observed_b = b.total_failing();

        // a cohort with no expected failures has no deviation to measure
        let statistic = if expected_a > 0.0 && expected_b > 0.0 {
            (observed_a as f64 - expected_a).powi(2) / expected_a
                + (observed_b as f64 - expected_b).powi(2) / expected_b
        } else {
            0.0
        };

        Self {
            merged_events,
            observed_a,
            observed_b,
            expected_a,
            expected_b,
            statistic,
            p_value: chi_square_survival(statistic),
        }
    }

    /// Failure times of the merged timeline, in increasing time order.
    #[must_use]
    pub fn merged_events(&self) -> &[MergedEvent] {
        &self.merged_events
    }

    #[must_use]
    pub fn observed_a(&self) -> usize {
        self.observed_a
    }

    #[must_use]
    pub fn observed_b(&self) -> usize {
        self.observed_b
    }

    #[must_use]
    pub fn expected_a(&self) -> f64 {
        self.expected_a
    }

    #[must_use]
    pub fn expected_b(&self) -> f64 {
        self.expected_b
    }

    /// Chi-square statistic with one degree of freedom.
    #[must_use]
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    #[must_use]
    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    /// `-log10(p)`, infinite when the p-value underflows to zero.
    ///
    /// A p-value of 1 gives `+0.0`, never `-0.0`.
    #[must_use]
    pub fn neg_log10_p_value(&self) -> f64 {
        0.0 - self.p_value.log10()
    }
}

/// Upper tail of the chi-square distribution with one degree of freedom.
fn chi_square_survival(statistic: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    let distribution = ChiSquared::new(1.0).expect("one degree of freedom is a valid parameter");
    (1.0 - distribution.cdf(statistic)).clamp(0.0, 1.0)
}
