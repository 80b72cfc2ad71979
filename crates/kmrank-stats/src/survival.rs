//! Kaplan-Meier survival curves for right-censored time-to-event data.

use serde::Serialize;

/// How an observation left the risk set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The event of interest (death, metastasis, ...) was observed.
    Failure,
    /// The subject left observation without the event being observed.
    Censored,
}

impl EventKind {
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }
}

/// One step of a Kaplan-Meier curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurvivalPoint {
    /// Time of the step.
    pub time: u32,
    /// Subjects neither failed nor censored immediately before `time`.
    pub at_risk: usize,
    /// Failures observed exactly at `time`.
    pub failing: usize,
    /// Estimated survival probability just after `time`.
    pub survival_probability: f64,
}

/// Kaplan-Meier survival curve for a single cohort.
///
/// The curve holds one [`SurvivalPoint`] per distinct observation time, in
/// increasing time order. Times at which only censoring happened are kept
/// (with `failing == 0`) because they still shrink the risk set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurvivalCurve {
    subjects: usize,
    points: Vec<SurvivalPoint>,
}

impl SurvivalCurve {
    /// Computes the Kaplan-Meier curve of a cohort.
    ///
    /// # Arguments
    ///
    /// * `events` - One `(time, kind)` pair per subject of the cohort
    ///
    /// # Examples
    ///
    /// ```
    /// use kmrank_stats::survival::{EventKind, SurvivalCurve};
    ///
    /// let curve = SurvivalCurve::from_events([
    ///     (10, EventKind::Failure),
    ///     (20, EventKind::Censored),
    ///     (30, EventKind::Failure),
    /// ]);
    /// assert_eq!(curve.points().len(), 3);
    /// assert_eq!(curve.points()[1].failing, 0);
    /// assert_eq!(curve.points()[2].at_risk, 1);
    /// assert_eq!(curve.total_failing(), 2);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = (u32, EventKind)>,
    {
        let mut data = events.into_iter().collect::<Vec<_>>();
        data.sort_by_key(|(time, _)| *time);

        let subjects = data.len();
        let mut points = Vec::new();
        let mut at_risk = subjects;
        let mut survival_probability = 1.0;

        for group in data.chunk_by(|a, b| a.0 == b.0) {
            let time = group[0].0;
            let failing = group.iter().filter(|(_, kind)| kind.is_failure()).count();

            survival_probability *= 1.0 - failing as f64 / at_risk as f64;
            points.push(SurvivalPoint {
                time,
                at_risk,
                failing,
                survival_probability,
            });

            // failures and censorings both leave the risk set
            at_risk -= group.len();
        }

        Self { subjects, points }
    }

    /// Steps of the curve in increasing time order.
    #[must_use]
    pub fn points(&self) -> &[SurvivalPoint] {
        &self.points
    }

    /// Number of subjects the curve was built from.
    #[must_use]
    pub fn subjects(&self) -> usize {
        self.subjects
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total number of observed failures.
    #[must_use]
    pub fn total_failing(&self) -> usize {
        self.points.iter().map(|p| p.failing).sum()
    }

    /// Subjects still at risk after the last failure step of the curve.
    ///
    /// This is `at_risk - failing` of the final point; censorings at that
    /// final time are not subtracted. Returns 0 for an empty curve.
    #[must_use]
    pub fn residual_at_risk(&self) -> usize {
        self.points
            .last()
            .map_or(0, |last| last.at_risk - last.failing)
    }

    /// Returns the median survival time.
    ///
    /// The median survival time is the time at which the survival probability
    /// drops to or below 50%. Linear interpolation is used between the two
    /// points surrounding the crossing.
    ///
    /// Returns `None` if the survival probability never reaches 50%.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kmrank_stats::survival::{EventKind, SurvivalCurve};
    /// let curve = SurvivalCurve::from_events([
    ///     (10, EventKind::Failure),
    ///     (20, EventKind::Failure),
    ///     (30, EventKind::Failure),
    /// ]);
    /// let median = curve.median_survival().unwrap();
    /// assert!(median > 10.0 && median <= 20.0);
    /// ```
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        let i = self
            .points
            .iter()
            .position(|p| p.survival_probability <= 0.5)?;
        let p1 = &self.points[i];
        if i == 0 {
            return Some(f64::from(p1.time));
        }
        let p0 = &self.points[i - 1];
        let (t0, t1) = (f64::from(p0.time), f64::from(p1.time));
        let (s0, s1) = (p0.survival_probability, p1.survival_probability);
        Some(t0 + (0.5 - s0) / (s1 - s0) * (t1 - t0))
    }

    /// Returns the survival probability at a specific time.
    ///
    /// The curve is a step function: the probability stays constant between
    /// steps. Before the first step the probability is `1.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use kmrank_stats::survival::{EventKind, SurvivalCurve};
    /// let curve = SurvivalCurve::from_events([(10, EventKind::Failure), (20, EventKind::Failure)]);
    ///
    /// assert_eq!(curve.survival_at(5), 1.0);
    /// assert_eq!(curve.survival_at(15), 0.5);
    /// assert_eq!(curve.survival_at(25), 0.0);
    /// ```
    #[must_use]
    pub fn survival_at(&self, time: u32) -> f64 {
        let idx = self.points.partition_point(|p| p.time <= time);
        if idx == 0 {
            1.0
        } else {
            self.points[idx - 1].survival_probability
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::fixtures;

    #[test]
    fn test_empty_cohort() {
        let curve = SurvivalCurve::from_events([]);
        assert!(curve.is_empty());
        assert_eq!(curve.subjects(), 0);
        assert_eq!(curve.total_failing(), 0);
        assert_eq!(curve.residual_at_risk(), 0);
        assert_eq!(curve.median_survival(), None);
        assert_eq!(curve.survival_at(100), 1.0);
    }

    #[test]
    fn test_reference_cohort_steps() {
        let curve = SurvivalCurve::from_events(fixtures::cohort_a());
        let steps = curve
            .points()
            .iter()
            .map(|p| (p.time, p.at_risk, p.failing))
            .collect::<Vec<_>>();
        assert_eq!(
            steps,
            [
                (2, 18, 1),
                (3, 17, 1),
                (5, 16, 3),
                (8, 12, 3),
                (9, 9, 0),
                (10, 8, 0),
                (11, 6, 2),
                (12, 4, 2),
                (13, 2, 0),
            ]
        );
        assert!((curve.points()[2].survival_probability - 13.0 / 18.0).abs() < 1e-12);
        assert!((curve.points()[8].survival_probability - 0.180_555_555_555_555_55).abs() < 1e-12);
        assert_eq!(curve.total_failing(), 12);
        assert_eq!(curve.residual_at_risk(), 2);
    }

    #[test]
    fn test_censoring_only_time_keeps_probability() {
        let curve = SurvivalCurve::from_events([
            (1, EventKind::Failure),
            (2, EventKind::Censored),
            (2, EventKind::Censored),
            (3, EventKind::Failure),
        ]);
        let points = curve.points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].failing, 0);
        assert_eq!(points[1].at_risk, 3);
        assert_eq!(points[1].survival_probability, points[0].survival_probability);
        assert_eq!(points[2].at_risk, 1);
        assert_eq!(points[2].survival_probability, 0.0);
    }

    #[test]
    fn test_median_interpolates() {
        let curve = SurvivalCurve::from_events([
            (10, EventKind::Failure),
            (20, EventKind::Failure),
            (30, EventKind::Failure),
        ]);
        // S(10) = 2/3, S(20) = 1/3
        let median = curve.median_survival().unwrap();
        assert!((median - 15.0).abs() < 1e-9);

        let curve = SurvivalCurve::from_events([(10, EventKind::Failure), (20, EventKind::Censored)]);
        assert_eq!(curve.median_survival(), Some(10.0));

        let curve = SurvivalCurve::from_events([(10, EventKind::Censored)]);
        assert_eq!(curve.median_survival(), None);
    }

    #[test]
    fn test_random_cohort_invariants() {
        let mut rng = Pcg64Mcg::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let size = rng.random_range(1..60);
            let events = (0..size)
                .map(|_| {
                    let kind = if rng.random_bool(0.6) {
                        EventKind::Failure
                    } else {
                        EventKind::Censored
                    };
                    (rng.random_range(0..25), kind)
                })
                .collect::<Vec<_>>();
            let failures = events.iter().filter(|(_, k)| k.is_failure()).count();
            let curve = SurvivalCurve::from_events(events.iter().copied());

            assert_eq!(curve.total_failing(), failures);
            assert_eq!(curve.points()[0].at_risk, size);

            for pair in curve.points().windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                assert!(prev.time < next.time);
                assert!(next.survival_probability <= prev.survival_probability);
                let left = events.iter().filter(|(t, _)| *t == prev.time).count();
                assert_eq!(prev.at_risk - next.at_risk, left);
            }
            for p in curve.points() {
                assert!(p.failing <= p.at_risk);
                assert!((0.0..=1.0).contains(&p.survival_probability));
            }
        }
    }
}
